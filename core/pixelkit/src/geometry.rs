//! Rectangles tagged with the coordinate space they live in.
//!
//! A selection made on screen is measured against the rendered (display) size
//! of an image, while pixel work happens against the decoded (natural) size.
//! The two are numerically incompatible, so every [`Rect`] and [`Size`]
//! carries a zero-sized space marker and only [`ScaleFactor`] can move a value
//! from one space to the other.

use std::fmt;
use std::marker::PhantomData;

/// Relative slack allowed on a far edge in [`Rect::fits_within`].
///
/// `(natural / display) * display` can land a few ulps past `natural`.
pub const EDGE_TOLERANCE: f64 = 1e-9;

/// Coordinates relative to the on-screen rendered size of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplaySpace {}

/// Coordinates relative to the decoded pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NaturalSpace {}

/// Marker trait for the two coordinate spaces.
pub trait Space: Copy + fmt::Debug + 'static {
    /// Short name used in debug output and across the wasm boundary.
    const NAME: &'static str;
}

impl Space for DisplaySpace {
    const NAME: &'static str = "display";
}

impl Space for NaturalSpace {
    const NAME: &'static str = "natural";
}

/// Axis-aligned rectangle in coordinate space `S`.
pub struct Rect<S: Space> {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Horizontal extent.
    pub width: f64,
    /// Vertical extent.
    pub height: f64,
    space: PhantomData<S>,
}

/// A rectangle measured against the rendered image.
pub type DisplayRect = Rect<DisplaySpace>;

/// A rectangle measured against the decoded pixel buffer.
pub type NaturalRect = Rect<NaturalSpace>;

/// Width and height in coordinate space `S`.
pub struct Size<S: Space> {
    /// Horizontal extent.
    pub width: f64,
    /// Vertical extent.
    pub height: f64,
    space: PhantomData<S>,
}

/// Rendered size of an image at the time a selection was made.
pub type DisplaySize = Size<DisplaySpace>;

/// Decoded pixel dimensions of an image.
pub type NaturalSize = Size<NaturalSpace>;

// Manual impls: derives would put bounds on the uninhabited marker types.
impl<S: Space> Clone for Rect<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: Space> Copy for Rect<S> {}

impl<S: Space> PartialEq for Rect<S> {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x
            && self.y == other.y
            && self.width == other.width
            && self.height == other.height
    }
}

impl<S: Space> fmt::Debug for Rect<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rect")
            .field("space", &S::NAME)
            .field("x", &self.x)
            .field("y", &self.y)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl<S: Space> Clone for Size<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: Space> Copy for Size<S> {}

impl<S: Space> PartialEq for Size<S> {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width && self.height == other.height
    }
}

impl<S: Space> fmt::Debug for Size<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Size")
            .field("space", &S::NAME)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl<S: Space> Size<S> {
    /// Create a size.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            space: PhantomData,
        }
    }

    /// True when either side is non-positive or not finite.
    pub fn is_empty(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
    }

    /// The rectangle covering the whole size, anchored at the origin.
    pub fn to_rect(self) -> Rect<S> {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}

impl<S: Space> Rect<S> {
    /// Create a rectangle.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            space: PhantomData,
        }
    }

    /// Right edge (`x + width`).
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge (`y + height`).
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// A zero-area or non-finite rectangle means "no selection".
    pub fn is_empty(&self) -> bool {
        let finite = self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite();
        !finite || self.width <= 0.0 || self.height <= 0.0
    }

    /// True when the rectangle lies inside `[0, W] × [0, H]`.
    ///
    /// The far edges may overshoot by [`EDGE_TOLERANCE`] of the bound, so a
    /// full-frame selection survives the display→natural round trip.
    pub fn fits_within(&self, bounds: Size<S>) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.right() <= bounds.width * (1.0 + EDGE_TOLERANCE)
            && self.bottom() <= bounds.height * (1.0 + EDGE_TOLERANCE)
    }

    /// Intersect the rectangle with `[0, W] × [0, H]`.
    ///
    /// Returns an empty rectangle when there is no overlap.
    pub fn clamp_to(&self, bounds: Size<S>) -> Self {
        let left = self.x.max(0.0);
        let top = self.y.max(0.0);
        let right = self.right().min(bounds.width);
        let bottom = self.bottom().min(bounds.height);

        Rect::new(left, top, (right - left).max(0.0), (bottom - top).max(0.0))
    }
}

impl DisplayRect {
    /// Normalize a drag gesture from `start` to `current` into a rectangle.
    ///
    /// Both points are clamped to the display bounds first, so a drag that
    /// leaves the image still yields an in-bounds selection.
    pub fn from_drag(start: (f64, f64), current: (f64, f64), bounds: DisplaySize) -> Self {
        let clamp = |(x, y): (f64, f64)| {
            (
                x.max(0.0).min(bounds.width),
                y.max(0.0).min(bounds.height),
            )
        };
        let (sx, sy) = clamp(start);
        let (cx, cy) = clamp(current);

        Rect::new(sx.min(cx), sy.min(cy), (cx - sx).abs(), (cy - sy).abs())
    }

    /// Map into natural pixel coordinates.
    pub fn to_natural(&self, scale: ScaleFactor) -> NaturalRect {
        Rect::new(
            self.x * scale.x,
            self.y * scale.y,
            self.width * scale.x,
            self.height * scale.y,
        )
    }
}

impl NaturalRect {
    /// Map into display coordinates, e.g. to place a detected subject box
    /// over the rendered image.
    pub fn to_display(&self, scale: ScaleFactor) -> DisplayRect {
        Rect::new(
            self.x / scale.x,
            self.y / scale.y,
            self.width / scale.x,
            self.height / scale.y,
        )
    }

    /// Grow the rectangle by `padding` pixels on every side, clamped to the
    /// image bounds.
    pub fn padded(&self, padding: f64, bounds: NaturalSize) -> Self {
        let left = (self.x - padding).max(0.0);
        let top = (self.y - padding).max(0.0);
        let right = (self.right() + padding).min(bounds.width);
        let bottom = (self.bottom() + padding).min(bounds.height);

        Rect::new(left, top, (right - left).max(0.0), (bottom - top).max(0.0))
    }
}

/// Per-axis ratio of natural to display size.
///
/// Computed independently for x and y because the host layout does not have
/// to preserve the aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactor {
    /// `natural.width / display.width`
    pub x: f64,
    /// `natural.height / display.height`
    pub y: f64,
}

impl ScaleFactor {
    /// Scale from `display` to `natural`, or `None` if the display size is
    /// degenerate (stale or unmeasured layout).
    pub fn between(natural: NaturalSize, display: DisplaySize) -> Option<Self> {
        if display.is_empty() || natural.is_empty() {
            return None;
        }
        Some(Self {
            x: natural.width / display.width,
            y: natural.height / display.height,
        })
    }
}
