//! Client-side image toolkit: subject detection, background removal,
//! cropping and format conversion on decoded RGBA rasters.
//!
//! # Example
//!
//! ```no_run
//! use pixelkit::{DisplayRect, DisplaySize, ImageProcessor, OutputFormat};
//!
//! let bytes = std::fs::read("product.png").unwrap();
//! let mut processor = ImageProcessor::new(&bytes)
//!     .unwrap()
//!     .format(OutputFormat::Webp)
//!     .on_progress(|percent| println!("{percent}%"));
//!
//! // Selection drawn on a 400×300 preview of the image.
//! let cropped = processor
//!     .crop(
//!         DisplayRect::new(40.0, 30.0, 200.0, 150.0),
//!         DisplaySize::new(400.0, 300.0),
//!     )
//!     .unwrap();
//! if let Some(image) = cropped {
//!     std::fs::write("cropped.webp", &image.data).unwrap();
//! }
//! ```
#![warn(missing_docs)]

/// Background removal by corner colour sampling.
pub mod background;
mod codec;
mod convert;
mod crop;
/// Subject detection trait and the built-in heuristic detector.
pub mod detect;
mod error;
/// Display/natural coordinate spaces.
pub mod geometry;
mod progress;
mod raster;

pub use background::{remove_background, remove_background_in_place};
pub use codec::{detect_format, encode, EncodedImage, OutputFormat, CONVERT_QUALITY, CROP_QUALITY};
pub use convert::{convert_image, convert_raster};
pub use crop::{crop_image, crop_natural, crop_raster};
pub use detect::{detect_subject, detect_with, LumaChromaDetector, SubjectDetector};
pub use error::{PixelKitError, Result};
pub use geometry::{DisplayRect, DisplaySize, NaturalRect, NaturalSize, Rect, ScaleFactor, Size};
pub use progress::Progress;
pub use raster::{brightness, chroma_variance, Raster};

use image::ImageFormat;

/// Builder running one toolkit operation on a decoded image.
///
/// Decodes the input on construction, so every operation sees the same
/// raster and a decode failure surfaces before any work is done.
pub struct ImageProcessor {
    raster: Raster,
    input_format: Option<ImageFormat>,
    format: Option<OutputFormat>,
    quality: Option<f32>,
    /// User-provided detector. When `None`, [`LumaChromaDetector`] is used.
    detector: Option<Box<dyn SubjectDetector>>,
    progress: Option<Box<dyn FnMut(u8)>>,
}

impl ImageProcessor {
    /// Decode raw image bytes (PNG, JPEG, WebP, GIF or BMP).
    pub fn new(input: &[u8]) -> Result<Self> {
        let input_format = detect_format(input)?;
        let raster = Raster::decode(input)?;
        Ok(Self {
            input_format: Some(input_format),
            ..Self::from_raster(raster)
        })
    }

    /// Work on an already decoded raster.
    pub fn from_raster(raster: Raster) -> Self {
        Self {
            raster,
            input_format: None,
            format: None,
            quality: None,
            detector: None,
            progress: None,
        }
    }

    /// Set the output format.
    ///
    /// Defaults: crops keep the input's format where it can be encoded
    /// (PNG otherwise), conversions produce PNG. Background removal always
    /// produces PNG regardless of this setting.
    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Set lossy encoding quality from 0.0 to 1.0.
    ///
    /// Defaults: [`CROP_QUALITY`] for crops, [`CONVERT_QUALITY`] for
    /// conversions.
    pub fn quality(mut self, quality: f32) -> Self {
        self.quality = Some(quality);
        self
    }

    /// Provide a custom subject detector.
    ///
    /// ```no_run
    /// use pixelkit::{ImageProcessor, NaturalRect, Raster, SubjectDetector};
    ///
    /// struct WholeImage;
    /// impl SubjectDetector for WholeImage {
    ///     fn detect(&self, raster: &Raster) -> Option<NaturalRect> {
    ///         Some(raster.natural_size().to_rect())
    ///     }
    /// }
    ///
    /// let bytes = std::fs::read("photo.png").unwrap();
    /// let subject = ImageProcessor::new(&bytes).unwrap()
    ///     .detector(Box::new(WholeImage))
    ///     .detect_subject();
    /// ```
    pub fn detector(mut self, detector: Box<dyn SubjectDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Receive progress percentages while an operation runs.
    ///
    /// Values never decrease and a successful operation always ends at 100.
    pub fn on_progress(mut self, callback: impl FnMut(u8) + 'static) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// The decoded raster.
    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    /// Format the input was decoded from, when constructed from bytes.
    pub fn input_format(&self) -> Option<ImageFormat> {
        self.input_format
    }

    /// Bounding box of the subject in natural pixel coordinates.
    pub fn detect_subject(&mut self) -> Option<NaturalRect> {
        let detector: &dyn SubjectDetector = match self.detector.as_deref() {
            Some(detector) => detector,
            None => &LumaChromaDetector,
        };
        let mut progress = progress_for(&mut self.progress);
        detect_with(detector, &self.raster, &mut progress)
    }

    /// Crop a selection drawn on the image rendered at `display_size`.
    ///
    /// `Ok(None)` means the geometry was rejected and nothing was produced.
    pub fn crop(
        &mut self,
        display_rect: DisplayRect,
        display_size: DisplaySize,
    ) -> Result<Option<EncodedImage>> {
        let quality = self.quality.unwrap_or(CROP_QUALITY);
        codec::validate_quality(quality)?;
        let format = self.format.unwrap_or_else(|| {
            self.input_format
                .map(OutputFormat::for_input)
                .unwrap_or_default()
        });

        let mut progress = progress_for(&mut self.progress);
        crop_image(
            &self.raster,
            display_rect,
            display_size,
            format,
            quality,
            &mut progress,
        )
    }

    /// Remove the background and encode the result as PNG.
    ///
    /// Consumes the processor: the raster's alpha channel is rewritten.
    pub fn remove_background(mut self) -> Result<EncodedImage> {
        let mut progress = progress_for(&mut self.progress);
        remove_background(self.raster, &mut progress)
    }

    /// Re-encode the image in the configured format.
    pub fn convert(&mut self) -> Result<EncodedImage> {
        let quality = self.quality.unwrap_or(CONVERT_QUALITY);
        let format = self.format.unwrap_or_default();
        let mut progress = progress_for(&mut self.progress);
        progress.report(0);
        convert_raster(&self.raster, format, quality, &mut progress)
    }
}

fn progress_for(sink: &mut Option<Box<dyn FnMut(u8)>>) -> Progress<'_> {
    match sink {
        Some(callback) => Progress::new(callback.as_mut()),
        None => Progress::none(),
    }
}
