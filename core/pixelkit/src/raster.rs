use image::DynamicImage;

use crate::error::{PixelKitError, Result};
use crate::geometry::NaturalSize;

/// Bytes per RGBA pixel.
pub(crate) const CHANNELS: usize = 4;

/// Decoded image: width, height and a row-major RGBA8 buffer.
///
/// Invariant: `pixels.len() == width * height * 4` and both dimensions are
/// non-zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Raster {
    /// Wrap an existing RGBA8 buffer.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(PixelKitError::ZeroDimensions);
        }
        let expected = width as usize * height as usize * CHANNELS;
        if pixels.len() != expected {
            return Err(PixelKitError::BufferSizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A raster filled with a single colour.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self> {
        let count = width as usize * height as usize;
        let pixels = rgba.iter().copied().cycle().take(count * CHANNELS).collect();
        Self::from_rgba(width, height, pixels)
    }

    /// Decode encoded image bytes (PNG, JPEG, WebP, GIF, BMP; AVIF with the
    /// `avif` feature). Animated inputs contribute their first frame.
    pub fn decode(input: &[u8]) -> Result<Self> {
        let decoded =
            image::load_from_memory(input).map_err(|e| PixelKitError::DecodeError(e.to_string()))?;
        Self::from_dynamic(&decoded)
    }

    pub(crate) fn from_dynamic(image: &DynamicImage) -> Result<Self> {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self::from_rgba(width, height, rgba.into_raw())
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Decoded dimensions as a natural-space size.
    pub fn natural_size(&self) -> NaturalSize {
        NaturalSize::new(self.width as f64, self.height as f64)
    }

    /// The RGBA buffer.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Mutable access to the RGBA buffer. Length cannot change.
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Byte offset of pixel `(x, y)`.
    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * CHANNELS
    }

    /// RGBA value at `(x, y)`. Panics when out of bounds.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.index(x, y);
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    /// Overwrite the RGBA value at `(x, y)`. Panics when out of bounds.
    #[inline]
    pub fn put_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let i = self.index(x, y);
        self.pixels[i..i + CHANNELS].copy_from_slice(&rgba);
    }
}

/// Perceptual brightness: `0.299 R + 0.587 G + 0.114 B`.
#[inline]
pub fn brightness(r: u8, g: u8, b: u8) -> f64 {
    r as f64 * 0.299 + g as f64 * 0.587 + b as f64 * 0.114
}

/// Cheap colourfulness estimate: `|R-G| + |G-B| + |B-R|`.
#[inline]
pub fn chroma_variance(r: u8, g: u8, b: u8) -> u32 {
    let (r, g, b) = (r as i32, g as i32, b as i32);
    ((r - g).abs() + (g - b).abs() + (b - r).abs()) as u32
}
