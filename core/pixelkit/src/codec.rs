use std::fmt;
use std::str::FromStr;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageFormat, RgbImage};

use crate::error::{PixelKitError, Result};
use crate::raster::Raster;

/// Quality used when encoding a cropped selection.
pub const CROP_QUALITY: f32 = 0.95;

/// Quality used by format conversion.
pub const CONVERT_QUALITY: f32 = 0.9;

/// Encoder speed for AVIF (rav1e): 1 = slowest/best, 10 = fastest.
#[cfg(feature = "avif")]
const AVIF_SPEED: u8 = 6;

/// Output image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Lossless with alpha.
    #[default]
    Png,

    /// Lossy, no alpha. Transparent areas are composited over white.
    Jpeg,

    /// Lossless WebP (the pure-Rust encoder has no lossy mode).
    Webp,

    /// Lossy AVIF with alpha. Requires the `avif` feature.
    Avif,
}

impl OutputFormat {
    /// MIME type of the encoded bytes.
    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Webp => "image/webp",
            OutputFormat::Avif => "image/avif",
        }
    }

    /// Conventional file extension.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Webp => "webp",
            OutputFormat::Avif => "avif",
        }
    }

    /// Best output format for an input in `format`, falling back to PNG.
    pub fn for_input(format: ImageFormat) -> Self {
        match format {
            ImageFormat::Jpeg => OutputFormat::Jpeg,
            ImageFormat::WebP => OutputFormat::Webp,
            ImageFormat::Avif if cfg!(feature = "avif") => OutputFormat::Avif,
            _ => OutputFormat::Png,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = PixelKitError;

    /// Accepts short names (`png`, `jpg`, `jpeg`, `webp`, `avif`) and MIME
    /// types (`image/png`, ...), case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        let name = lower.strip_prefix("image/").unwrap_or(&lower);
        match name {
            "png" => Ok(OutputFormat::Png),
            "jpg" | "jpeg" | "pjpeg" => Ok(OutputFormat::Jpeg),
            "webp" => Ok(OutputFormat::Webp),
            "avif" => Ok(OutputFormat::Avif),
            _ => Err(PixelKitError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Encoded output of a crop, background removal or conversion.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    /// The encoded bytes.
    pub data: Vec<u8>,

    /// Format of `data`.
    pub format: OutputFormat,

    /// Width of the encoded image in pixels.
    pub width: u32,

    /// Height of the encoded image in pixels.
    pub height: u32,
}

impl EncodedImage {
    /// MIME type of `data`.
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

/// Detect the container format of encoded input bytes.
pub fn detect_format(input: &[u8]) -> Result<ImageFormat> {
    image::guess_format(input).map_err(|e| PixelKitError::DecodeError(e.to_string()))
}

pub(crate) fn validate_quality(quality: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&quality) {
        return Err(PixelKitError::InvalidQuality(quality));
    }
    Ok(())
}

/// Flatten the alpha channel by compositing onto a white background.
pub(crate) fn flatten_alpha(raster: &Raster) -> RgbImage {
    let mut rgb = RgbImage::new(raster.width(), raster.height());

    for (pixel, out) in raster.pixels().chunks_exact(4).zip(rgb.pixels_mut()) {
        let [r, g, b, a] = [pixel[0], pixel[1], pixel[2], pixel[3]];
        let alpha = a as f32 / 255.0;
        let inv_alpha = 1.0 - alpha;
        let over_white = |c: u8| (c as f32 * alpha + 255.0 * inv_alpha).round() as u8;
        *out = image::Rgb([over_white(r), over_white(g), over_white(b)]);
    }

    rgb
}

/// Encode a raster to `format`.
///
/// `quality` (0.0–1.0) applies to lossy formats only; PNG and WebP are
/// always lossless.
pub fn encode(raster: &Raster, format: OutputFormat, quality: f32) -> Result<EncodedImage> {
    validate_quality(quality)?;

    let (width, height) = (raster.width(), raster.height());
    let mut buffer = Vec::new();
    let encode_err = |e: image::ImageError| PixelKitError::EncodeError(e.to_string());

    match format {
        OutputFormat::Png => {
            PngEncoder::new(&mut buffer)
                .write_image(raster.pixels(), width, height, ExtendedColorType::Rgba8)
                .map_err(encode_err)?;
        }
        OutputFormat::Jpeg => {
            let rgb = flatten_alpha(raster);
            let quality_percent = ((quality * 100.0).round() as u8).max(1);
            JpegEncoder::new_with_quality(&mut buffer, quality_percent)
                .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
                .map_err(encode_err)?;
        }
        OutputFormat::Webp => {
            WebPEncoder::new_lossless(&mut buffer)
                .write_image(raster.pixels(), width, height, ExtendedColorType::Rgba8)
                .map_err(encode_err)?;
        }
        #[cfg(feature = "avif")]
        OutputFormat::Avif => {
            let quality_percent = ((quality * 100.0).round() as u8).max(1);
            image::codecs::avif::AvifEncoder::new_with_speed_quality(
                &mut buffer,
                AVIF_SPEED,
                quality_percent,
            )
            .write_image(raster.pixels(), width, height, ExtendedColorType::Rgba8)
            .map_err(encode_err)?;
        }
        #[cfg(not(feature = "avif"))]
        OutputFormat::Avif => {
            return Err(PixelKitError::UnsupportedFormat(
                "avif (built without the `avif` feature)".to_string(),
            ));
        }
    }

    log::debug!(
        "encoded {}x{} raster as {} ({} bytes)",
        width,
        height,
        format,
        buffer.len()
    );

    Ok(EncodedImage {
        data: buffer,
        format,
        width,
        height,
    })
}
