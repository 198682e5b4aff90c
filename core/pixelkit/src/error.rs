use thiserror::Error;

/// Errors surfaced by pixelkit operations.
///
/// Rejected crop geometry and "no subject found" are not errors; those come
/// back as `None`.
#[derive(Debug, Error)]
pub enum PixelKitError {
    /// The input bytes could not be decoded.
    #[error("failed to decode image: {0}")]
    DecodeError(String),

    /// The requested output format is unknown or not compiled in.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// The image has no pixels.
    #[error("image dimensions are zero")]
    ZeroDimensions,

    /// A raw buffer does not match `width * height * 4`.
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    BufferSizeMismatch {
        /// Required length.
        expected: usize,
        /// Length supplied.
        actual: usize,
    },

    /// The encoder rejected the raster.
    #[error("failed to encode image: {0}")]
    EncodeError(String),

    /// Quality outside `0.0..=1.0`.
    #[error("quality must be between 0.0 and 1.0, got {0}")]
    InvalidQuality(f32),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PixelKitError>;
