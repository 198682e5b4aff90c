use crate::codec::{encode, EncodedImage, OutputFormat};
use crate::error::Result;
use crate::progress::Progress;
use crate::raster::Raster;

/// Re-encode a decoded raster in another format.
pub fn convert_raster(
    raster: &Raster,
    format: OutputFormat,
    quality: f32,
    progress: &mut Progress<'_>,
) -> Result<EncodedImage> {
    progress.report(50);
    let encoded = encode(raster, format, quality)?;
    progress.finish();
    Ok(encoded)
}

/// Decode `input` and re-encode it as `format`.
///
/// Decode and encode failures both propagate; nothing is partially written.
pub fn convert_image(
    input: &[u8],
    format: OutputFormat,
    quality: f32,
    progress: &mut Progress<'_>,
) -> Result<EncodedImage> {
    progress.report(0);
    let raster = Raster::decode(input)?;
    convert_raster(&raster, format, quality, progress)
}
