use crate::codec::{encode, EncodedImage, OutputFormat};
use crate::error::Result;
use crate::geometry::{DisplayRect, DisplaySize, NaturalRect, ScaleFactor};
use crate::progress::Progress;
use crate::raster::{Raster, CHANNELS};

/// Coverage below this is treated as float noise from the span arithmetic.
const MIN_COVERAGE: f64 = 1e-9;

/// Source columns (or rows) contributing to one destination pixel, with the
/// fraction of each that is covered.
type Taps = Vec<(u32, f64)>;

/// Crop a display-space selection out of `raster`.
///
/// `display_size` is the rendered size of the image when `display_rect` was
/// drawn. Returns `None` when the selection is degenerate, the display size
/// is unusable, or the mapped rectangle leaves the image (stale layout after
/// a resize, for example). None of these are errors.
pub fn crop_raster(
    raster: &Raster,
    display_rect: DisplayRect,
    display_size: DisplaySize,
) -> Option<Raster> {
    if display_rect.is_empty() {
        log::debug!("crop rejected: empty selection {display_rect:?}");
        return None;
    }
    let Some(scale) = ScaleFactor::between(raster.natural_size(), display_size) else {
        log::debug!("crop rejected: unusable display size {display_size:?}");
        return None;
    };
    crop_natural(raster, display_rect.to_natural(scale))
}

/// Crop a natural-space rectangle out of `raster`, resampling fractional
/// edges.
///
/// The output is `round(width) × round(height)` pixels.
pub fn crop_natural(raster: &Raster, source: NaturalRect) -> Option<Raster> {
    if source.is_empty() || !source.fits_within(raster.natural_size()) {
        log::debug!(
            "crop rejected: {source:?} outside {}x{} raster",
            raster.width(),
            raster.height()
        );
        return None;
    }
    // Absorb the far-edge overshoot so no span reaches past the last pixel.
    let source = source.clamp_to(raster.natural_size());

    let out_width = source.width.round() as u32;
    let out_height = source.height.round() as u32;
    if out_width == 0 || out_height == 0 {
        log::debug!("crop rejected: {source:?} rounds to zero pixels");
        return None;
    }

    let columns = taps(source.x, source.width, out_width, raster.width());
    let rows = taps(source.y, source.height, out_height, raster.height());

    let mut pixels = Vec::with_capacity(out_width as usize * out_height as usize * CHANNELS);
    for row_taps in &rows {
        for column_taps in &columns {
            pixels.extend_from_slice(&area_average(raster, row_taps, column_taps));
        }
    }

    Raster::from_rgba(out_width, out_height, pixels).ok()
}

/// Split `[start, start + extent)` into `count` equal spans and list the
/// source pixels each span overlaps.
fn taps(start: f64, extent: f64, count: u32, limit: u32) -> Vec<Taps> {
    let step = extent / count as f64;
    let last = limit.saturating_sub(1) as i64;

    (0..count)
        .map(|i| {
            let lo = start + i as f64 * step;
            let hi = start + (i + 1) as f64 * step;
            let mut span = Taps::new();
            for cell in (lo.floor() as i64)..(hi.ceil() as i64) {
                let coverage = hi.min(cell as f64 + 1.0) - lo.max(cell as f64);
                if coverage > MIN_COVERAGE {
                    span.push((cell.clamp(0, last) as u32, coverage));
                }
            }
            span
        })
        .collect()
}

/// Alpha-weighted box filter over the covered source pixels, so fully
/// transparent pixels do not bleed their colour into the result.
fn area_average(raster: &Raster, rows: &[(u32, f64)], columns: &[(u32, f64)]) -> [u8; 4] {
    let mut color = [0.0f64; 3];
    let mut alpha = 0.0;
    let mut weight = 0.0;

    for &(y, wy) in rows {
        for &(x, wx) in columns {
            let [r, g, b, a] = raster.pixel(x, y);
            let w = wx * wy;
            let wa = w * a as f64;
            color[0] += r as f64 * wa;
            color[1] += g as f64 * wa;
            color[2] += b as f64 * wa;
            alpha += wa;
            weight += w;
        }
    }

    if weight <= 0.0 || alpha <= 0.0 {
        return [0, 0, 0, 0];
    }
    let channel = |v: f64| (v / alpha).round().clamp(0.0, 255.0) as u8;
    [
        channel(color[0]),
        channel(color[1]),
        channel(color[2]),
        (alpha / weight).round().clamp(0.0, 255.0) as u8,
    ]
}

/// Crop a display-space selection and encode it.
///
/// Returns `Ok(None)` for rejected geometry (see [`crop_raster`]); only
/// encoding failures are errors. The source raster is left untouched.
pub fn crop_image(
    raster: &Raster,
    display_rect: DisplayRect,
    display_size: DisplaySize,
    format: OutputFormat,
    quality: f32,
    progress: &mut Progress<'_>,
) -> Result<Option<EncodedImage>> {
    progress.report(0);

    let Some(cropped) = crop_raster(raster, display_rect, display_size) else {
        return Ok(None);
    };
    progress.report(50);

    let encoded = encode(&cropped, format, quality)?;
    progress.finish();
    Ok(Some(encoded))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard(width: u32, height: u32) -> Raster {
        let mut raster = Raster::filled(width, height, [0, 0, 0, 255]).unwrap();
        for y in 0..height {
            for x in 0..width {
                let v = if (x + y) % 2 == 0 { 255 } else { 0 };
                raster.put_pixel(x, y, [v, (x * 7) as u8, (y * 11) as u8, 255]);
            }
        }
        raster
    }

    #[test]
    fn full_frame_crop_is_identity() {
        let raster = checkerboard(37, 23);
        let display = DisplaySize::new(37.0, 23.0);
        let cropped = crop_raster(&raster, display.to_rect(), display).unwrap();
        assert_eq!(cropped, raster);
    }

    #[test]
    fn full_frame_crop_at_half_display_scale_is_identity() {
        let raster = checkerboard(40, 20);
        let display = DisplaySize::new(20.0, 10.0);
        let cropped = crop_raster(&raster, display.to_rect(), display).unwrap();
        assert_eq!(cropped, raster);
    }

    #[test]
    fn full_frame_crop_at_inexact_display_scale_is_identity() {
        // 100 / 11 * 11 overshoots 100 by an ulp.
        let raster = checkerboard(100, 100);
        for side in [11.0, 22.0, 39.0, 44.0, 78.0, 83.0] {
            let display = DisplaySize::new(side, side);
            let cropped = crop_raster(&raster, display.to_rect(), display);
            assert_eq!(cropped.as_ref(), Some(&raster), "display {side}");
        }
    }

    #[test]
    fn integer_crop_copies_pixels() {
        let raster = checkerboard(10, 10);
        let display = DisplaySize::new(10.0, 10.0);
        let cropped = crop_raster(&raster, DisplayRect::new(2.0, 3.0, 4.0, 5.0), display).unwrap();
        assert_eq!((cropped.width(), cropped.height()), (4, 5));
        for y in 0..5 {
            for x in 0..4 {
                assert_eq!(cropped.pixel(x, y), raster.pixel(x + 2, y + 3));
            }
        }
    }

    #[test]
    fn half_pixel_offset_blends_neighbours() {
        let mut raster = Raster::filled(2, 1, [0, 0, 0, 255]).unwrap();
        raster.put_pixel(1, 0, [200, 200, 200, 255]);
        let source = NaturalRect::new(0.5, 0.0, 1.0, 1.0);
        let cropped = crop_natural(&raster, source).unwrap();
        assert_eq!(cropped.pixel(0, 0), [100, 100, 100, 255]);
    }

    #[test]
    fn transparent_neighbours_do_not_tint() {
        let mut raster = Raster::filled(2, 1, [0, 0, 0, 0]).unwrap();
        raster.put_pixel(1, 0, [200, 10, 10, 255]);
        let cropped = crop_natural(&raster, NaturalRect::new(0.5, 0.0, 1.0, 1.0)).unwrap();
        let [r, g, b, a] = cropped.pixel(0, 0);
        assert_eq!([r, g, b], [200, 10, 10]);
        assert_eq!(a, 128);
    }

    #[test]
    fn degenerate_selection_is_rejected() {
        let raster = checkerboard(10, 10);
        let display = DisplaySize::new(10.0, 10.0);
        assert!(crop_raster(&raster, DisplayRect::new(1.0, 1.0, 0.0, 4.0), display).is_none());
        assert!(crop_raster(&raster, DisplayRect::new(1.0, 1.0, 4.0, 0.0), display).is_none());
    }

    #[test]
    fn out_of_bounds_selection_is_rejected() {
        let raster = checkerboard(10, 10);
        let display = DisplaySize::new(10.0, 10.0);
        assert!(crop_raster(&raster, DisplayRect::new(6.0, 0.0, 5.0, 5.0), display).is_none());
        assert!(crop_raster(&raster, DisplayRect::new(-1.0, 0.0, 5.0, 5.0), display).is_none());
    }

    #[test]
    fn stale_display_size_is_rejected() {
        // Selection made at 200px wide, but the image now renders at 100px.
        let raster = checkerboard(50, 50);
        let selection = DisplayRect::new(60.0, 0.0, 80.0, 40.0);
        assert!(crop_raster(&raster, selection, DisplaySize::new(100.0, 100.0)).is_none());
        assert!(crop_raster(&raster, selection, DisplaySize::new(0.0, 100.0)).is_none());
    }

    #[test]
    fn sub_pixel_output_is_rejected() {
        let raster = checkerboard(10, 10);
        assert!(crop_natural(&raster, NaturalRect::new(1.0, 1.0, 0.4, 3.0)).is_none());
    }

    #[test]
    fn same_region_at_two_display_scales_has_same_size() {
        let raster = checkerboard(120, 80);
        let at_1x = crop_raster(
            &raster,
            DisplayRect::new(13.0, 7.0, 51.0, 33.0),
            DisplaySize::new(120.0, 80.0),
        )
        .unwrap();
        let at_2x = crop_raster(
            &raster,
            DisplayRect::new(26.0, 14.0, 102.0, 66.0),
            DisplaySize::new(240.0, 160.0),
        )
        .unwrap();
        assert!(at_1x.width().abs_diff(at_2x.width()) <= 1);
        assert!(at_1x.height().abs_diff(at_2x.height()) <= 1);
    }

    #[test]
    fn crop_image_encodes_and_reports_progress() {
        let raster = checkerboard(20, 20);
        let display = DisplaySize::new(20.0, 20.0);
        let mut seen = Vec::new();
        let mut sink = |p: u8| seen.push(p);
        let encoded = crop_image(
            &raster,
            DisplayRect::new(5.0, 5.0, 10.0, 10.0),
            display,
            OutputFormat::Png,
            0.95,
            &mut Progress::new(&mut sink),
        )
        .unwrap()
        .unwrap();
        assert_eq!((encoded.width, encoded.height), (10, 10));
        assert_eq!(seen, vec![0, 50, 100]);
    }

    #[test]
    fn crop_image_rejection_is_not_an_error() {
        let raster = checkerboard(20, 20);
        let result = crop_image(
            &raster,
            DisplayRect::new(0.0, 0.0, 0.0, 0.0),
            DisplaySize::new(20.0, 20.0),
            OutputFormat::Png,
            0.95,
            &mut Progress::none(),
        );
        assert!(matches!(result, Ok(None)));
    }
}
