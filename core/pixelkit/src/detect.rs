//! Subject detection: the bounding box of non-background content.

use crate::geometry::NaturalRect;
use crate::progress::Progress;
use crate::raster::{brightness, chroma_variance, Raster};

/// Pluggable subject detection backend.
///
/// Implement this trait to plug in a different segmentation (saliency model,
/// ML mask, ...) and pass it to [`crate::ImageProcessor::detector`].
pub trait SubjectDetector: Send + Sync {
    /// Bounding box of the subject in natural pixel coordinates, or `None`
    /// when nothing but background was found.
    fn detect(&self, raster: &Raster) -> Option<NaturalRect>;
}

/// Built-in heuristic detector tuned for light, low-saturation backgrounds.
///
/// Scans every other row and column, so box edges are accurate to ±2px.
/// The result is advisory; callers should let users adjust it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LumaChromaDetector;

impl LumaChromaDetector {
    const STRIDE: usize = 2;
    /// Pixels below this alpha never count as subject.
    const MIN_ALPHA: u8 = 200;
    /// Anything darker than this is subject.
    const MAX_BACKGROUND_BRIGHTNESS: f64 = 240.0;
    /// Anything more colourful than this is subject.
    const MAX_BACKGROUND_VARIANCE: u32 = 30;

    /// Whether a pixel is classified as subject.
    pub fn is_subject(rgba: [u8; 4]) -> bool {
        let [r, g, b, a] = rgba;
        if a < Self::MIN_ALPHA {
            return false;
        }
        brightness(r, g, b) < Self::MAX_BACKGROUND_BRIGHTNESS
            || chroma_variance(r, g, b) > Self::MAX_BACKGROUND_VARIANCE
    }
}

impl SubjectDetector for LumaChromaDetector {
    fn detect(&self, raster: &Raster) -> Option<NaturalRect> {
        let mut bounds: Option<(u32, u32, u32, u32)> = None;

        for y in (0..raster.height()).step_by(Self::STRIDE) {
            for x in (0..raster.width()).step_by(Self::STRIDE) {
                if !Self::is_subject(raster.pixel(x, y)) {
                    continue;
                }
                bounds = Some(match bounds {
                    None => (x, x, y, y),
                    Some((min_x, max_x, min_y, max_y)) => {
                        (min_x.min(x), max_x.max(x), min_y.min(y), max_y.max(y))
                    }
                });
            }
        }

        // A single sampled row or column has no area.
        let (min_x, max_x, min_y, max_y) = bounds?;
        if min_x >= max_x || min_y >= max_y {
            return None;
        }

        Some(NaturalRect::new(
            min_x as f64,
            min_y as f64,
            (max_x - min_x) as f64,
            (max_y - min_y) as f64,
        ))
    }
}

/// Run `detector` over `raster`, reporting progress at the same milestones
/// for every backend.
pub fn detect_with(
    detector: &dyn SubjectDetector,
    raster: &Raster,
    progress: &mut Progress<'_>,
) -> Option<NaturalRect> {
    progress.report(10);
    progress.report(30);
    progress.report(50);
    let found = detector.detect(raster);
    progress.report(80);

    match &found {
        Some(rect) => log::debug!("subject detected at {rect:?}"),
        None => log::debug!(
            "no subject found in {}x{} raster",
            raster.width(),
            raster.height()
        ),
    }

    progress.finish();
    found
}

/// Find the subject bounding box with the built-in [`LumaChromaDetector`].
pub fn detect_subject(raster: &Raster, progress: &mut Progress<'_>) -> Option<NaturalRect> {
    detect_with(&LumaChromaDetector, raster, progress)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: [u8; 4] = [255, 255, 255, 255];

    fn with_square(size: u32, at: u32, side: u32, color: [u8; 4]) -> Raster {
        let mut raster = Raster::filled(size, size, WHITE).unwrap();
        for y in at..at + side {
            for x in at..at + side {
                raster.put_pixel(x, y, color);
            }
        }
        raster
    }

    #[test]
    fn white_image_has_no_subject() {
        let raster = Raster::filled(64, 48, WHITE).unwrap();
        assert!(detect_subject(&raster, &mut Progress::none()).is_none());
    }

    #[test]
    fn transparent_image_has_no_subject() {
        let raster = Raster::filled(64, 48, [0, 0, 0, 0]).unwrap();
        assert!(detect_subject(&raster, &mut Progress::none()).is_none());
    }

    #[test]
    fn blue_square_is_boxed_within_stride() {
        let raster = with_square(100, 30, 40, [0, 0, 255, 255]);
        let rect = detect_subject(&raster, &mut Progress::none()).unwrap();
        assert!((rect.x - 30.0).abs() <= 2.0, "{rect:?}");
        assert!((rect.y - 30.0).abs() <= 2.0, "{rect:?}");
        assert!((rect.width - 40.0).abs() <= 2.0, "{rect:?}");
        assert!((rect.height - 40.0).abs() <= 2.0, "{rect:?}");
    }

    #[test]
    fn pale_saturated_pixels_count_as_subject() {
        // Brightness above 240 but colourful.
        assert!(LumaChromaDetector::is_subject([255, 235, 255, 255]));
        assert!(!LumaChromaDetector::is_subject([250, 250, 250, 255]));
        assert!(!LumaChromaDetector::is_subject([0, 0, 0, 199]));
    }

    #[test]
    fn single_row_of_content_is_not_a_subject() {
        let mut raster = Raster::filled(20, 20, WHITE).unwrap();
        for x in 0..20 {
            raster.put_pixel(x, 4, [0, 0, 0, 255]);
        }
        assert!(detect_subject(&raster, &mut Progress::none()).is_none());
    }

    #[test]
    fn odd_pixels_are_skipped_by_stride() {
        let mut raster = Raster::filled(20, 20, WHITE).unwrap();
        for y in 0..20 {
            for x in 0..20 {
                if x % 2 == 1 {
                    raster.put_pixel(x, y, [0, 0, 0, 255]);
                }
            }
        }
        assert!(detect_subject(&raster, &mut Progress::none()).is_none());
    }

    #[test]
    fn progress_ends_at_100() {
        let raster = with_square(32, 8, 16, [200, 0, 0, 255]);
        let mut seen = Vec::new();
        let mut sink = |p: u8| seen.push(p);
        detect_subject(&raster, &mut Progress::new(&mut sink));
        assert_eq!(seen, vec![10, 30, 50, 80, 100]);
    }
}
