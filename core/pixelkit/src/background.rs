//! Background removal by colour distance to the image corners.
//!
//! Three passes over the raster:
//!
//! 1. Estimate the background colour from square samples in all four corners.
//! 2. Rewrite alpha: pixels close to that colour, or near-white and
//!    unsaturated, are cleared or faded.
//! 3. Restore some opacity along the boundaries that pass 2 carved out, so
//!    thin edges (hair, fabric) do not disappear into a halo.
//!
//! All thresholds are empirically tuned for light, white or pastel
//! backgrounds. Dark or textured backgrounds are a known limitation.

use crate::codec::{encode, EncodedImage, OutputFormat};
use crate::error::Result;
use crate::progress::Progress;
use crate::raster::{brightness, chroma_variance, Raster, CHANNELS};

/// Upper bound on the side of each corner sample square.
const MAX_SAMPLE_SIZE: u32 = 50;

/// Euclidean RGB distance under which a pixel is background.
const COLOR_DISTANCE_THRESHOLD: f64 = 40.0;

/// Alpha bonus for a pixel with enough transparent neighbours.
const EDGE_ALPHA_BOOST: u8 = 30;

/// Each fully transparent neighbour adds this much edge strength.
const EDGE_WEIGHT: u32 = 50;

/// Edge strength must exceed this (three or more transparent neighbours).
const EDGE_THRESHOLD: u32 = 100;

/// Side of the square sampled in each corner: `min(50, w/10, h/10)`.
pub fn sample_size(width: u32, height: u32) -> u32 {
    MAX_SAMPLE_SIZE.min(width / 10).min(height / 10)
}

/// Pass 1: average RGB of the four corner squares.
///
/// Returns `None` for images under 10px on a side, where no samples are
/// taken; colour matching is then skipped entirely.
pub fn estimate_background(raster: &Raster) -> Option<[f64; 3]> {
    let (width, height) = (raster.width(), raster.height());
    let size = sample_size(width, height);
    if size == 0 {
        return None;
    }

    let mut sum = [0u64; 3];
    let mut count = 0u64;
    for dy in 0..size {
        for dx in 0..size {
            let corners = [
                (dx, dy),
                (width - 1 - dx, dy),
                (dx, height - 1 - dy),
                (width - 1 - dx, height - 1 - dy),
            ];
            for (x, y) in corners {
                let [r, g, b, _] = raster.pixel(x, y);
                sum[0] += r as u64;
                sum[1] += g as u64;
                sum[2] += b as u64;
                count += 1;
            }
        }
    }

    let n = count as f64;
    let average = [sum[0] as f64 / n, sum[1] as f64 / n, sum[2] as f64 / n];
    log::trace!("estimated background colour {average:?} from {count} samples");
    Some(average)
}

/// Store a fractional alpha the way a clamped byte array does: clamp, then
/// round half to even.
fn clamped_byte(value: f64) -> u8 {
    value.clamp(0.0, 255.0).round_ties_even() as u8
}

/// New alpha for one pixel in pass 2, or `None` to leave it unchanged.
///
/// Rules are checked in order and the first match wins; an exact
/// background-colour match outranks the brightness heuristics.
pub fn classify_alpha(rgba: [u8; 4], background: Option<[f64; 3]>) -> Option<u8> {
    let [r, g, b, a] = rgba;

    if let Some([br, bg, bb]) = background {
        let distance = ((r as f64 - br).powi(2)
            + (g as f64 - bg).powi(2)
            + (b as f64 - bb).powi(2))
        .sqrt();
        if distance < COLOR_DISTANCE_THRESHOLD {
            return Some(0);
        }
    }

    let luma = brightness(r, g, b);
    let variance = chroma_variance(r, g, b);

    if luma > 245.0 && variance < 20 {
        return Some(0);
    }
    if luma > 230.0 && variance < 30 {
        let fade = ((luma - 230.0) * 10.0).min(200.0);
        return Some(clamped_byte(a as f64 - fade));
    }
    if luma > 235.0 && r.min(g).min(b) > 220 {
        return Some(a.saturating_sub(100));
    }
    None
}

/// Pass 2: rewrite alpha for every pixel that is not already transparent.
/// Returns the number of pixels changed.
fn rewrite_alpha(raster: &mut Raster, background: Option<[f64; 3]>) -> usize {
    let mut changed = 0;
    for pixel in raster.pixels_mut().chunks_exact_mut(CHANNELS) {
        if pixel[3] == 0 {
            continue;
        }
        let rgba = [pixel[0], pixel[1], pixel[2], pixel[3]];
        if let Some(alpha) = classify_alpha(rgba, background) {
            if alpha != pixel[3] {
                changed += 1;
            }
            pixel[3] = alpha;
        }
    }
    changed
}

/// Pass 3: boost alpha of visible pixels bordered by transparency.
///
/// Neighbours are read from a snapshot of the pass-2 alpha channel so the
/// outcome does not depend on scan order. Only interior pixels are visited;
/// each therefore has all eight neighbours. Returns the number of boosted
/// pixels.
fn preserve_edges(raster: &mut Raster) -> usize {
    let (width, height) = (raster.width() as usize, raster.height() as usize);
    if width < 3 || height < 3 {
        return 0;
    }

    let snapshot: Vec<u8> = raster
        .pixels()
        .chunks_exact(CHANNELS)
        .map(|pixel| pixel[3])
        .collect();
    let pixels = raster.pixels_mut();
    let mut boosted = 0;

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let i = y * width + x;
            if snapshot[i] == 0 {
                continue;
            }

            let mut strength = 0;
            for ny in y - 1..=y + 1 {
                for nx in x - 1..=x + 1 {
                    if (nx, ny) != (x, y) && snapshot[ny * width + nx] == 0 {
                        strength += EDGE_WEIGHT;
                    }
                }
            }

            if strength > EDGE_THRESHOLD {
                let alpha = &mut pixels[i * CHANNELS + 3];
                *alpha = alpha.saturating_add(EDGE_ALPHA_BOOST);
                boosted += 1;
            }
        }
    }
    boosted
}

/// Remove the background of `raster` by rewriting its alpha channel.
///
/// This is destructive: colour channels are untouched but alpha is
/// overwritten in place. Clone the raster first to keep the original.
pub fn remove_background_in_place(raster: &mut Raster, progress: &mut Progress<'_>) {
    progress.report(60);

    let background = estimate_background(raster);
    let cleared = rewrite_alpha(raster, background);
    let boosted = preserve_edges(raster);

    log::debug!(
        "background removal on {}x{}: {} pixels rewritten, {} edge pixels boosted",
        raster.width(),
        raster.height(),
        cleared,
        boosted
    );
    progress.report(85);
}

/// Remove the background and encode the result as PNG so transparency is
/// preserved exactly.
///
/// Takes the raster by value; only an encoding failure is an error.
pub fn remove_background(mut raster: Raster, progress: &mut Progress<'_>) -> Result<EncodedImage> {
    progress.report(0);
    progress.report(20);
    progress.report(40);

    remove_background_in_place(&mut raster, progress);

    progress.report(95);
    let encoded = encode(&raster, OutputFormat::Png, 1.0)?;
    progress.finish();
    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: [u8; 4] = [255, 255, 255, 255];

    fn alpha_at(raster: &Raster, x: u32, y: u32) -> u8 {
        raster.pixel(x, y)[3]
    }

    #[test]
    fn sample_size_is_bounded() {
        assert_eq!(sample_size(1000, 1000), 50);
        assert_eq!(sample_size(100, 300), 10);
        assert_eq!(sample_size(9, 400), 0);
    }

    #[test]
    fn corner_average_of_uniform_image() {
        let raster = Raster::filled(40, 40, [10, 200, 30, 255]).unwrap();
        assert_eq!(estimate_background(&raster), Some([10.0, 200.0, 30.0]));
    }

    #[test]
    fn corner_average_mixes_all_four_corners() {
        // 20x20 -> 2x2 samples per corner; paint the top-left corner black.
        let mut raster = Raster::filled(20, 20, WHITE).unwrap();
        for y in 0..2 {
            for x in 0..2 {
                raster.put_pixel(x, y, [0, 0, 0, 255]);
            }
        }
        let [r, g, b] = estimate_background(&raster).unwrap();
        assert_eq!([r, g, b], [191.25, 191.25, 191.25]);
    }

    #[test]
    fn tiny_images_skip_colour_matching() {
        let raster = Raster::filled(8, 8, [90, 90, 90, 255]).unwrap();
        assert_eq!(estimate_background(&raster), None);
        assert_eq!(classify_alpha([90, 90, 90, 255], None), None);
    }

    #[test]
    fn rule_order_prefers_colour_match() {
        let background = Some([100.0, 120.0, 140.0]);
        assert_eq!(classify_alpha([100, 120, 140, 255], background), Some(0));
        // Near-white, low saturation.
        assert_eq!(classify_alpha([250, 250, 250, 255], None), Some(0));
        // Soft falloff: luma 235 -> fade 50.
        assert_eq!(classify_alpha([235, 235, 235, 255], None), Some(205));
        // Saturated but bright: min channel above 220, variance 60.
        assert_eq!(classify_alpha([255, 235, 225, 255], None), Some(155));
        // Dark subject untouched.
        assert_eq!(classify_alpha([20, 40, 200, 255], None), None);
    }

    #[test]
    fn soft_falloff_saturates_at_zero() {
        assert_eq!(classify_alpha([240, 240, 240, 50], None), Some(0));
        assert_eq!(classify_alpha([255, 235, 225, 60], None), Some(0));
    }

    #[test]
    fn transparent_pixels_are_not_revisited() {
        let mut raster = Raster::filled(12, 12, [30, 60, 90, 0]).unwrap();
        assert_eq!(rewrite_alpha(&mut raster, Some([30.0, 60.0, 90.0])), 0);
    }

    #[test]
    fn edge_boost_reads_from_snapshot() {
        // A 5x5 opaque block with a transparent left column: column 1 has
        // three transparent neighbours, column 2 has none in the snapshot.
        let mut raster = Raster::filled(5, 5, [0, 0, 0, 200]).unwrap();
        for y in 0..5 {
            raster.put_pixel(0, y, [0, 0, 0, 0]);
        }
        preserve_edges(&mut raster);
        for y in 1..4 {
            assert_eq!(alpha_at(&raster, 1, y), 230);
            assert_eq!(alpha_at(&raster, 2, y), 200);
        }
        // Border rows are never visited.
        assert_eq!(alpha_at(&raster, 1, 0), 200);
    }

    #[test]
    fn edge_boost_clamps_at_255() {
        let mut raster = Raster::filled(3, 3, [0, 0, 0, 0]).unwrap();
        raster.put_pixel(1, 1, [0, 0, 0, 250]);
        preserve_edges(&mut raster);
        assert_eq!(alpha_at(&raster, 1, 1), 255);
    }

    #[test]
    fn removes_white_around_blue_square() {
        let mut raster = Raster::filled(100, 100, WHITE).unwrap();
        for y in 30..70 {
            for x in 30..70 {
                raster.put_pixel(x, y, [0, 0, 255, 255]);
            }
        }
        remove_background_in_place(&mut raster, &mut Progress::none());

        for y in 0..100 {
            for x in 0..100 {
                let inside = (30..70).contains(&x) && (30..70).contains(&y);
                if !inside {
                    assert_eq!(alpha_at(&raster, x, y), 0, "({x}, {y})");
                }
            }
        }
        assert_eq!(alpha_at(&raster, 50, 50), 255);
        // Corners of the square border transparency and stay capped.
        assert_eq!(alpha_at(&raster, 30, 30), 255);
    }

    #[test]
    fn remove_background_emits_png_with_alpha() {
        let mut raster = Raster::filled(40, 40, WHITE).unwrap();
        raster.put_pixel(20, 20, [200, 0, 0, 255]);
        let mut seen = Vec::new();
        let mut sink = |p: u8| seen.push(p);
        let encoded = remove_background(raster, &mut Progress::new(&mut sink)).unwrap();

        assert_eq!(encoded.format, OutputFormat::Png);
        let decoded = Raster::decode(&encoded.data).unwrap();
        assert_eq!(decoded.pixel(0, 0)[3], 0);
        assert_eq!(decoded.pixel(20, 20), [200, 0, 0, 255]);
        assert_eq!(seen, vec![0, 20, 40, 60, 85, 95, 100]);
    }
}
