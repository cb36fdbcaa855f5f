//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.
//! Scaling uses integer arithmetic with round-half-up, so the same inputs
//! always produce the same pixel counts.

use super::params::{CropRect, SizeSpec};
use super::processor::ProcessError;

/// `round(value * numerator / denominator)` with halves rounded up.
fn scale_rounded(value: u32, numerator: u32, denominator: u32) -> u32 {
    let value = value as u64;
    let numerator = numerator as u64;
    let denominator = denominator as u64;
    let scaled = (2 * value * numerator + denominator) / (2 * denominator);
    scaled.clamp(1, u32::MAX as u64) as u32
}

/// Calculate aspect-preserving dimensions bounded by `target_max`.
///
/// The longer edge (height for portrait and square sources, width for
/// landscape) becomes `min(target_max, edge)`; the other edge is scaled by the
/// same ratio. Images are never upscaled: a `target_max` at or above the
/// longer edge returns the source dimensions unchanged.
///
/// # Examples
/// ```
/// # use airbrush::imaging::calculate_dimensions;
/// // 1500x1000 landscape bounded to 300 → 300x200
/// assert_eq!(calculate_dimensions(1500, 1000, 300).unwrap(), (300, 200));
///
/// // Larger than the source → clipped to the original
/// assert_eq!(calculate_dimensions(1500, 1000, 2000).unwrap(), (1500, 1000));
/// ```
pub fn calculate_dimensions(
    source_width: u32,
    source_height: u32,
    target_max: u32,
) -> Result<(u32, u32), ProcessError> {
    if target_max == 0 {
        return Err(ProcessError::Geometry(
            "target dimension must be positive".into(),
        ));
    }
    if source_width == 0 || source_height == 0 {
        return Err(ProcessError::Geometry(format!(
            "source has no area ({source_width}x{source_height})"
        )));
    }

    if source_height >= source_width {
        // Portrait or square: height is the bounded edge
        let h = target_max.min(source_height);
        let w = scale_rounded(h, source_width, source_height);
        Ok((w, h))
    } else {
        // Landscape: width is the bounded edge
        let w = target_max.min(source_width);
        let h = scale_rounded(w, source_height, source_width);
        Ok((w, h))
    }
}

/// Largest centered rectangle of the source with the target's aspect ratio.
///
/// This is the crop half of a fill resize: scaling the returned rectangle to
/// `target` covers the whole output without letterboxing or distortion.
pub fn calculate_fill_crop(source: (u32, u32), target: (u32, u32)) -> CropRect {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    // Compare src_w/src_h against tgt_w/tgt_h without floating point
    let src_cross = src_w as u64 * tgt_h as u64;
    let tgt_cross = src_h as u64 * tgt_w as u64;

    if src_cross > tgt_cross {
        // Source is wider: keep full height, trim the sides
        let width = scale_rounded(src_h, tgt_w, tgt_h).min(src_w);
        CropRect {
            x: (src_w - width) / 2,
            y: 0,
            width,
            height: src_h,
        }
    } else {
        // Source is taller (or equal): keep full width, trim top and bottom
        let height = scale_rounded(src_w, tgt_h, tgt_w).min(src_h);
        CropRect {
            x: 0,
            y: (src_h - height) / 2,
            width: src_w,
            height,
        }
    }
}

/// Resolve a preview [`SizeSpec`] against the source into exact output dimensions.
pub fn resolve_size(source: (u32, u32), spec: SizeSpec) -> Result<(u32, u32), ProcessError> {
    match spec {
        SizeSpec::Max(target) => calculate_dimensions(source.0, source.1, target),
        SizeSpec::Exact(0, _) | SizeSpec::Exact(_, 0) => Err(ProcessError::Geometry(format!(
            "target dimensions must be positive, got {spec}"
        ))),
        SizeSpec::Exact(w, h) => Ok((w, h)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // calculate_dimensions tests
    // =========================================================================

    #[test]
    fn landscape_source_bounds_width() {
        assert_eq!(calculate_dimensions(1500, 1000, 300).unwrap(), (300, 200));
    }

    #[test]
    fn portrait_source_bounds_height() {
        assert_eq!(calculate_dimensions(1000, 1500, 300).unwrap(), (200, 300));
    }

    #[test]
    fn square_source_treated_as_portrait() {
        assert_eq!(calculate_dimensions(800, 800, 200).unwrap(), (200, 200));
    }

    #[test]
    fn clips_instead_of_upscaling() {
        assert_eq!(
            calculate_dimensions(1500, 1000, 2000).unwrap(),
            (1500, 1000)
        );
        assert_eq!(calculate_dimensions(640, 480, 640).unwrap(), (640, 480));
    }

    #[test]
    fn never_upscales_for_any_large_target() {
        for (w, h) in [(1, 1), (3, 7), (1920, 1080), (1080, 1920), (5000, 4999)] {
            for extra in [0, 1, 500] {
                let target = w.max(h) + extra;
                assert_eq!(calculate_dimensions(w, h, target).unwrap(), (w, h));
            }
        }
    }

    #[test]
    fn portrait_keeps_ratio_within_one_pixel() {
        for (w, h) in [(3, 4), (1000, 1500), (333, 1000), (999, 1000)] {
            for target in [1, 7, 100, h - 1].into_iter().filter(|&t| t < h) {
                let (nw, nh) = calculate_dimensions(w, h, target).unwrap();
                assert_eq!(nh, target);
                let exact = target as f64 * w as f64 / h as f64;
                assert!((nw as f64 - exact).abs() <= 1.0, "{w}x{h}@{target}");
            }
        }
    }

    #[test]
    fn rounds_half_up() {
        // 3x2 bounded to 1 → height 0.666 → rounds to 1
        assert_eq!(calculate_dimensions(3, 2, 1).unwrap(), (1, 1));
        // 4x2 bounded to 3 → height exactly 1.5 → 2
        assert_eq!(calculate_dimensions(4, 2, 3).unwrap(), (3, 2));
        // 4x2 bounded to 1 → height 0.5 → 1
        assert_eq!(calculate_dimensions(4, 2, 1).unwrap(), (1, 1));
    }

    #[test]
    fn extreme_aspect_stays_positive() {
        assert_eq!(calculate_dimensions(10000, 1, 10).unwrap(), (10, 1));
    }

    #[test]
    fn rejects_zero_target() {
        assert!(matches!(
            calculate_dimensions(1500, 1000, 0),
            Err(ProcessError::Geometry(_))
        ));
    }

    #[test]
    fn rejects_empty_source() {
        assert!(calculate_dimensions(0, 1000, 10).is_err());
        assert!(calculate_dimensions(1000, 0, 10).is_err());
    }

    #[test]
    fn deterministic_across_calls() {
        let first = calculate_dimensions(1234, 987, 321).unwrap();
        for _ in 0..10 {
            assert_eq!(calculate_dimensions(1234, 987, 321).unwrap(), first);
        }
    }

    // =========================================================================
    // calculate_fill_crop tests
    // =========================================================================

    #[test]
    fn fill_crop_wider_source_trims_sides() {
        // 1500x1000 (3:2) → 1:1 target keeps full height
        let rect = calculate_fill_crop((1500, 1000), (100, 100));
        assert_eq!(
            rect,
            CropRect {
                x: 250,
                y: 0,
                width: 1000,
                height: 1000
            }
        );
    }

    #[test]
    fn fill_crop_taller_source_trims_top_and_bottom() {
        // 600x800 → 2:1 target keeps full width, height 300 centered
        let rect = calculate_fill_crop((600, 800), (200, 100));
        assert_eq!(
            rect,
            CropRect {
                x: 0,
                y: 250,
                width: 600,
                height: 300
            }
        );
    }

    #[test]
    fn fill_crop_same_aspect_is_identity() {
        let rect = calculate_fill_crop((1500, 1000), (300, 200));
        assert_eq!(
            rect,
            CropRect {
                x: 0,
                y: 0,
                width: 1500,
                height: 1000
            }
        );
    }

    #[test]
    fn fill_crop_always_fits_source() {
        for source in [(1, 1), (1500, 1000), (7, 3000), (3000, 7)] {
            for target in [(1, 1), (200, 100), (100, 200), (75, 75), (1920, 1)] {
                let rect = calculate_fill_crop(source, target);
                assert!(rect.fits_within(source.0, source.1), "{source:?} {target:?}");
                assert!(rect.width > 0 && rect.height > 0);
            }
        }
    }

    // =========================================================================
    // resolve_size tests
    // =========================================================================

    #[test]
    fn resolve_exact_passes_through() {
        assert_eq!(
            resolve_size((1500, 1000), SizeSpec::Exact(500, 250)).unwrap(),
            (500, 250)
        );
    }

    #[test]
    fn resolve_max_auto_scales() {
        assert_eq!(
            resolve_size((1500, 1000), SizeSpec::Max(150)).unwrap(),
            (150, 100)
        );
    }

    #[test]
    fn resolve_rejects_zero_extent() {
        assert!(resolve_size((1500, 1000), SizeSpec::Exact(0, 100)).is_err());
        assert!(resolve_size((1500, 1000), SizeSpec::Max(0)).is_err());
    }
}
