//! Pure crop/resize geometry.
//!
//! All functions here are pure and testable without any I/O or images.
//! Every region and size they produce feeds the content-addressed
//! [naming](crate::naming) scheme, so the arithmetic (including every
//! rounding direction) is part of the output contract: change it and
//! every existing cached thumbnail is orphaned.

use crate::config::DisplayConfig;
use std::fmt;

/// A rectangular region in source-pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Region {
    pub fn size(&self) -> (u32, u32) {
        (self.w, self.h)
    }

    /// Uniform integer scaling of all four fields.
    pub fn scale(&self, scale: u32) -> Region {
        Region {
            x: self.x * scale,
            y: self.y * scale,
            w: self.w * scale,
            h: self.h * scale,
        }
    }
}

impl fmt::Display for Region {
    /// Canonical form used in content-addressed names. Frozen.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Region(x={}, y={}, w={}, h={})",
            self.x, self.y, self.w, self.h
        )
    }
}

/// Geometry constants derived from the configured display box.
#[derive(Debug, Clone, Copy)]
pub struct DisplayGeometry {
    /// Paired-thumbnail crop box at full resolution (DPI-scaled).
    pub crop_width: u32,
    pub crop_height: u32,
    /// Width cap for standalone cover thumbnails.
    pub cover_max_width: u32,
    /// Aspect-ratio clamp for cover thumbnails, measured from the
    /// extreme card dimensions.
    pub cover_min_ratio: f64,
    pub cover_max_ratio: f64,
    /// Longer-side target for small gallery thumbnails.
    pub small_target: u32,
}

impl DisplayGeometry {
    pub fn from_config(display: &DisplayConfig) -> Self {
        // The crop box is half the card width (the LR/SR slider shows
        // each side in half the card) by the full card height, scaled up
        // for high-DPI devices. All rounding is up.
        let half_width = display.max_width.div_ceil(2);
        Self {
            crop_width: (half_width as f64 * display.dpi_scale).ceil() as u32,
            crop_height: (display.max_height as f64 * display.dpi_scale).ceil() as u32,
            cover_max_width: display.max_width,
            cover_min_ratio: display.min_width as f64 / display.max_height as f64,
            cover_max_ratio: display.max_width as f64 / display.min_height as f64,
            small_target: display.small_target,
        }
    }
}

impl Default for DisplayGeometry {
    fn default() -> Self {
        Self::from_config(&DisplayConfig::default())
    }
}

/// Crop region for the LR side of a pair.
///
/// The DPI-scaled crop box is divided by the pair scale (rounded up per
/// dimension), centered within the source, and clamped so the crop never
/// exceeds source bounds.
pub fn lr_crop(size: (u32, u32), scale: u32, geom: &DisplayGeometry) -> Region {
    let (w, h) = size;
    let target_w = geom.crop_width.div_ceil(scale);
    let target_h = geom.crop_height.div_ceil(scale);
    Region {
        x: w.saturating_sub(target_w) / 2,
        y: h.saturating_sub(target_h) / 2,
        w: w.min(target_w),
        h: h.min(target_h),
    }
}

/// Crop region for the SR side of a pair.
///
/// Computed as the LR crop of the downscaled size, scaled back up — this
/// keeps the SR crop pixel-aligned with the LR crop at the pair's actual
/// resolution ratio even when the two sides round differently.
pub fn sr_crop(size: (u32, u32), scale: u32, geom: &DisplayGeometry) -> Region {
    let (w, h) = size;
    lr_crop((w / scale, h / scale), scale, geom).scale(scale)
}

/// Crop and resize sizes for a standalone cover thumbnail.
///
/// The aspect ratio is clamped into `[cover_min_ratio, cover_max_ratio]`
/// by cropping width or height; if the result is wider than the display
/// cap, both dimensions are scaled down uniformly (height rounded up).
pub fn cover_crop(size: (u32, u32), geom: &DisplayGeometry) -> ((u32, u32), (u32, u32)) {
    let (w, h) = size;
    let ratio = w as f64 / h as f64;

    let crop_size = if ratio > geom.cover_max_ratio {
        ((h as f64 * geom.cover_max_ratio).ceil() as u32, h)
    } else if ratio < geom.cover_min_ratio {
        (w, (w as f64 / geom.cover_min_ratio).ceil() as u32)
    } else {
        size
    };

    let mut resize_size = crop_size;
    if resize_size.0 > geom.cover_max_width {
        let scale = geom.cover_max_width as f64 / resize_size.0 as f64;
        resize_size = (
            geom.cover_max_width,
            (resize_size.1 as f64 * scale).ceil() as u32,
        );
    }
    (crop_size, resize_size)
}

/// Resize target for a small gallery thumbnail.
///
/// Scales down (never up) so the longer side equals the small target;
/// square inputs map to target×target; the shorter side is rounded
/// proportionally with a 1px floor.
pub fn small_crop(size: (u32, u32), geom: &DisplayGeometry) -> (u32, u32) {
    let target = geom.small_target;
    let (w, h) = size;
    if w <= target && h <= target {
        return (w, h);
    }
    if w == h {
        return (target, target);
    }
    if w > h {
        let scaled = (h as f64 * target as f64 / w as f64).round() as u32;
        (target, scaled.max(1))
    } else {
        let scaled = (w as f64 * target as f64 / h as f64).round() as u32;
        (scaled.max(1), target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geom() -> DisplayGeometry {
        DisplayGeometry::default()
    }

    fn assert_in_bounds(region: &Region, size: (u32, u32)) {
        assert!(
            region.x + region.w <= size.0,
            "{region} exceeds width {}",
            size.0
        );
        assert!(
            region.y + region.h <= size.1,
            "{region} exceeds height {}",
            size.1
        );
    }

    // =========================================================================
    // Display geometry derivation
    // =========================================================================

    #[test]
    fn crop_box_from_default_display() {
        let g = geom();
        // ceil(ceil(549 / 2) * 1.33) = ceil(275 * 1.33) = ceil(365.75) = 366
        assert_eq!(g.crop_width, 366);
        // ceil(222 * 1.33) = ceil(295.26) = 296
        assert_eq!(g.crop_height, 296);
        assert_eq!(g.cover_max_width, 549);
    }

    #[test]
    fn cover_ratios_from_extreme_card_dimensions() {
        let g = geom();
        assert!((g.cover_max_ratio - 549.0 / 154.0).abs() < 1e-9);
        assert!((g.cover_min_ratio - 266.0 / 222.0).abs() < 1e-9);
    }

    // =========================================================================
    // Region
    // =========================================================================

    #[test]
    fn region_display_is_canonical() {
        let r = Region {
            x: 5,
            y: 0,
            w: 366,
            h: 296,
        };
        assert_eq!(r.to_string(), "Region(x=5, y=0, w=366, h=296)");
    }

    #[test]
    fn region_scale_multiplies_all_fields() {
        let r = Region {
            x: 3,
            y: 7,
            w: 10,
            h: 20,
        };
        assert_eq!(
            r.scale(4),
            Region {
                x: 12,
                y: 28,
                w: 40,
                h: 80
            }
        );
    }

    // =========================================================================
    // lr_crop
    // =========================================================================

    #[test]
    fn lr_crop_centers_within_large_source() {
        let r = lr_crop((1000, 800), 1, &geom());
        assert_eq!(r.size(), (366, 296));
        assert_eq!(r.x, (1000 - 366) / 2);
        assert_eq!(r.y, (800 - 296) / 2);
        assert_in_bounds(&r, (1000, 800));
    }

    #[test]
    fn lr_crop_divides_box_by_scale_rounding_up() {
        let r = lr_crop((1000, 800), 4, &geom());
        // ceil(366/4)=92, ceil(296/4)=74
        assert_eq!(r.size(), (92, 74));
    }

    #[test]
    fn lr_crop_clamps_to_small_source() {
        let r = lr_crop((100, 50), 1, &geom());
        assert_eq!(
            r,
            Region {
                x: 0,
                y: 0,
                w: 100,
                h: 50
            }
        );
    }

    #[test]
    fn lr_crop_bounds_hold_for_awkward_sizes() {
        for &size in &[(1, 1), (367, 297), (366, 296), (5000, 3), (3, 5000)] {
            for scale in 1..=8 {
                let r = lr_crop(size, scale, &geom());
                assert_in_bounds(&r, size);
            }
        }
    }

    // =========================================================================
    // sr_crop
    // =========================================================================

    #[test]
    fn sr_crop_aligns_with_lr_crop_times_scale() {
        let lr_size = (500, 400);
        let sr_size = (2000, 1600);
        let scale = 4;
        let lr = lr_crop(lr_size, scale, &geom());
        let sr = sr_crop(sr_size, scale, &geom());
        assert_eq!(sr, lr.scale(scale));
        assert_in_bounds(&sr, sr_size);
    }

    #[test]
    fn sr_crop_handles_non_multiple_dimensions() {
        // 2003x1601 at scale 4 → computed on (500, 400), scaled back up
        let sr = sr_crop((2003, 1601), 4, &geom());
        assert_in_bounds(&sr, (2003, 1601));
        assert_eq!(sr.size(), (368, 296));
    }

    #[test]
    fn sr_crop_at_scale_one_matches_lr_crop() {
        assert_eq!(sr_crop((800, 600), 1, &geom()), lr_crop((800, 600), 1, &geom()));
    }

    // =========================================================================
    // cover_crop
    // =========================================================================

    #[test]
    fn cover_crop_passes_through_in_range_ratio() {
        // 549x222 ratio ≈ 2.47, within [1.198, 3.565]
        let (crop, resize) = cover_crop((549, 222), &geom());
        assert_eq!(crop, (549, 222));
        assert_eq!(resize, (549, 222));
    }

    #[test]
    fn cover_crop_clamps_extreme_landscape() {
        // Ratio 10.0 clamps to max ratio: crop = (ceil(100 * 3.565), 100)
        let (crop, resize) = cover_crop((1000, 100), &geom());
        assert_eq!(crop, (357, 100));
        // 357 <= 549, no downscale
        assert_eq!(resize, (357, 100));
    }

    #[test]
    fn cover_crop_clamps_extreme_portrait() {
        let (crop, _) = cover_crop((100, 1000), &geom());
        // crop height = ceil(100 / (266/222)) = ceil(83.45) = 84
        assert_eq!(crop, (100, 84));
        let ratio = crop.0 as f64 / crop.1 as f64;
        assert!(ratio >= geom().cover_min_ratio - 0.02);
    }

    #[test]
    fn cover_crop_downscales_to_max_width() {
        let (crop, resize) = cover_crop((2000, 1000), &geom());
        assert_eq!(crop, (2000, 1000));
        assert_eq!(resize.0, 549);
        // ceil(1000 * 549/2000) = ceil(274.5) = 275
        assert_eq!(resize.1, 275);
    }

    #[test]
    fn cover_crop_ratio_invariant_holds() {
        let g = geom();
        for &size in &[(1000, 100), (100, 1000), (800, 600), (549, 549), (3840, 2160)] {
            let (crop, _) = cover_crop(size, &g);
            let ratio = crop.0 as f64 / crop.1 as f64;
            // ±1px of rounding slack on either dimension
            let min = (crop.0 as f64 - 1.0) / crop.1 as f64;
            let max = (crop.0 as f64 + 1.0) / crop.1 as f64;
            assert!(
                max >= g.cover_min_ratio && min <= g.cover_max_ratio,
                "size {size:?} → crop {crop:?} ratio {ratio}"
            );
        }
    }

    // =========================================================================
    // small_crop
    // =========================================================================

    #[test]
    fn small_crop_keeps_tiny_images() {
        assert_eq!(small_crop((50, 30), &geom()), (50, 30));
        assert_eq!(small_crop((72, 72), &geom()), (72, 72));
    }

    #[test]
    fn small_crop_square_maps_to_target_square() {
        assert_eq!(small_crop((500, 500), &geom()), (72, 72));
    }

    #[test]
    fn small_crop_landscape_longer_side_is_target() {
        assert_eq!(small_crop((1440, 720), &geom()), (72, 36));
    }

    #[test]
    fn small_crop_portrait_longer_side_is_target() {
        assert_eq!(small_crop((720, 1440), &geom()), (36, 72));
    }

    #[test]
    fn small_crop_shorter_side_floor_is_one() {
        assert_eq!(small_crop((10000, 20), &geom()), (72, 1));
        assert_eq!(small_crop((20, 10000), &geom()), (1, 72));
    }

    #[test]
    fn small_crop_bound_invariant() {
        let g = geom();
        for &size in &[(73, 72), (72, 73), (1000, 999), (30, 3000), (4096, 4096)] {
            let (w, h) = small_crop(size, &g);
            assert!(w.max(h) <= 72, "size {size:?} → ({w}, {h})");
            assert!(w.min(h) >= 1);
        }
    }
}
