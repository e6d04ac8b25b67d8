//! Structural complexity ("wrinkliness") from concentric ring sampling.
//!
//! Rings of growing radius are walked around the colony centroid. Along each
//! ring, brightness steps between adjacent samples larger than
//! `min_brightness_step` are counted as elevations. The scan stops at the
//! first ring that leaves the colony mask.

use image::GrayImage;

use crate::circle_raster::ring_points;
use crate::mask::Mask;

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MorphologyConfig {
    pub initial_radius: u32,
    pub radius_step: u32,
    pub min_brightness_step: f64,
    /// Hard cap on the number of rings.
    pub max_circle_count: usize,
    /// Outermost completed rings left out of the whole-colony score.
    pub circles_to_ignore: usize,
    /// Rings summed into the size-independent score.
    pub fixed_circle_count: usize,
    /// Distance along the ring between compared samples.
    pub pair_offset: usize,
}

impl Default for MorphologyConfig {
    fn default() -> Self {
        Self {
            initial_radius: 2,
            radius_step: 1,
            min_brightness_step: 3.0,
            max_circle_count: 200,
            circles_to_ignore: 1,
            fixed_circle_count: 10,
            pair_offset: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct MorphologyScores {
    /// Elevation count per completed ring, innermost first.
    pub elevation_counts: Vec<u32>,
    /// Σ over the first `fixed_circle_count` rings.
    pub fixed_circles: u64,
    /// Σ over all completed rings except the last `circles_to_ignore`.
    pub whole_colony: u64,
    /// `1000 · whole_colony / colony_size`.
    pub normalized: f64,
}

/// Mean of the in-bounds 3×3 neighbourhood of `(x, y)`.
fn neighbourhood_mean(gray: &GrayImage, x: i32, y: i32) -> f64 {
    let (w, h) = (gray.width() as i32, gray.height() as i32);
    let mut sum = 0u32;
    let mut n = 0u32;
    for ny in (y - 1)..=(y + 1) {
        for nx in (x - 1)..=(x + 1) {
            if nx >= 0 && ny >= 0 && nx < w && ny < h {
                sum += gray.get_pixel(nx as u32, ny as u32)[0] as u32;
                n += 1;
            }
        }
    }
    if n == 0 {
        0.0
    } else {
        sum as f64 / n as f64
    }
}

/// Elevation counts of every ring that fits entirely inside `mask`.
pub fn ring_elevations(
    gray: &GrayImage,
    mask: &Mask,
    center: [i32; 2],
    cfg: &MorphologyConfig,
) -> Vec<u32> {
    let mut counts = Vec::new();
    let offset = cfg.pair_offset.max(1);
    'rings: for k in 0..cfg.max_circle_count {
        let radius = cfg.initial_radius + k as u32 * cfg.radius_step;
        let points = ring_points(center, radius);
        let mut samples = Vec::with_capacity(points.len());
        for [x, y] in points {
            if !mask.get_signed(x as i64, y as i64) {
                break 'rings;
            }
            samples.push(neighbourhood_mean(gray, x, y));
        }
        let elevations = samples
            .iter()
            .zip(samples.iter().skip(offset))
            .filter(|(a, b)| (*b - *a).abs() > cfg.min_brightness_step)
            .count();
        counts.push(elevations as u32);
        // A zero step would resample the same ring forever.
        if cfg.radius_step == 0 {
            break;
        }
    }
    counts
}

/// Score the colony under `mask` around `centroid`.
pub fn score(
    gray: &GrayImage,
    mask: &Mask,
    centroid: [f64; 2],
    colony_size: f64,
    cfg: &MorphologyConfig,
) -> MorphologyScores {
    let center = [centroid[0].round() as i32, centroid[1].round() as i32];
    let elevation_counts = ring_elevations(gray, mask, center, cfg);

    let fixed_circles = elevation_counts
        .iter()
        .take(cfg.fixed_circle_count)
        .map(|&c| c as u64)
        .sum();
    let kept = elevation_counts.len().saturating_sub(cfg.circles_to_ignore);
    let whole_colony: u64 = elevation_counts[..kept].iter().map(|&c| c as u64).sum();
    let normalized = if colony_size > 0.0 {
        1000.0 * whole_colony as f64 / colony_size
    } else {
        0.0
    };

    MorphologyScores {
        elevation_counts,
        fixed_circles,
        whole_colony,
        normalized,
    }
}
