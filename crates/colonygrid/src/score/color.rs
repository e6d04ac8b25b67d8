//! Pigmentation ("biofilm") scoring on the color raster.
//!
//! Per-pixel score:
//!
//! ```text
//! color_gain      · clamp(red_gain·R − blue_green_gain·(G + B), 0, 255)
//! + brightness_gain · clamp(S + (255 − V), 0, 255)
//! ```
//!
//! with `S` and `V` the HSB saturation and brightness on a 0..=255 scale.
//! Each term is clamped before the two are combined.

use image::RgbImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::mask::Mask;

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    pub red_gain: f64,
    pub blue_green_gain: f64,
    pub color_gain: f64,
    pub brightness_gain: f64,
    /// Pixels scoring above this count towards the biofilm area.
    pub acceptance_threshold: f64,
    /// Upper bound on the number of random samples for `mean_sample`.
    pub max_samples: usize,
    /// Seed of the per-tile sampler.
    pub seed: u64,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            red_gain: 1.0,
            blue_green_gain: 0.5,
            color_gain: 1.0,
            brightness_gain: 0.5,
            acceptance_threshold: 60.0,
            max_samples: 1000,
            seed: 0x0c01_0417,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct ColorScores {
    /// Σ of positive per-pixel scores inside the colony.
    pub intensity_sum: f64,
    /// Colony pixels scoring above the acceptance threshold.
    pub biofilm_area: u64,
    /// `intensity_sum` restricted to the biofilm area.
    pub biofilm_sum: f64,
    /// `intensity_sum / colony_size`.
    pub relative_intensity: f64,
    /// Mean score over a seeded random sample of tile pixels.
    pub mean_sample: f64,
    pub error: bool,
}

/// HSB saturation and brightness on a 0..=255 scale.
pub fn saturation_brightness(rgb: [u8; 3]) -> (f64, f64) {
    let max = rgb.iter().copied().max().unwrap_or(0) as f64;
    let min = rgb.iter().copied().min().unwrap_or(0) as f64;
    let saturation = if max > 0.0 {
        (max - min) / max * 255.0
    } else {
        0.0
    };
    (saturation, max)
}

/// Score of a single pixel.
pub fn pixel_score(rgb: [u8; 3], cfg: &ColorConfig) -> f64 {
    let [r, g, b] = rgb.map(f64::from);
    let color = (cfg.red_gain * r - cfg.blue_green_gain * (g + b)).clamp(0.0, 255.0);
    let (s, v) = saturation_brightness(rgb);
    let tone = (s + (255.0 - v)).clamp(0.0, 255.0);
    cfg.color_gain * color + cfg.brightness_gain * tone
}

/// Score the colony under `mask`.
pub fn score(color: &RgbImage, mask: &Mask, colony_size: f64, cfg: &ColorConfig) -> ColorScores {
    let degenerate = mask.bounding_box().map_or(true, |b| b.is_degenerate());
    if degenerate || mask.dimensions() != color.dimensions() {
        return ColorScores {
            error: true,
            ..ColorScores::default()
        };
    }

    // Outside the mask every score is fixed at zero.
    let scores: Vec<f64> = color
        .pixels()
        .zip(mask.as_slice())
        .map(|(p, &inside)| if inside { pixel_score(p.0, cfg) } else { 0.0 })
        .collect();

    let mut out = ColorScores::default();
    for (&s, &inside) in scores.iter().zip(mask.as_slice()) {
        if !inside {
            continue;
        }
        if s > 0.0 {
            out.intensity_sum += s;
        }
        if s > cfg.acceptance_threshold {
            out.biofilm_area += 1;
            out.biofilm_sum += s;
        }
    }
    if colony_size > 0.0 {
        out.relative_intensity = out.intensity_sum / colony_size;
    }
    out.mean_sample = mean_sample(&scores, colony_size, cfg);
    out
}

/// Average of up to `min(max_samples, colony_size)` uniformly drawn tile
/// pixels, skipping samples that score exactly zero.
///
/// The generator is seeded from `cfg.seed` on every call, so the result does
/// not depend on which tiles were scored before.
fn mean_sample(scores: &[f64], colony_size: f64, cfg: &ColorConfig) -> f64 {
    if scores.is_empty() || colony_size < 1.0 {
        return 0.0;
    }
    let n = cfg.max_samples.min(colony_size as usize);
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let mut sum = 0.0;
    let mut kept = 0usize;
    for _ in 0..n {
        let s = scores[rng.gen_range(0..scores.len())];
        if s == 0.0 {
            continue;
        }
        sum += s;
        kept += 1;
    }
    if kept == 0 {
        0.0
    } else {
        sum / kept as f64
    }
}
