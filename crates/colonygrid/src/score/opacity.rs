//! Background-subtracted integrated brightness.
//!
//! The background level is the median of the pixels outside the colony mask,
//! which tolerates uneven illumination across the tile.

use image::GrayImage;

use crate::mask::Mask;

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OpacityConfig {
    /// Keep negative per-pixel contributions (colonies darker than agar).
    pub allow_negative: bool,
    /// Diameter of the fixed disk used for the size-independent score.
    pub center_disk_diameter: f64,
    /// Share of the brightest colony pixels averaged into `top10`.
    pub top_fraction: f64,
}

impl Default for OpacityConfig {
    fn default() -> Self {
        Self {
            allow_negative: false,
            center_disk_diameter: 20.0,
            top_fraction: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct OpacityScores {
    /// Σ over colony pixels of `pixel - background` (clamped at 0 unless allowed).
    pub opacity: f64,
    /// Mean contribution of the brightest `top_fraction` of colony pixels.
    pub top10: f64,
    /// Same sum over a fixed disk at the centroid.
    pub center_disk: f64,
    /// Raw brightness sum of the entire tile.
    pub whole_tile: f64,
    /// Median of the pixels outside the colony.
    pub background: f64,
    /// Set when the region was degenerate; every score is then zero.
    pub error: bool,
}

/// Median of `gray` over the pixels where `inside` is `false`.
///
/// Even counts average the two middle values. `None` if no pixel qualifies.
pub fn background_level(gray: &GrayImage, mask: &Mask) -> Option<f64> {
    let mut hist = [0u64; 256];
    let mut n = 0u64;
    for (&v, &inside) in gray.as_raw().iter().zip(mask.as_slice()) {
        if !inside {
            hist[v as usize] += 1;
            n += 1;
        }
    }
    if n == 0 {
        return None;
    }
    let lo = nth_value(&hist, (n - 1) / 2);
    let hi = nth_value(&hist, n / 2);
    Some((lo as f64 + hi as f64) * 0.5)
}

fn nth_value(hist: &[u64; 256], rank: u64) -> u8 {
    let mut seen = 0u64;
    for (v, &c) in hist.iter().enumerate() {
        seen += c;
        if seen > rank {
            return v as u8;
        }
    }
    255
}

/// Raw brightness sum of the tile (background forced to 0).
pub fn whole_tile_opacity(gray: &GrayImage) -> f64 {
    gray.as_raw().iter().map(|&v| v as u64).sum::<u64>() as f64
}

fn contribution(value: u8, background: f64, allow_negative: bool) -> f64 {
    let d = value as f64 - background;
    if allow_negative {
        d
    } else {
        d.max(0.0)
    }
}

/// Sum of contributions over `mask` against a fixed background level.
pub fn opacity_against(gray: &GrayImage, mask: &Mask, background: f64, allow_negative: bool) -> f64 {
    gray.as_raw()
        .iter()
        .zip(mask.as_slice())
        .filter(|(_, &inside)| inside)
        .map(|(&v, _)| contribution(v, background, allow_negative))
        .sum()
}

/// Score one colony region.
pub fn score(gray: &GrayImage, mask: &Mask, centroid: [f64; 2], cfg: &OpacityConfig) -> OpacityScores {
    let degenerate = mask.bounding_box().map_or(true, |b| b.is_degenerate());
    if degenerate || mask.dimensions() != gray.dimensions() {
        return OpacityScores {
            error: true,
            ..OpacityScores::default()
        };
    }

    let background = background_level(gray, mask).unwrap_or(0.0);

    let mut contributions: Vec<f64> = gray
        .as_raw()
        .iter()
        .zip(mask.as_slice())
        .filter(|(_, &inside)| inside)
        .map(|(&v, _)| contribution(v, background, cfg.allow_negative))
        .collect();
    let opacity: f64 = contributions.iter().sum();

    contributions.sort_by(|a, b| b.total_cmp(a));
    let k = ((contributions.len() as f64 * cfg.top_fraction).ceil() as usize)
        .clamp(1, contributions.len());
    let top10 = contributions[..k].iter().sum::<f64>() / k as f64;

    let disk = Mask::disk(
        gray.width(),
        gray.height(),
        centroid,
        cfg.center_disk_diameter * 0.5,
    );
    let center_disk = opacity_against(gray, &disk, background, cfg.allow_negative);

    OpacityScores {
        opacity,
        top10,
        center_disk,
        whole_tile: whole_tile_opacity(gray),
        background,
        error: false,
    }
}
