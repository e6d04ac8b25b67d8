//! Empty-vs-colony decision for one binarized tile.
//!
//! The classifier accumulates a penalty over soft signals (noisy particle
//! count, low binarization threshold, mildly elongated largest component) and
//! applies hard rules that short-circuit to "empty". Rule order matters and
//! is fixed:
//!
//! 1. particle count
//! 2. binarization threshold
//! 3. shape of the largest component (aspect ratio, circularity, whole-tile artifact)
//! 4. a single clean component is always a colony
//! 5. accumulated penalty
//! 6. components anchored at the tile origin

use image::GrayImage;

use crate::components::largest;
use crate::region::Region;

/// Why a tile was reported as holding no colony.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    NoParticles,
    TooManyParticles,
    ThresholdTooLow,
    Elongated,
    IrregularShape,
    /// Single spurious component covering the tile at the analyzer's
    /// characteristic circularity.
    WholeTileArtifact,
    PenaltyExceeded,
    OriginArtifact,
    LowRowVariance,
    /// The selected component covers every pixel of the tile.
    WholeTileRegion,
    NoThreshold,
    NoCircleFit,
    FailedQualityGates,
}

impl EmptyReason {
    pub const fn code(self) -> &'static str {
        match self {
            Self::NoParticles => "no_particles",
            Self::TooManyParticles => "too_many_particles",
            Self::ThresholdTooLow => "threshold_too_low",
            Self::Elongated => "elongated",
            Self::IrregularShape => "irregular_shape",
            Self::WholeTileArtifact => "whole_tile_artifact",
            Self::PenaltyExceeded => "penalty_exceeded",
            Self::OriginArtifact => "origin_artifact",
            Self::LowRowVariance => "low_row_variance",
            Self::WholeTileRegion => "whole_tile_region",
            Self::NoThreshold => "no_threshold",
            Self::NoCircleFit => "no_circle_fit",
            Self::FailedQualityGates => "failed_quality_gates",
        }
    }
}

impl std::fmt::Display for EmptyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Thresholds for [`TileClassifier`].
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// More particles than this → empty.
    pub max_particles: usize,
    /// More particles than this (up to `max_particles`) → penalty.
    pub noisy_particles: usize,
    /// Binarization threshold below this → empty.
    pub min_threshold: u8,
    /// Binarization threshold below this (and >= `min_threshold`) → penalty.
    pub low_threshold: u8,
    /// Largest component aspect ratio above this → empty (contamination).
    pub max_aspect_ratio: f64,
    /// Aspect ratio above this (up to `max_aspect_ratio`) → penalty.
    pub elongated_aspect_ratio: f64,
    /// Largest component circularity below this → empty.
    ///
    /// Some profiles use 0.30.
    pub min_circularity: f64,
    /// Open circularity interval of the whole-tile analyzer artifact.
    pub whole_tile_circularity: [f64; 2],
    /// Penalty above this → empty.
    pub max_penalty: u32,
    /// Components touching the tile origin need circularity above this.
    pub origin_min_circularity: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            max_particles: 40,
            noisy_particles: 15,
            min_threshold: 100,
            low_threshold: 120,
            max_aspect_ratio: 2.0,
            elongated_aspect_ratio: 1.2,
            min_circularity: 0.20,
            whole_tile_circularity: [0.790, 0.792],
            max_penalty: 1,
            origin_min_circularity: 0.5,
        }
    }
}

/// Classifier verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Colony { penalty: u32 },
    Empty(EmptyReason),
}

impl Classification {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty(_))
    }
}

/// Heuristic empty-tile classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct TileClassifier {
    pub config: ClassifierConfig,
}

impl TileClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Classify a tile from its binarized components and the threshold used.
    pub fn classify(&self, gray: &GrayImage, components: &[Region], threshold: u8) -> Classification {
        let cfg = &self.config;
        let mut penalty = 0u32;

        let count = components.len();
        if count == 0 {
            return Classification::Empty(EmptyReason::NoParticles);
        }
        if count > cfg.max_particles {
            return Classification::Empty(EmptyReason::TooManyParticles);
        }
        if count > cfg.noisy_particles {
            penalty += 1;
        }

        if threshold < cfg.min_threshold {
            return Classification::Empty(EmptyReason::ThresholdTooLow);
        }
        if threshold < cfg.low_threshold {
            penalty += 1;
        }

        let Some(big) = largest(components) else {
            return Classification::Empty(EmptyReason::NoParticles);
        };
        let m = &big.metrics;
        if m.aspect_ratio > cfg.max_aspect_ratio {
            return Classification::Empty(EmptyReason::Elongated);
        }
        if m.aspect_ratio > cfg.elongated_aspect_ratio {
            penalty += 1;
        }
        if m.circularity < cfg.min_circularity {
            return Classification::Empty(EmptyReason::IrregularShape);
        }
        let [lo, hi] = cfg.whole_tile_circularity;
        let tile_area = gray.width() as u64 * gray.height() as u64;
        if m.circularity > lo && m.circularity < hi && m.area == tile_area {
            return Classification::Empty(EmptyReason::WholeTileArtifact);
        }

        if count == 1 {
            return Classification::Colony { penalty };
        }

        if penalty > cfg.max_penalty {
            return Classification::Empty(EmptyReason::PenaltyExceeded);
        }

        if m.bbox.touches_origin() && m.circularity <= cfg.origin_min_circularity {
            return Classification::Empty(EmptyReason::OriginArtifact);
        }

        Classification::Colony { penalty }
    }
}

/// Lightweight pre-filter on the variance of per-row intensity sums.
///
/// Used where particle heuristics are unreliable (hazy or biofilm growth).
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RowVarianceConfig {
    /// Tiles whose row-sum variance falls below this are empty.
    pub min_variance: f64,
}

impl RowVarianceConfig {
    /// Calibrated for diffuse, low-contrast colonies.
    pub const HAZY_COLONY: Self = Self {
        min_variance: 1.0e4,
    };
    /// Calibrated for pigmented biofilm colonies.
    pub const BIOFILM: Self = Self {
        min_variance: 2.5e4,
    };

    pub fn is_empty(&self, gray: &GrayImage) -> bool {
        row_sum_variance(gray) < self.min_variance
    }
}

/// Population variance of the per-row intensity sums.
pub fn row_sum_variance(gray: &GrayImage) -> f64 {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return 0.0;
    }
    let sums: Vec<f64> = gray
        .as_raw()
        .chunks_exact(w as usize)
        .map(|row| row.iter().map(|&v| v as u64).sum::<u64>() as f64)
        .collect();
    let n = sums.len() as f64;
    let mean = sums.iter().sum::<f64>() / n;
    sums.iter().map(|s| (s - mean) * (s - mean)).sum::<f64>() / n
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::{BoundingBox, Mask};
    use crate::region::RegionMetrics;
    use crate::test_utils::{add_noise, disk_tile};

    fn region(area: u64, circularity: f64, aspect_ratio: f64, bbox: BoundingBox) -> Region {
        Region {
            mask: Mask::new(1, 1),
            metrics: RegionMetrics {
                area,
                perimeter: 0.0,
                circularity,
                aspect_ratio,
                bbox,
                centroid: bbox.center(),
            },
        }
    }

    fn inner(area: u64, circularity: f64, aspect_ratio: f64) -> Region {
        region(area, circularity, aspect_ratio, BoundingBox::new(10, 10, 20, 20))
    }

    fn tile() -> GrayImage {
        GrayImage::new(64, 64)
    }

    fn classify(components: &[Region], threshold: u8) -> Classification {
        TileClassifier::default().classify(&tile(), components, threshold)
    }

    #[test]
    fn single_clean_component_is_colony() {
        let c = classify(&[inner(300, 0.85, 1.1)], 150);
        assert_eq!(c, Classification::Colony { penalty: 0 });
    }

    #[test]
    fn many_particles_with_elongated_largest_is_empty() {
        let mut comps = vec![inner(500, 0.3, 3.5)];
        comps.extend((0..49).map(|_| inner(4, 0.9, 1.0)));
        let c = classify(&comps, 150);
        assert!(c.is_empty());
        assert_eq!(c, Classification::Empty(EmptyReason::TooManyParticles));
    }

    #[test]
    fn particle_count_boundaries() {
        let forty: Vec<Region> = (0..40).map(|_| inner(20, 0.9, 1.0)).collect();
        assert!(!classify(&forty, 150).is_empty());
        let mut many = forty.clone();
        many.push(inner(20, 0.9, 1.0));
        assert_eq!(
            classify(&many, 150),
            Classification::Empty(EmptyReason::TooManyParticles)
        );
        // 16 particles and a low threshold: two penalties.
        let noisy: Vec<Region> = (0..16).map(|_| inner(20, 0.9, 1.0)).collect();
        assert_eq!(
            classify(&noisy, 110),
            Classification::Empty(EmptyReason::PenaltyExceeded)
        );
        assert_eq!(classify(&noisy, 120), Classification::Colony { penalty: 1 });
    }

    #[test]
    fn threshold_rules() {
        let one = [inner(300, 0.85, 1.0)];
        assert_eq!(
            classify(&one, 99),
            Classification::Empty(EmptyReason::ThresholdTooLow)
        );
        assert_eq!(classify(&one, 100), Classification::Colony { penalty: 1 });
    }

    #[test]
    fn shape_rules_on_largest() {
        assert_eq!(
            classify(&[inner(300, 0.8, 2.01)], 150),
            Classification::Empty(EmptyReason::Elongated)
        );
        assert_eq!(
            classify(&[inner(300, 0.19, 1.0)], 150),
            Classification::Empty(EmptyReason::IrregularShape)
        );
        // Mild elongation alone passes through the single-component shortcut.
        assert_eq!(
            classify(&[inner(300, 0.8, 1.5)], 150),
            Classification::Colony { penalty: 1 }
        );
    }

    #[test]
    fn whole_tile_artifact_requires_exact_area_and_window() {
        let whole = BoundingBox::new(0, 0, 64, 64);
        assert_eq!(
            classify(&[region(64 * 64, 0.791, 1.0, whole)], 150),
            Classification::Empty(EmptyReason::WholeTileArtifact)
        );
        assert!(!classify(&[region(64 * 64, 0.792, 1.0, whole)], 150).is_empty());
        assert!(!classify(&[region(64 * 64 - 1, 0.791, 1.0, whole)], 150).is_empty());
    }

    #[test]
    fn origin_anchored_components_need_round_shape() {
        let at_origin = |c| region(200, c, 1.0, BoundingBox::new(0, 0, 16, 16));
        let speck = inner(5, 0.9, 1.0);
        assert_eq!(
            classify(&[at_origin(0.5), speck.clone()], 150),
            Classification::Empty(EmptyReason::OriginArtifact)
        );
        assert!(!classify(&[at_origin(0.51), speck.clone()], 150).is_empty());
        // A lone component skips the origin rule.
        assert!(!classify(&[at_origin(0.3)], 150).is_empty());
    }

    #[test]
    fn no_components_is_empty() {
        assert_eq!(
            classify(&[], 150),
            Classification::Empty(EmptyReason::NoParticles)
        );
    }

    #[test]
    fn row_variance_separates_colony_from_flat_noise() {
        let mut flat = GrayImage::from_pixel(80, 80, image::Luma([40]));
        add_noise(&mut flat, 4, 7);
        let colony = disk_tile(80, 80, [40.0, 40.0], 15.0, 40, 200);
        assert!(RowVarianceConfig::HAZY_COLONY.is_empty(&flat));
        assert!(RowVarianceConfig::BIOFILM.is_empty(&flat));
        assert!(!RowVarianceConfig::HAZY_COLONY.is_empty(&colony));
        assert!(!RowVarianceConfig::BIOFILM.is_empty(&colony));
        assert!(row_sum_variance(&colony) > row_sum_variance(&flat));
    }
}
