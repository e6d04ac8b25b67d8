//! Colonies with a substrate-embedded halo around an over-substrate body.
//!
//! The halo (combined extent) comes from a sensitive threshold over the whole
//! tile. The colony proper comes from a stricter threshold restricted to the
//! halo's bounding box. The invasion ring is what the halo adds on top of the
//! colony.

use image::GrayImage;

use crate::binarize::ThresholdMethod;
use crate::classify::ClassifierConfig;
use crate::region::Region;
use crate::score::opacity::{self, OpacityConfig};
use crate::selector::{select, Candidate, DetectContext, QualityGates, SelectorConfig};
use crate::tile::Tile;

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct InAgarConfig {
    /// Sensitive method for the halo over the whole tile.
    pub halo_method: ThresholdMethod,
    /// Strict method for the colony inside the halo's bounding box.
    pub colony_method: ThresholdMethod,
    /// Classifier for the halo pass. The halo is low contrast, so the
    /// threshold rules are relaxed by default.
    pub halo_classifier: ClassifierConfig,
}

impl Default for InAgarConfig {
    fn default() -> Self {
        Self {
            halo_method: ThresholdMethod::Huang,
            colony_method: ThresholdMethod::Otsu,
            halo_classifier: ClassifierConfig {
                min_threshold: 0,
                low_threshold: 0,
                ..ClassifierConfig::default()
            },
        }
    }
}

impl InAgarConfig {
    pub fn halo_selector(&self, gates: QualityGates) -> SelectorConfig {
        SelectorConfig {
            gates,
            ..SelectorConfig::single(self.halo_method)
        }
    }

    pub fn colony_selector(&self, gates: QualityGates) -> SelectorConfig {
        SelectorConfig {
            gates,
            ..SelectorConfig::single(self.colony_method)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct InAgarScores {
    pub halo_size: f64,
    pub halo_circularity: f64,
    pub halo_opacity: f64,
    pub colony_size: f64,
    pub colony_circularity: f64,
    pub colony_opacity: f64,
    /// Colony opacity measured against the background outside the halo.
    pub colony_opacity_halo_background: f64,
    /// `halo_opacity − colony_opacity_halo_background`.
    pub invasion_ring_opacity: f64,
    /// `halo_size − colony_size`.
    pub invasion_ring_size: f64,
}

/// In-agar measurement plus the inner colony, when one was found.
#[derive(Debug, Clone)]
pub struct InAgarMeasurement {
    pub scores: InAgarScores,
    pub colony: Option<Candidate>,
}

/// Find the colony inside `halo` and account for the invasion ring.
pub fn measure(
    gray: &GrayImage,
    halo: &Candidate,
    cfg: &InAgarConfig,
    gates: QualityGates,
    ctx: &DetectContext<'_>,
    opacity_cfg: &OpacityConfig,
) -> InAgarMeasurement {
    let halo_opacity = opacity::score(gray, &halo.region.mask, halo.centroid, opacity_cfg);
    let mut scores = InAgarScores {
        halo_size: halo.colony_size,
        halo_circularity: halo.circularity,
        halo_opacity: halo_opacity.opacity,
        ..InAgarScores::default()
    };

    let colony = inner_colony(gray, halo, cfg, gates, ctx);
    if let Some(c) = &colony {
        let own = opacity::score(gray, &c.region.mask, c.centroid, opacity_cfg);
        let against_halo = opacity::opacity_against(
            gray,
            &c.region.mask,
            halo_opacity.background,
            opacity_cfg.allow_negative,
        );
        scores.colony_size = c.colony_size;
        scores.colony_circularity = c.circularity;
        scores.colony_opacity = own.opacity;
        scores.colony_opacity_halo_background = against_halo;
    }
    scores.invasion_ring_opacity = scores.halo_opacity - scores.colony_opacity_halo_background;
    scores.invasion_ring_size = scores.halo_size - scores.colony_size;

    InAgarMeasurement { scores, colony }
}

fn inner_colony(
    gray: &GrayImage,
    halo: &Candidate,
    cfg: &InAgarConfig,
    gates: QualityGates,
    ctx: &DetectContext<'_>,
) -> Option<Candidate> {
    let bbox = halo.region.metrics.bbox;
    let crop = image::imageops::crop_imm(gray, bbox.x, bbox.y, bbox.width, bbox.height).to_image();
    let selection = select(&Tile::new(0, 0, crop), &cfg.colony_selector(gates), ctx);
    let Some(inner) = selection.candidate else {
        tracing::debug!(reason = %selection.empty_reason(), "no colony inside halo");
        return None;
    };

    let mask = inner
        .region
        .mask
        .translated(gray.width(), gray.height(), [bbox.x, bbox.y]);
    let region = Region::from_mask(mask)?;
    let m = region.metrics;
    Some(Candidate {
        colony_size: m.area as f64 + m.perimeter,
        circularity: m.circularity,
        centroid: m.centroid,
        region,
        ..inner
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binarize::HistogramBinarizer;
    use crate::classify::TileClassifier;
    use crate::components::LabelingAnalyzer;
    use crate::mask::Mask;
    use approx::assert_relative_eq;
    use image::Luma;

    fn halo_tile() -> GrayImage {
        GrayImage::from_fn(80, 80, |x, y| {
            let dx = x as f64 - 40.0;
            let dy = y as f64 - 40.0;
            let d2 = dx * dx + dy * dy;
            Luma([if d2 <= 100.0 {
                220
            } else if d2 <= 576.0 {
                90
            } else {
                30
            }])
        })
    }

    #[test]
    fn splits_halo_and_colony() {
        let gray = halo_tile();
        let cfg = InAgarConfig::default();
        let halo_classifier = TileClassifier::new(cfg.halo_classifier);
        let classifier = TileClassifier::default();
        let base = DetectContext {
            binarizer: &HistogramBinarizer,
            analyzer: &LabelingAnalyzer,
            classifier: &halo_classifier,
            min_particle_area: 1,
        };
        let gates = QualityGates::default();

        let halo = select(&Tile::new(0, 0, gray.clone()), &cfg.halo_selector(gates), &base)
            .candidate
            .expect("halo");
        let halo_area = Mask::disk(80, 80, [40.0, 40.0], 24.0).count();
        assert_eq!(halo.region.metrics.area, halo_area);

        let ctx = DetectContext {
            classifier: &classifier,
            ..base
        };
        let m = measure(&gray, &halo, &cfg, gates, &ctx, &OpacityConfig::default());
        let colony = m.colony.expect("inner colony");
        let colony_area = Mask::disk(80, 80, [40.0, 40.0], 10.0).count();
        assert_eq!(colony.region.metrics.area, colony_area);
        assert_relative_eq!(colony.centroid[0], 40.0, epsilon = 1e-9);

        let ring = (halo_area - colony_area) as f64;
        assert_relative_eq!(m.scores.invasion_ring_opacity, ring * 60.0);
        assert_relative_eq!(
            m.scores.invasion_ring_size,
            halo.colony_size - colony.colony_size
        );
        assert_relative_eq!(m.scores.colony_opacity_halo_background, colony_area as f64 * 190.0);
    }
}
