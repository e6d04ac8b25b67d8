//! Per-tile analysis: select the colony, run the profile's scorers, apply
//! the rejection policy.

use crate::binarize::Binarizer;
use crate::classify::{EmptyReason, TileClassifier};
use crate::components::ComponentAnalyzer;
use crate::config::{NearBackgroundRule, PhenotypeConfig, Profile, RejectionConfig};
use crate::score::{color, in_agar, morphology, opacity, MorphologyScores};
use crate::selector::{select, Candidate, DetectContext, Selection};
use crate::tile::Tile;

use super::result::{AnalysisError, RejectReason, TileOutcome, TileResult, TileStatus};

/// Collaborators shared by every tile of a plate.
#[derive(Clone, Copy)]
pub(crate) struct TileEngine<'a> {
    pub config: &'a PhenotypeConfig,
    pub binarizer: &'a dyn Binarizer,
    pub analyzer: &'a dyn ComponentAnalyzer,
}

impl TileEngine<'_> {
    pub(crate) fn analyze(&self, tile: &Tile) -> TileOutcome {
        let cfg = self.config;
        if tile.area() == 0 {
            return TileOutcome::Failed(AnalysisError::EmptyRaster);
        }
        if cfg.profile == Profile::Color && tile.color.is_none() {
            return TileOutcome::Failed(AnalysisError::MissingColorChannel);
        }
        if tile.roi.is_some_and(|roi| roi.bbox.is_degenerate()) {
            return TileOutcome::Failed(AnalysisError::DegenerateRegion);
        }
        if tile.roi.is_none() {
            if let Some(rv) = &cfg.row_variance {
                if rv.is_empty(&tile.gray) {
                    return TileOutcome::Empty(EmptyReason::LowRowVariance);
                }
            }
        }

        let classifier = TileClassifier::new(cfg.classifier);
        let ctx = DetectContext {
            binarizer: self.binarizer,
            analyzer: self.analyzer,
            classifier: &classifier,
            min_particle_area: cfg.min_particle_area,
        };
        let halo_classifier = TileClassifier::new(cfg.in_agar.halo_classifier);

        let selection: Selection = if cfg.profile == Profile::InAgar {
            let halo_ctx = DetectContext {
                classifier: &halo_classifier,
                ..ctx
            };
            select(
                tile,
                &cfg.in_agar.halo_selector(cfg.selector.gates),
                &halo_ctx,
            )
        } else {
            select(tile, &cfg.selector, &ctx)
        };
        let Some(candidate) = selection.candidate else {
            let reason = selection.empty_reason();
            tracing::debug!(row = tile.row, col = tile.col, %reason, "empty tile");
            return TileOutcome::Empty(reason);
        };

        let result = match self.measure(tile, &candidate, &ctx) {
            Ok(r) => r,
            Err(e) => return TileOutcome::Failed(e),
        };

        if let Some(reason) = rejection_reason(&result, &cfg.rejection) {
            tracing::debug!(
                row = tile.row,
                col = tile.col,
                %reason,
                colony_size = result.colony_size,
                circularity = result.circularity,
                opacity = result.opacity,
                "tile rejected"
            );
            return TileOutcome::Rejected(reason);
        }
        TileOutcome::Measured(result)
    }

    fn measure(
        &self,
        tile: &Tile,
        c: &Candidate,
        ctx: &DetectContext<'_>,
    ) -> Result<TileResult, AnalysisError> {
        let cfg = self.config;
        let mask = &c.region.mask;
        let op = opacity::score(&tile.gray, mask, c.centroid, &cfg.opacity);
        if op.error {
            return Err(AnalysisError::DegenerateRegion);
        }

        let mut result = TileResult {
            status: TileStatus::Measured,
            colony_size: c.colony_size,
            circularity: c.circularity,
            centroid: c.centroid,
            plate_centroid: [
                c.centroid[0] + tile.offset[0] as f64,
                c.centroid[1] + tile.offset[1] as f64,
            ],
            opacity: op.opacity,
            top10_opacity: op.top10,
            center_disk_opacity: op.center_disk,
            whole_tile_opacity: op.whole_tile,
            background_level: op.background,
            detector: Some(c.detector.to_string()),
            threshold: c.threshold,
            user_defined: c.user_defined,
            empty_tile: false,
            ..TileResult::empty(tile.row, tile.col)
        };

        match cfg.profile {
            Profile::Basic => {}
            Profile::Color => {
                let rgb = tile
                    .color
                    .as_ref()
                    .ok_or(AnalysisError::MissingColorChannel)?;
                let scores = color::score(rgb, mask, c.colony_size, &cfg.color);
                if scores.error {
                    return Err(AnalysisError::DegenerateRegion);
                }
                result.color = Some(scores);
            }
            Profile::Morphology => {
                result.morphology = Some(morphology::score(
                    &tile.gray,
                    mask,
                    c.centroid,
                    c.colony_size,
                    &cfg.morphology,
                ));
            }
            Profile::InAgar => {
                let m = in_agar::measure(
                    &tile.gray,
                    c,
                    &cfg.in_agar,
                    cfg.selector.gates,
                    ctx,
                    &cfg.opacity,
                );
                result.morphology = Some(match &m.colony {
                    Some(inner) => morphology::score(
                        &tile.gray,
                        &inner.region.mask,
                        inner.centroid,
                        inner.colony_size,
                        &cfg.morphology,
                    ),
                    None => MorphologyScores::default(),
                });
                result.in_agar = Some(m.scores);
            }
        }
        Ok(result)
    }
}

/// `true` when `(sno, circularity)` is indistinguishable from background.
pub fn near_background(sno: f64, circularity: f64, user_defined: bool, rule: &NearBackgroundRule) -> bool {
    (sno < rule.sno_low && circularity < rule.circularity_low)
        || (sno < rule.sno_very_low && circularity < rule.circularity_very_low)
        || (sno > -rule.sno_band && sno < rule.sno_band && !user_defined)
}

/// First matching rejection tier, if any.
pub fn rejection_reason(r: &TileResult, cfg: &RejectionConfig) -> Option<RejectReason> {
    if r.colony_size < cfg.min_colony_size {
        return Some(RejectReason::TooSmall);
    }
    if r.circularity < cfg.min_circularity {
        return Some(RejectReason::NotCircular);
    }
    if r.opacity <= 0.0 {
        return Some(RejectReason::NoOpacity);
    }
    if near_background(r.sno(), r.circularity, r.user_defined, &cfg.near_background) {
        return Some(RejectReason::NearBackground);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binarize::HistogramBinarizer;
    use crate::components::LabelingAnalyzer;
    use crate::mask::BoundingBox;
    use crate::test_utils::{color_disk_tile, disk_tile, speckle_tile};
    use crate::tile::{PredefinedRegion, RoiShape};
    use image::GrayImage;

    fn analyze(cfg: &PhenotypeConfig, tile: &Tile) -> TileOutcome {
        TileEngine {
            config: cfg,
            binarizer: &HistogramBinarizer,
            analyzer: &LabelingAnalyzer,
        }
        .analyze(tile)
    }

    fn measured(size: f64, circ: f64, opacity: f64) -> TileResult {
        TileResult {
            status: TileStatus::Measured,
            colony_size: size,
            circularity: circ,
            opacity,
            empty_tile: false,
            ..TileResult::empty(0, 0)
        }
    }

    #[test]
    fn basic_profile_measures_disk() {
        let tile = Tile::new(2, 3, disk_tile(64, 64, [32.0, 32.0], 12.0, 40, 190)).with_offset([640, 192]);
        let TileOutcome::Measured(r) = analyze(&PhenotypeConfig::basic(), &tile) else {
            panic!("expected a measurement");
        };
        assert_eq!((r.row, r.col), (2, 3));
        assert!(r.colony_size > 450.0);
        assert_eq!(r.background_level, 40.0);
        let area = crate::mask::Mask::disk(64, 64, [32.0, 32.0], 12.0).count() as f64;
        assert_eq!(r.opacity, area * 150.0);
        assert_eq!(r.plate_centroid, [672.0, 224.0]);
        assert_eq!(r.detector.as_deref(), Some("threshold"));
        assert!(r.color.is_none() && r.morphology.is_none());
    }

    #[test]
    fn noisy_empty_tile_is_empty() {
        let tile = Tile::new(0, 0, speckle_tile(64, 64, 80, 30, 220, 11));
        assert!(matches!(
            analyze(&PhenotypeConfig::basic(), &tile),
            TileOutcome::Empty(EmptyReason::TooManyParticles)
        ));
    }

    #[test]
    fn color_profile_requires_color_raster() {
        let tile = Tile::new(0, 0, disk_tile(32, 32, [16.0, 16.0], 8.0, 40, 190));
        assert_eq!(
            analyze(&PhenotypeConfig::color(), &tile),
            TileOutcome::Failed(AnalysisError::MissingColorChannel)
        );
    }

    #[test]
    fn color_profile_scores_pigment() {
        let rgb = color_disk_tile(64, 64, [32.0, 32.0], 14.0, [40, 40, 40], [250, 200, 120]);
        let tile = Tile::from_color(0, 0, rgb);
        let TileOutcome::Measured(r) = analyze(&PhenotypeConfig::color(), &tile) else {
            panic!("expected a measurement");
        };
        let color = r.color.expect("color scores");
        assert!(color.intensity_sum > 0.0);
        assert!(color.biofilm_area > 0);
    }

    #[test]
    fn morphology_profile_reports_rings() {
        let tile = Tile::new(0, 0, disk_tile(80, 80, [40.0, 40.0], 25.0, 30, 200));
        let TileOutcome::Measured(r) = analyze(&PhenotypeConfig::morphology(), &tile) else {
            panic!("expected a measurement");
        };
        let m = r.morphology.expect("morphology scores");
        assert!(m.elevation_counts.len() > 10);
    }

    #[test]
    fn in_agar_profile_reports_invasion_ring() {
        let gray = GrayImage::from_fn(80, 80, |x, y| {
            let d2 = (x as f64 - 40.0).powi(2) + (y as f64 - 40.0).powi(2);
            image::Luma([if d2 <= 100.0 {
                220
            } else if d2 <= 576.0 {
                90
            } else {
                30
            }])
        });
        let TileOutcome::Measured(r) = analyze(&PhenotypeConfig::in_agar(), &Tile::new(0, 0, gray)) else {
            panic!("expected a measurement");
        };
        let ia = r.in_agar.expect("in-agar scores");
        assert!(ia.colony_size > 0.0);
        assert!(ia.invasion_ring_size > 0.0);
        assert!(ia.invasion_ring_opacity > 0.0);
        assert!(r.morphology.is_some());
    }

    #[test]
    fn user_region_skips_detection() {
        let roi = PredefinedRegion::new(BoundingBox::new(8, 8, 16, 16), RoiShape::Rectangle);
        let tile = Tile::new(0, 0, disk_tile(32, 32, [16.0, 16.0], 7.0, 40, 190)).with_roi(roi);
        let TileOutcome::Measured(r) = analyze(&PhenotypeConfig::basic(), &tile) else {
            panic!("expected a measurement");
        };
        assert!(r.user_defined);
        assert_eq!(r.colony_size, 256.0);
        assert_eq!(r.circularity, 1.0);
        assert_eq!(r.detector.as_deref(), Some("predefined"));
    }

    #[test]
    fn degenerate_user_region_fails() {
        let roi = PredefinedRegion::new(BoundingBox::new(8, 8, 0, 16), RoiShape::Oval);
        let tile = Tile::new(0, 0, GrayImage::new(32, 32)).with_roi(roi);
        assert_eq!(
            analyze(&PhenotypeConfig::basic(), &tile),
            TileOutcome::Failed(AnalysisError::DegenerateRegion)
        );
    }

    #[test]
    fn row_variance_prefilter_empties_flat_tile() {
        let tile = Tile::new(0, 0, GrayImage::from_pixel(40, 40, image::Luma([90])));
        assert_eq!(
            analyze(&PhenotypeConfig::in_agar(), &tile),
            TileOutcome::Empty(EmptyReason::LowRowVariance)
        );
    }

    #[test]
    fn size_and_circularity_tier() {
        let cfg = RejectionConfig::default();
        assert_eq!(
            rejection_reason(&measured(49.9, 0.9, 1000.0), &cfg),
            Some(RejectReason::TooSmall)
        );
        assert_eq!(rejection_reason(&measured(50.0, 0.9, 1000.0), &cfg), None);
        assert_eq!(
            rejection_reason(&measured(200.0, 0.29, 5000.0), &cfg),
            Some(RejectReason::NotCircular)
        );
    }

    #[test]
    fn opacity_tier() {
        let cfg = RejectionConfig::default();
        assert_eq!(
            rejection_reason(&measured(200.0, 0.9, 0.0), &cfg),
            Some(RejectReason::NoOpacity)
        );
        assert_eq!(
            rejection_reason(&measured(200.0, 0.9, -10.0), &cfg),
            Some(RejectReason::NoOpacity)
        );
    }

    #[test]
    fn low_sno_and_circularity_tier() {
        let rule = NearBackgroundRule {
            sno_very_low: f64::NEG_INFINITY,
            sno_band: 0.0,
            ..NearBackgroundRule::default()
        };
        assert!(near_background(3.999, 0.249, false, &rule));
        assert!(!near_background(4.0, 0.1, false, &rule));
        assert!(!near_background(1.0, 0.25, false, &rule));
    }

    #[test]
    fn very_low_sno_tier() {
        let rule = NearBackgroundRule {
            sno_low: f64::NEG_INFINITY,
            sno_band: 0.0,
            ..NearBackgroundRule::default()
        };
        assert!(near_background(1.999, 0.199, false, &rule));
        assert!(!near_background(2.0, 0.1, false, &rule));
        assert!(!near_background(1.0, 0.2, false, &rule));
    }

    #[test]
    fn background_band_tier_spares_user_regions() {
        let rule = NearBackgroundRule {
            sno_low: f64::NEG_INFINITY,
            sno_very_low: f64::NEG_INFINITY,
            ..NearBackgroundRule::default()
        };
        assert!(near_background(0.499, 0.9, false, &rule));
        assert!(near_background(-0.499, 0.9, false, &rule));
        assert!(!near_background(0.5, 0.9, false, &rule));
        assert!(!near_background(-0.5, 0.9, false, &rule));
        assert!(!near_background(0.1, 0.9, true, &rule));
    }

    #[test]
    fn mid_sno_tile_depends_on_circularity_threshold() {
        // size 200, circularity 0.35, opacity 300: SNO 1.5.
        let r = measured(200.0, 0.35, 300.0);
        let lenient = RejectionConfig {
            min_circularity: 0.3,
            ..RejectionConfig::default()
        };
        let strict = RejectionConfig {
            min_circularity: 0.4,
            ..RejectionConfig::default()
        };
        assert_eq!(rejection_reason(&r, &lenient), None);
        assert_eq!(rejection_reason(&r, &strict), Some(RejectReason::NotCircular));
        let stricter_sno = RejectionConfig {
            near_background: NearBackgroundRule {
                circularity_very_low: 0.36,
                ..NearBackgroundRule::default()
            },
            ..lenient
        };
        assert_eq!(
            rejection_reason(&r, &stricter_sno),
            Some(RejectReason::NearBackground)
        );
    }
}
