//! Analysis configuration and named profile presets.

use std::path::Path;

use crate::classify::{ClassifierConfig, RowVarianceConfig};
use crate::grid::GriddingPolicy;
use crate::score::{ColorConfig, InAgarConfig, MorphologyConfig, OpacityConfig};
use crate::selector::SelectorConfig;

/// Which scorers run on every tile. Opacity always runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    #[default]
    Basic,
    /// Adds the color scorer; tiles need a color raster.
    Color,
    /// Adds the ring-sampling morphology scorer.
    Morphology,
    /// Halo + colony split, morphology on the inner colony.
    InAgar,
}

impl Profile {
    pub const fn code(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Color => "color",
            Self::Morphology => "morphology",
            Self::InAgar => "in_agar",
        }
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Compound rule rejecting measurements indistinguishable from background.
///
/// With `sno = opacity / colony_size`, a tile is rejected when
/// `(sno < sno_low && circ < circularity_low)` or
/// `(sno < sno_very_low && circ < circularity_very_low)` or
/// `(-sno_band < sno < sno_band)` for detected (not user-defined) regions.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct NearBackgroundRule {
    pub sno_low: f64,
    pub circularity_low: f64,
    pub sno_very_low: f64,
    pub circularity_very_low: f64,
    pub sno_band: f64,
}

impl Default for NearBackgroundRule {
    fn default() -> Self {
        Self {
            sno_low: 4.0,
            circularity_low: 0.25,
            sno_very_low: 2.0,
            circularity_very_low: 0.2,
            sno_band: 0.5,
        }
    }
}

/// Post-hoc rejection of measured tiles.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RejectionConfig {
    pub min_colony_size: f64,
    pub min_circularity: f64,
    pub near_background: NearBackgroundRule,
}

impl Default for RejectionConfig {
    fn default() -> Self {
        Self {
            min_colony_size: 50.0,
            min_circularity: 0.3,
            near_background: NearBackgroundRule::default(),
        }
    }
}

/// Full per-plate analysis configuration.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PhenotypeConfig {
    pub profile: Profile,
    pub selector: SelectorConfig,
    pub classifier: ClassifierConfig,
    /// Optional row-variance pre-filter run before detection.
    pub row_variance: Option<RowVarianceConfig>,
    pub opacity: OpacityConfig,
    pub color: ColorConfig,
    pub morphology: MorphologyConfig,
    pub in_agar: InAgarConfig,
    pub rejection: RejectionConfig,
    pub gridding_policy: GriddingPolicy,
    /// Analyze tiles on the rayon pool.
    pub parallel: bool,
    /// Components smaller than this are ignored by the classifier.
    pub min_particle_area: u64,
    /// Render the diagnostic image even when the grid passes.
    pub render_diagnostic: bool,
}

impl Default for PhenotypeConfig {
    fn default() -> Self {
        Self {
            profile: Profile::Basic,
            selector: SelectorConfig::default(),
            classifier: ClassifierConfig::default(),
            row_variance: None,
            opacity: OpacityConfig::default(),
            color: ColorConfig::default(),
            morphology: MorphologyConfig::default(),
            in_agar: InAgarConfig::default(),
            rejection: RejectionConfig::default(),
            gridding_policy: GriddingPolicy::Abort,
            parallel: true,
            min_particle_area: 1,
            render_diagnostic: false,
        }
    }
}

impl PhenotypeConfig {
    /// Size, circularity and opacity only.
    pub fn basic() -> Self {
        Self::default()
    }

    /// Pigmentation profile; expects color plates.
    pub fn color() -> Self {
        Self {
            profile: Profile::Color,
            row_variance: Some(RowVarianceConfig::BIOFILM),
            gridding_policy: GriddingPolicy::WarnAndContinue,
            ..Self::default()
        }
    }

    /// Wrinkled-colony profile with the circle-fit fallback.
    pub fn morphology() -> Self {
        Self {
            profile: Profile::Morphology,
            selector: SelectorConfig::with_circle_fit(),
            classifier: ClassifierConfig {
                min_circularity: 0.30,
                ..ClassifierConfig::default()
            },
            rejection: RejectionConfig {
                min_circularity: 0.4,
                ..RejectionConfig::default()
            },
            ..Self::default()
        }
    }

    /// Substrate-invading colonies.
    pub fn in_agar() -> Self {
        Self {
            profile: Profile::InAgar,
            row_variance: Some(RowVarianceConfig::HAZY_COLONY),
            gridding_policy: GriddingPolicy::WarnAndContinue,
            ..Self::default()
        }
    }

    pub fn for_profile(profile: Profile) -> Self {
        match profile {
            Profile::Basic => Self::basic(),
            Profile::Color => Self::color(),
            Profile::Morphology => Self::morphology(),
            Profile::InAgar => Self::in_agar(),
        }
    }

    /// Load a configuration from JSON; missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_select_their_profile() {
        for p in [
            Profile::Basic,
            Profile::Color,
            Profile::Morphology,
            Profile::InAgar,
        ] {
            assert_eq!(PhenotypeConfig::for_profile(p).profile, p);
        }
        assert_eq!(
            PhenotypeConfig::color().row_variance,
            Some(RowVarianceConfig::BIOFILM)
        );
        assert_eq!(
            PhenotypeConfig::in_agar().row_variance,
            Some(RowVarianceConfig::HAZY_COLONY)
        );
        assert_eq!(PhenotypeConfig::morphology().selector.chain.len(), 3);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: PhenotypeConfig = serde_json::from_str(
            r#"{
                "profile": "morphology",
                "morphology": { "initial_radius": 4 },
                "selector": { "chain": [ { "kind": "threshold", "method": { "kind": "huang" } } ] },
                "rejection": { "min_circularity": 0.35 }
            }"#,
        )
        .expect("valid config");
        assert_eq!(cfg.profile, Profile::Morphology);
        assert_eq!(cfg.morphology.initial_radius, 4);
        assert_eq!(cfg.morphology.max_circle_count, 200);
        assert_eq!(cfg.selector.chain.len(), 1);
        assert_eq!(cfg.rejection.min_circularity, 0.35);
        assert_eq!(cfg.rejection.min_colony_size, 50.0);
    }

    #[test]
    fn json_round_trip_preserves_preset() {
        let cfg = PhenotypeConfig::in_agar();
        let json = serde_json::to_string(&cfg).expect("serialize");
        let back: PhenotypeConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, cfg);
    }
}
