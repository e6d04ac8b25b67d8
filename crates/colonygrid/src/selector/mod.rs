//! Colony region selection.
//!
//! A selection runs an ordered chain of stateless [`Detector`] strategies
//! over the tile's grayscale raster. In [`SelectionMode::Fallback`] the first
//! candidate passing the [`QualityGates`] wins; in
//! [`SelectionMode::Arbitrate`] every detector runs and [`arbitrate`] keeps
//! the largest sufficiently round candidate. A user-supplied region on the
//! tile bypasses detection entirely.

mod circle;
mod edge;
mod predefined;
mod threshold;

use image::GrayImage;

use crate::binarize::{Binarizer, ThresholdMethod};
use crate::classify::{EmptyReason, TileClassifier};
use crate::components::ComponentAnalyzer;
use crate::region::Region;
use crate::tile::Tile;

pub use circle::CircleFitDetector;
pub use edge::EdgeDetector;
pub use predefined::predefined_candidate;
pub use threshold::ThresholdDetector;

/// Shared collaborators handed to every detector.
#[derive(Clone, Copy)]
pub struct DetectContext<'a> {
    pub binarizer: &'a dyn Binarizer,
    pub analyzer: &'a dyn ComponentAnalyzer,
    pub classifier: &'a TileClassifier,
    /// Components smaller than this are dropped before classification.
    pub min_particle_area: u64,
}

/// A stateless colony detection strategy.
pub trait Detector {
    /// Stable identifier recorded in results.
    fn name(&self) -> &'static str;

    fn detect(&self, gray: &GrayImage, ctx: &DetectContext<'_>) -> Result<Candidate, EmptyReason>;
}

/// Configurable detector strategy.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetectorKind {
    /// Binarize, fill holes, label, classify, keep the largest component.
    Threshold { method: ThresholdMethod },
    /// Median filter, Laplacian zero crossings, fill holes, label.
    EdgeZeroCrossing {
        median_radius: u32,
        /// Minimum Laplacian jump across a zero crossing.
        min_step: i16,
    },
    /// Sharpen, gradient magnitude, binarize, Hough circle vote.
    CircleFit {
        method: ThresholdMethod,
        min_radius: u32,
        /// `0` means half the shorter tile side.
        max_radius: u32,
        /// Fraction of ring pixels that must be edges.
        min_vote_fraction: f64,
    },
}

impl DetectorKind {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Threshold { .. } => ThresholdDetector::NAME,
            Self::EdgeZeroCrossing { .. } => EdgeDetector::NAME,
            Self::CircleFit { .. } => CircleFitDetector::NAME,
        }
    }
}

impl Detector for DetectorKind {
    fn name(&self) -> &'static str {
        self.code()
    }

    fn detect(&self, gray: &GrayImage, ctx: &DetectContext<'_>) -> Result<Candidate, EmptyReason> {
        match *self {
            Self::Threshold { method } => ThresholdDetector { method }.detect(gray, ctx),
            Self::EdgeZeroCrossing {
                median_radius,
                min_step,
            } => EdgeDetector {
                median_radius,
                min_step,
            }
            .detect(gray, ctx),
            Self::CircleFit {
                method,
                min_radius,
                max_radius,
                min_vote_fraction,
            } => CircleFitDetector {
                method,
                min_radius,
                max_radius,
                min_vote_fraction,
            }
            .detect(gray, ctx),
        }
    }
}

/// Scored colony candidate produced by one detector.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub region: Region,
    /// Reported colony size in pixels.
    pub colony_size: f64,
    /// Measured circularity, or `1.0` when not measured (circle fit, user region).
    pub circularity: f64,
    pub centroid: [f64; 2],
    pub detector: &'static str,
    /// Binarization threshold, when the detector used one.
    pub threshold: Option<u8>,
    pub user_defined: bool,
}

impl Candidate {
    /// Candidate from a labelled component.
    ///
    /// Colony size is `area + perimeter`: stringent thresholds lose the edge
    /// pixels and the perimeter term puts them back.
    pub(crate) fn from_component(
        gray: &GrayImage,
        region: Region,
        detector: &'static str,
        threshold: Option<u8>,
    ) -> Result<Self, EmptyReason> {
        let tile_area = gray.width() as u64 * gray.height() as u64;
        if region.metrics.area == tile_area {
            return Err(EmptyReason::WholeTileRegion);
        }
        let m = region.metrics;
        Ok(Self {
            colony_size: m.area as f64 + m.perimeter,
            circularity: m.circularity,
            centroid: m.centroid,
            region,
            detector,
            threshold,
            user_defined: false,
        })
    }
}

/// Acceptance gates applied to every detector's candidate.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct QualityGates {
    pub min_colony_size: f64,
    pub min_circularity: f64,
}

impl Default for QualityGates {
    fn default() -> Self {
        Self {
            min_colony_size: 50.0,
            min_circularity: 0.3,
        }
    }
}

impl QualityGates {
    pub fn accepts(&self, c: &Candidate) -> bool {
        c.colony_size >= self.min_colony_size && c.circularity >= self.min_circularity
    }
}

/// How the detector chain is combined.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectionMode {
    /// First candidate passing the gates wins.
    Fallback,
    /// Run every detector, keep the largest candidate rounder than `min_circularity`.
    Arbitrate { min_circularity: f64 },
}

/// Detector chain + gates + combination mode.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub chain: Vec<DetectorKind>,
    pub gates: QualityGates,
    pub mode: SelectionMode,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            chain: vec![
                DetectorKind::Threshold {
                    method: ThresholdMethod::Otsu,
                },
                DetectorKind::EdgeZeroCrossing {
                    median_radius: 1,
                    min_step: 8,
                },
            ],
            gates: QualityGates::default(),
            mode: SelectionMode::Fallback,
        }
    }
}

impl SelectorConfig {
    /// Chain with a single thresholding detector.
    pub fn single(method: ThresholdMethod) -> Self {
        Self {
            chain: vec![DetectorKind::Threshold { method }],
            ..Self::default()
        }
    }

    /// Default chain plus the circle-fit fallback.
    pub fn with_circle_fit() -> Self {
        let mut cfg = Self::default();
        cfg.chain.push(DetectorKind::CircleFit {
            method: ThresholdMethod::Otsu,
            min_radius: 4,
            max_radius: 0,
            min_vote_fraction: 0.7,
        });
        cfg
    }
}

/// What happened to one detector in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Accepted,
    Rejected(EmptyReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Attempt {
    pub detector: &'static str,
    pub outcome: AttemptOutcome,
}

/// Selection result with the per-detector trail.
#[derive(Debug, Clone)]
pub struct Selection {
    pub candidate: Option<Candidate>,
    pub attempts: Vec<Attempt>,
}

impl Selection {
    /// The most informative reason the tile came out empty: the first
    /// detector's own rejection.
    pub fn empty_reason(&self) -> EmptyReason {
        self.attempts
            .iter()
            .find_map(|a| match a.outcome {
                AttemptOutcome::Rejected(r) => Some(r),
                AttemptOutcome::Accepted => None,
            })
            .unwrap_or(EmptyReason::NoParticles)
    }
}

/// Select the colony region of `tile`.
pub fn select(tile: &Tile, cfg: &SelectorConfig, ctx: &DetectContext<'_>) -> Selection {
    if let Some(roi) = tile.roi {
        let candidate = predefined_candidate(tile.width(), tile.height(), roi);
        let outcome = match candidate {
            Some(_) => AttemptOutcome::Accepted,
            None => AttemptOutcome::Rejected(EmptyReason::NoParticles),
        };
        return Selection {
            candidate,
            attempts: vec![Attempt {
                detector: predefined::NAME,
                outcome,
            }],
        };
    }

    let mut attempts = Vec::with_capacity(cfg.chain.len());
    match cfg.mode {
        SelectionMode::Fallback => {
            for det in &cfg.chain {
                let outcome = run_gated(det, &tile.gray, ctx, &cfg.gates);
                match outcome {
                    Ok(c) => {
                        attempts.push(Attempt {
                            detector: det.name(),
                            outcome: AttemptOutcome::Accepted,
                        });
                        return Selection {
                            candidate: Some(c),
                            attempts,
                        };
                    }
                    Err(reason) => attempts.push(Attempt {
                        detector: det.name(),
                        outcome: AttemptOutcome::Rejected(reason),
                    }),
                }
            }
            Selection {
                candidate: None,
                attempts,
            }
        }
        SelectionMode::Arbitrate { min_circularity } => {
            let mut candidates = Vec::new();
            for det in &cfg.chain {
                match det.detect(&tile.gray, ctx) {
                    Ok(c) => {
                        attempts.push(Attempt {
                            detector: det.name(),
                            outcome: AttemptOutcome::Accepted,
                        });
                        candidates.push(c);
                    }
                    Err(reason) => {
                        tracing::debug!(
                            row = tile.row,
                            col = tile.col,
                            detector = det.name(),
                            %reason,
                            "detector rejected tile"
                        );
                        attempts.push(Attempt {
                            detector: det.name(),
                            outcome: AttemptOutcome::Rejected(reason),
                        });
                    }
                }
            }
            Selection {
                candidate: arbitrate(candidates, min_circularity),
                attempts,
            }
        }
    }
}

fn run_gated(
    det: &DetectorKind,
    gray: &GrayImage,
    ctx: &DetectContext<'_>,
    gates: &QualityGates,
) -> Result<Candidate, EmptyReason> {
    let c = det.detect(gray, ctx).inspect_err(|reason| {
        tracing::debug!(detector = det.name(), %reason, "detector rejected tile");
    })?;
    if !gates.accepts(&c) {
        tracing::debug!(
            detector = det.name(),
            colony_size = c.colony_size,
            circularity = c.circularity,
            "candidate failed quality gates"
        );
        return Err(EmptyReason::FailedQualityGates);
    }
    Ok(c)
}

/// Keep the candidate with the largest colony size among those whose
/// circularity exceeds `min_circularity`; the earliest wins ties.
pub fn arbitrate(candidates: Vec<Candidate>, min_circularity: f64) -> Option<Candidate> {
    candidates
        .into_iter()
        .filter(|c| c.circularity > min_circularity)
        .reduce(|best, c| if c.colony_size > best.colony_size { c } else { best })
}
