//! colonygrid — per-tile colony detection and phenotype quantification for
//! gridded plate images.
//!
//! A plate photograph is cut into one tile per grid cell. Every tile goes
//! through the same stages:
//!
//! 1. **Empty-tile classification** – binarize, label particles and decide
//!    whether the cell holds a colony at all.
//! 2. **Region selection** – a chain of detector strategies (threshold,
//!    Laplacian zero crossings, circle fit) proposes the colony region;
//!    quality gates pick the first acceptable one.
//! 3. **Scoring** – opacity always, plus color, morphology or in-agar
//!    measurements depending on the profile.
//! 4. **Rejection** – implausible measurements are zeroed.
//!
//! Plate analysis then checks for empty cells concentrated in one row or
//! column, a sign of a misplaced grid.
//!
//! # Public API
//! - [`Phenotyper`] as the entry point
//! - [`PhenotypeConfig`] and its profile presets for tuning
//! - [`Tile`], [`PlateImage`] inputs and [`PlateReport`] / [`TileResult`] outputs
//! - the [`Binarizer`], [`ComponentAnalyzer`] and [`Segmenter`] seams

mod api;
pub mod binarize;
pub mod circle_raster;
pub mod classify;
pub mod components;
mod config;
pub mod grid;
mod mask;
mod pipeline;
mod region;
pub mod score;
pub mod selector;
mod tile;

#[cfg(test)]
pub(crate) mod test_utils;

pub use api::Phenotyper;
pub use binarize::{Binarization, Binarizer, HistogramBinarizer, ThresholdMethod};
pub use classify::{ClassifierConfig, EmptyReason, RowVarianceConfig, TileClassifier};
pub use components::{ComponentAnalyzer, LabelingAnalyzer};
pub use config::{NearBackgroundRule, PhenotypeConfig, Profile, RejectionConfig};
pub use grid::{
    GridQuality, GridQualityChecker, GriddingPolicy, Segmenter, TileGeometry,
    UniformGridSegmenter,
};
pub use mask::{BoundingBox, Mask};
pub use pipeline::{
    near_background, rejection_reason, AnalysisError, PlateError, PlateOutcome, PlateReport,
    PlateResultMatrix, RejectReason, TileOutcome, TileResult, TileStatus,
};
pub use region::{Region, RegionMetrics};
pub use selector::{
    Candidate, DetectorKind, QualityGates, Selection, SelectionMode, SelectorConfig,
};
pub use tile::{PlateImage, PredefinedRegion, RoiShape, Tile};
