//! Plate grid: segmentation into cells, plate-wide quality check and the
//! diagnostic rendering.

pub mod diagnostic;
mod quality;
mod segment;

pub use quality::{GridQuality, GridQualityChecker, GriddingPolicy};
pub use segment::{Segmenter, TileGeometry, UniformGridSegmenter};
