//! Quantifiers run on a selected colony region.
//!
//! Each scorer is a set of free functions over the tile raster and the
//! region mask, configured by its own struct. Scorers never fail: a
//! degenerate region yields all-zero scores with an `error` flag.

pub mod color;
pub mod in_agar;
pub mod morphology;
pub mod opacity;

pub use color::{ColorConfig, ColorScores};
pub use in_agar::{InAgarConfig, InAgarMeasurement, InAgarScores};
pub use morphology::{MorphologyConfig, MorphologyScores};
pub use opacity::{OpacityConfig, OpacityScores};
