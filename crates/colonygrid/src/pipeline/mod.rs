//! Tile and plate analysis pipeline.

mod plate;
mod result;
mod tile;

pub(crate) use plate::{run_isolated, run_plate};
pub use result::{
    AnalysisError, PlateError, PlateOutcome, PlateReport, PlateResultMatrix, RejectReason,
    TileOutcome, TileResult, TileStatus,
};
pub(crate) use tile::TileEngine;
pub use tile::{near_background, rejection_reason};
