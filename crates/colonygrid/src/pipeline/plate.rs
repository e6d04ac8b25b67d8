//! Plate orchestration: run every tile, assemble the matrix, check the grid.

use std::panic::{catch_unwind, AssertUnwindSafe};

use image::RgbImage;
use rayon::prelude::*;

use crate::grid::{diagnostic, GridQualityChecker, GriddingPolicy, TileGeometry};
use crate::mask::BoundingBox;
use crate::tile::{PlateImage, Tile};

use super::result::{
    AnalysisError, PlateError, PlateOutcome, PlateReport, PlateResultMatrix, TileOutcome,
    TileResult,
};
use super::tile::TileEngine;

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Analyze one tile, turning a panic into a failed outcome.
pub(crate) fn run_isolated(engine: &TileEngine<'_>, tile: &Tile) -> TileOutcome {
    match catch_unwind(AssertUnwindSafe(|| engine.analyze(tile))) {
        Ok(outcome) => outcome,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::warn!(row = tile.row, col = tile.col, %message, "tile analysis panicked");
            TileOutcome::Failed(AnalysisError::Panicked { message })
        }
    }
}

/// Tile-to-plate geometry, from each tile's offset and size.
pub(crate) fn tile_geometry(tiles: &[Tile]) -> Vec<TileGeometry> {
    tiles
        .iter()
        .map(|t| TileGeometry {
            row: t.row,
            col: t.col,
            rect: BoundingBox::new(t.offset[0], t.offset[1], t.width(), t.height()),
        })
        .collect()
}

pub(crate) fn validate_tiles(tiles: &[Tile], rows: usize, cols: usize) -> Result<(), PlateError> {
    if rows == 0 || cols == 0 {
        return Err(PlateError::EmptyGrid);
    }
    if tiles.len() != rows * cols {
        return Err(PlateError::TileCountMismatch {
            expected: rows * cols,
            found: tiles.len(),
        });
    }
    let mut seen = vec![false; rows * cols];
    for t in tiles {
        if t.row >= rows || t.col >= cols {
            return Err(PlateError::TileOutOfGrid {
                row: t.row,
                col: t.col,
            });
        }
        // Every cell is written exactly once; with the count check this
        // also means no cell is left unset.
        let slot = &mut seen[t.row * cols + t.col];
        if *slot {
            return Err(PlateError::DuplicateCell {
                row: t.row,
                col: t.col,
            });
        }
        *slot = true;
    }
    Ok(())
}

/// Analyze a validated set of tiles and assemble the plate report.
///
/// Each tile is consumed by its own analysis, so its rasters are released
/// as soon as the tile is done. `plate` is the canvas for the diagnostic;
/// without one a schematic of the grid is drawn.
pub(crate) fn run_plate(
    engine: &TileEngine<'_>,
    tiles: Vec<Tile>,
    rows: usize,
    cols: usize,
    plate: Option<&PlateImage>,
) -> Result<PlateReport, PlateError> {
    validate_tiles(&tiles, rows, cols)?;
    let geometry = tile_geometry(&tiles);
    let cfg = engine.config;

    let analyze = |tile: Tile| -> TileResult {
        let outcome = run_isolated(engine, &tile);
        outcome.into_result(tile.row, tile.col)
    };
    let results: Vec<TileResult> = if cfg.parallel {
        tiles.into_par_iter().map(analyze).collect()
    } else {
        tiles.into_iter().map(analyze).collect()
    };

    let mut matrix = PlateResultMatrix::new(rows, cols);
    for r in results {
        matrix.set(r)?;
    }

    let quality = GridQualityChecker.check(&matrix);
    let failed = matrix.cells.iter().filter(|c| c.error_occurred).count();
    tracing::info!(
        rows,
        cols,
        profile = %cfg.profile,
        measured = matrix.measured_count(),
        failed,
        flagged_rows = quality.flagged_rows.len(),
        flagged_cols = quality.flagged_cols.len(),
        "plate analyzed"
    );

    let diagnostic = (!quality.is_valid() || cfg.render_diagnostic).then(|| {
        let mut canvas: RgbImage = match plate {
            Some(p) => diagnostic::plate_canvas(p),
            None => diagnostic::schematic_canvas(&geometry),
        };
        diagnostic::annotate(&mut canvas, &geometry, &matrix, &quality);
        canvas
    });

    let outcome = if quality.is_valid() {
        PlateOutcome::Completed(matrix)
    } else {
        match cfg.gridding_policy {
            GriddingPolicy::Abort => {
                tracing::warn!(
                    flagged_rows = ?quality.flagged_rows,
                    flagged_cols = ?quality.flagged_cols,
                    "gridding failed; plate data dropped"
                );
                PlateOutcome::Aborted
            }
            GriddingPolicy::WarnAndContinue => {
                tracing::warn!(
                    flagged_rows = ?quality.flagged_rows,
                    flagged_cols = ?quality.flagged_cols,
                    "gridding looks wrong; keeping plate data"
                );
                PlateOutcome::Completed(matrix)
            }
        }
    };

    Ok(PlateReport {
        outcome,
        quality,
        diagnostic,
    })
}
