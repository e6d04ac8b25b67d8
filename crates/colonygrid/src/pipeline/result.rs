//! Per-tile outcomes and plate-level result containers.

use image::RgbImage;

use crate::classify::EmptyReason;
use crate::grid::GridQuality;
use crate::score::{ColorScores, InAgarScores, MorphologyScores};

/// Post-hoc rejection of a measured tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    TooSmall,
    NotCircular,
    NoOpacity,
    NearBackground,
}

impl RejectReason {
    pub const fn code(self) -> &'static str {
        match self {
            Self::TooSmall => "too_small",
            Self::NotCircular => "not_circular",
            Self::NoOpacity => "no_opacity",
            Self::NearBackground => "near_background",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Unexpected failure while analyzing one tile.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisError {
    /// The color profile ran on a tile without a color raster.
    MissingColorChannel,
    /// A scorer received a zero-extent region.
    DegenerateRegion,
    /// The tile has no pixels.
    EmptyRaster,
    /// Analysis panicked; the message is kept for the log.
    Panicked { message: String },
}

impl AnalysisError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingColorChannel => "missing_color_channel",
            Self::DegenerateRegion => "degenerate_region",
            Self::EmptyRaster => "empty_raster",
            Self::Panicked { .. } => "panicked",
        }
    }
}

impl std::fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Panicked { message } => write!(f, "{}: {message}", self.code()),
            _ => f.write_str(self.code()),
        }
    }
}

impl std::error::Error for AnalysisError {}

/// Plate-level failure before any tile could be analyzed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlateError {
    EmptyGrid,
    TileCountMismatch { expected: usize, found: usize },
    TileOutOfGrid { row: usize, col: usize },
    DuplicateCell { row: usize, col: usize },
    PlateTooSmall { width: u32, height: u32, rows: usize, cols: usize },
    RoiCountMismatch { expected: usize, found: usize },
}

impl PlateError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::EmptyGrid => "empty_grid",
            Self::TileCountMismatch { .. } => "tile_count_mismatch",
            Self::TileOutOfGrid { .. } => "tile_out_of_grid",
            Self::DuplicateCell { .. } => "duplicate_cell",
            Self::PlateTooSmall { .. } => "plate_too_small",
            Self::RoiCountMismatch { .. } => "roi_count_mismatch",
        }
    }
}

impl std::fmt::Display for PlateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyGrid => f.write_str("grid must have at least one row and one column"),
            Self::TileCountMismatch { expected, found } => {
                write!(f, "{}: expected {expected} tiles, found {found}", self.code())
            }
            Self::TileOutOfGrid { row, col } => {
                write!(f, "{}: tile ({row}, {col}) lies outside the grid", self.code())
            }
            Self::DuplicateCell { row, col } => {
                write!(f, "{}: more than one tile for cell ({row}, {col})", self.code())
            }
            Self::PlateTooSmall {
                width,
                height,
                rows,
                cols,
            } => write!(
                f,
                "{}: {width}x{height} plate cannot hold a {rows}x{cols} grid",
                self.code()
            ),
            Self::RoiCountMismatch { expected, found } => {
                write!(f, "{}: expected {expected} regions, found {found}", self.code())
            }
        }
    }
}

impl std::error::Error for PlateError {}

/// Serialized status of one grid cell.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TileStatus {
    Measured,
    Empty { reason: EmptyReason },
    Rejected { reason: RejectReason },
    Failed { error: AnalysisError },
}

/// Measurements of one grid cell.
///
/// Empty, rejected and failed cells all carry the canonical empty values:
/// every numeric field zero and no scorer output.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TileResult {
    pub row: usize,
    pub col: usize,
    pub status: TileStatus,
    /// Colony size in pixels (area + perimeter for detected regions).
    pub colony_size: f64,
    pub circularity: f64,
    /// Colony centroid in tile coordinates.
    pub centroid: [f64; 2],
    /// Colony centroid in plate coordinates.
    pub plate_centroid: [f64; 2],
    pub opacity: f64,
    pub top10_opacity: f64,
    pub center_disk_opacity: f64,
    pub whole_tile_opacity: f64,
    pub background_level: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<ColorScores>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub morphology: Option<MorphologyScores>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_agar: Option<InAgarScores>,
    /// Detector that produced the region.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<u8>,
    pub user_defined: bool,
    pub empty_tile: bool,
    pub error_occurred: bool,
}

impl TileResult {
    /// The canonical empty sentinel.
    pub fn empty(row: usize, col: usize) -> Self {
        Self {
            row,
            col,
            status: TileStatus::Empty {
                reason: EmptyReason::NoParticles,
            },
            colony_size: 0.0,
            circularity: 0.0,
            centroid: [0.0, 0.0],
            plate_centroid: [0.0, 0.0],
            opacity: 0.0,
            top10_opacity: 0.0,
            center_disk_opacity: 0.0,
            whole_tile_opacity: 0.0,
            background_level: 0.0,
            color: None,
            morphology: None,
            in_agar: None,
            detector: None,
            threshold: None,
            user_defined: false,
            empty_tile: true,
            error_occurred: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.colony_size == 0.0
    }

    /// Size-normalized opacity.
    pub fn sno(&self) -> f64 {
        if self.colony_size > 0.0 {
            self.opacity / self.colony_size
        } else {
            0.0
        }
    }
}

/// Result of analyzing one tile.
#[derive(Debug, Clone, PartialEq)]
pub enum TileOutcome {
    Measured(TileResult),
    Empty(EmptyReason),
    Rejected(RejectReason),
    Failed(AnalysisError),
}

impl TileOutcome {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Measured(_) => "measured",
            Self::Empty(_) => "empty",
            Self::Rejected(_) => "rejected",
            Self::Failed(_) => "failed",
        }
    }

    /// Flatten into a cell value; anything but a measurement becomes the
    /// empty sentinel with its status recorded.
    pub fn into_result(self, row: usize, col: usize) -> TileResult {
        let mut empty = TileResult::empty(row, col);
        match self {
            Self::Measured(r) => r,
            Self::Empty(reason) => {
                empty.status = TileStatus::Empty { reason };
                empty
            }
            Self::Rejected(reason) => {
                empty.status = TileStatus::Rejected { reason };
                empty
            }
            Self::Failed(error) => {
                empty.status = TileStatus::Failed { error };
                empty.error_occurred = true;
                empty
            }
        }
    }
}

/// Row-major `rows × cols` matrix of tile results.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PlateResultMatrix {
    pub rows: usize,
    pub cols: usize,
    pub cells: Vec<TileResult>,
}

impl PlateResultMatrix {
    /// Matrix of empty sentinels.
    pub fn new(rows: usize, cols: usize) -> Self {
        let cells = (0..rows * cols)
            .map(|i| TileResult::empty(i / cols.max(1), i % cols.max(1)))
            .collect();
        Self { rows, cols, cells }
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&TileResult> {
        if row < self.rows && col < self.cols {
            self.cells.get(row * self.cols + col)
        } else {
            None
        }
    }

    /// Store `result` at its own `(row, col)`.
    pub fn set(&mut self, result: TileResult) -> Result<(), PlateError> {
        if result.row >= self.rows || result.col >= self.cols {
            return Err(PlateError::TileOutOfGrid {
                row: result.row,
                col: result.col,
            });
        }
        let idx = result.row * self.cols + result.col;
        self.cells[idx] = result;
        Ok(())
    }

    pub fn row(&self, row: usize) -> &[TileResult] {
        &self.cells[row * self.cols..(row + 1) * self.cols]
    }

    pub fn measured_count(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_empty()).count()
    }
}

/// How plate analysis ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PlateOutcome {
    Completed(PlateResultMatrix),
    /// Gridding failed under the abort policy; no data is emitted.
    Aborted,
}

/// Plate analysis report.
#[derive(Debug, Clone)]
pub struct PlateReport {
    pub outcome: PlateOutcome,
    pub quality: GridQuality,
    /// Annotated plate, rendered on gridding failure or on request.
    pub diagnostic: Option<RgbImage>,
}

impl PlateReport {
    pub fn matrix(&self) -> Option<&PlateResultMatrix> {
        match &self.outcome {
            PlateOutcome::Completed(m) => Some(m),
            PlateOutcome::Aborted => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_measured_outcomes_become_sentinels() {
        let r = TileOutcome::Rejected(RejectReason::NearBackground).into_result(1, 2);
        assert!(r.is_empty() && r.empty_tile && !r.error_occurred);
        assert_eq!(
            r.status,
            TileStatus::Rejected {
                reason: RejectReason::NearBackground
            }
        );
        let f = TileOutcome::Failed(AnalysisError::MissingColorChannel).into_result(0, 0);
        assert!(f.error_occurred);
        assert_eq!(f.colony_size, 0.0);
    }

    #[test]
    fn matrix_indexing_is_row_major() {
        let mut m = PlateResultMatrix::new(2, 3);
        assert_eq!(m.cells.len(), 6);
        assert_eq!(m.get(1, 2).map(|c| (c.row, c.col)), Some((1, 2)));
        let mut r = TileResult::empty(1, 0);
        r.colony_size = 120.0;
        m.set(r).expect("in grid");
        assert_eq!(m.row(1)[0].colony_size, 120.0);
        assert_eq!(m.measured_count(), 1);
        assert!(m.set(TileResult::empty(2, 0)).is_err());
        assert!(m.get(0, 3).is_none());
    }

    #[test]
    fn status_serializes_with_kind_tag() {
        let r = TileOutcome::Empty(EmptyReason::TooManyParticles).into_result(0, 0);
        let json = serde_json::to_value(&r).expect("serialize");
        assert_eq!(json["status"]["kind"], "empty");
        assert_eq!(json["status"]["reason"], "too_many_particles");
        assert!(json.get("color").is_none());
    }
}
