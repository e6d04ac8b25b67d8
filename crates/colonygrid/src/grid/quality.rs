use crate::pipeline::PlateResultMatrix;

/// What to do with a plate whose grid check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GriddingPolicy {
    /// Emit the diagnostic image and drop the plate's data.
    #[default]
    Abort,
    /// Log a warning and emit the data anyway.
    WarnAndContinue,
}

/// Empty-cell statistics of a completed plate.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct GridQuality {
    pub empty_per_row: Vec<usize>,
    pub empty_per_col: Vec<usize>,
    /// Rows with more than half of their cells empty.
    pub flagged_rows: Vec<usize>,
    /// Columns with more than half of their cells empty.
    pub flagged_cols: Vec<usize>,
}

impl GridQuality {
    pub fn is_valid(&self) -> bool {
        self.flagged_rows.is_empty() && self.flagged_cols.is_empty()
    }
}

/// Detects systemic gridding failures from empty cells concentrated in a
/// row or column.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridQualityChecker;

impl GridQualityChecker {
    pub fn check(&self, matrix: &PlateResultMatrix) -> GridQuality {
        let mut empty_per_row = vec![0usize; matrix.rows];
        let mut empty_per_col = vec![0usize; matrix.cols];
        for cell in &matrix.cells {
            if cell.is_empty() && cell.row < matrix.rows && cell.col < matrix.cols {
                empty_per_row[cell.row] += 1;
                empty_per_col[cell.col] += 1;
            }
        }

        // count > n / 2, without integer division.
        let flagged_rows = (0..matrix.rows)
            .filter(|&r| empty_per_row[r] * 2 > matrix.cols)
            .collect();
        let flagged_cols = (0..matrix.cols)
            .filter(|&c| empty_per_col[c] * 2 > matrix.rows)
            .collect();

        GridQuality {
            empty_per_row,
            empty_per_col,
            flagged_rows,
            flagged_cols,
        }
    }
}
