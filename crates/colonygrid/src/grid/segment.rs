use crate::mask::BoundingBox;
use crate::pipeline::PlateError;
use crate::tile::PlateImage;

/// Placement of one grid cell on the plate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TileGeometry {
    pub row: usize,
    pub col: usize,
    pub rect: BoundingBox,
}

/// Plate raster → row-major grid cell rectangles.
pub trait Segmenter: Send + Sync {
    fn grid(&self, plate: &PlateImage, rows: usize, cols: usize)
        -> Result<Vec<TileGeometry>, PlateError>;
}

/// Equal cells, then "breathing": every cell grows (positive) or shrinks
/// (negative) by `breathing` pixels on each side, clipped to the plate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UniformGridSegmenter {
    pub breathing: i32,
}

impl UniformGridSegmenter {
    pub fn new(breathing: i32) -> Self {
        Self { breathing }
    }
}

impl Segmenter for UniformGridSegmenter {
    fn grid(
        &self,
        plate: &PlateImage,
        rows: usize,
        cols: usize,
    ) -> Result<Vec<TileGeometry>, PlateError> {
        if rows == 0 || cols == 0 {
            return Err(PlateError::EmptyGrid);
        }
        let (w, h) = (plate.width() as i64, plate.height() as i64);
        let too_small = PlateError::PlateTooSmall {
            width: plate.width(),
            height: plate.height(),
            rows,
            cols,
        };
        if w < cols as i64 || h < rows as i64 {
            return Err(too_small);
        }

        let b = self.breathing as i64;
        let mut cells = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            let y0 = (row as i64 * h / rows as i64 - b).clamp(0, h);
            let y1 = ((row as i64 + 1) * h / rows as i64 + b).clamp(0, h);
            for col in 0..cols {
                let x0 = (col as i64 * w / cols as i64 - b).clamp(0, w);
                let x1 = ((col as i64 + 1) * w / cols as i64 + b).clamp(0, w);
                if x1 <= x0 || y1 <= y0 {
                    return Err(too_small);
                }
                cells.push(TileGeometry {
                    row,
                    col,
                    rect: BoundingBox::new(x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32),
                });
            }
        }
        Ok(cells)
    }
}
