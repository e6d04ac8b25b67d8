//! Annotated plate image for reviewing gridding and detection.

use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_cross_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

use super::{GridQuality, TileGeometry};
use crate::mask::BoundingBox;
use crate::pipeline::PlateResultMatrix;
use crate::tile::PlateImage;

const CELL: Rgb<u8> = Rgb([90, 140, 255]);
const EMPTY: Rgb<u8> = Rgb([255, 210, 0]);
const FLAGGED: Rgb<u8> = Rgb([255, 0, 0]);
const CENTROID: Rgb<u8> = Rgb([0, 255, 0]);

/// RGB copy of the plate, from the color raster when there is one.
pub fn plate_canvas(plate: &PlateImage) -> RgbImage {
    match &plate.color {
        Some(c) => c.clone(),
        None => DynamicImage::ImageLuma8(plate.gray.clone()).to_rgb8(),
    }
}

/// Blank canvas just large enough for every cell.
pub fn schematic_canvas(geometry: &[TileGeometry]) -> RgbImage {
    let w = geometry.iter().map(|g| g.rect.x + g.rect.width).max().unwrap_or(1);
    let h = geometry.iter().map(|g| g.rect.y + g.rect.height).max().unwrap_or(1);
    RgbImage::from_pixel(w.max(1), h.max(1), Rgb([24, 24, 24]))
}

fn to_rect(b: BoundingBox) -> Option<Rect> {
    (!b.is_degenerate()).then(|| Rect::at(b.x as i32, b.y as i32).of_size(b.width, b.height))
}

fn union(boxes: impl Iterator<Item = BoundingBox>) -> Option<BoundingBox> {
    boxes.reduce(|a, b| {
        let x0 = a.x.min(b.x);
        let y0 = a.y.min(b.y);
        let x1 = (a.x + a.width).max(b.x + b.width);
        let y1 = (a.y + a.height).max(b.y + b.height);
        BoundingBox::new(x0, y0, x1 - x0, y1 - y0)
    })
}

fn draw_thick_outline(canvas: &mut RgbImage, b: BoundingBox, color: Rgb<u8>) {
    for inset in 0..2u32 {
        if b.width <= 2 * inset || b.height <= 2 * inset {
            break;
        }
        let inner = BoundingBox::new(
            b.x + inset,
            b.y + inset,
            b.width - 2 * inset,
            b.height - 2 * inset,
        );
        if let Some(r) = to_rect(inner) {
            draw_hollow_rect_mut(canvas, r, color);
        }
    }
}

/// Draw cell outlines, mark empty cells with a cross-out and measured
/// colonies at their centroid, and outline flagged rows and columns in red.
pub fn annotate(
    canvas: &mut RgbImage,
    geometry: &[TileGeometry],
    matrix: &PlateResultMatrix,
    quality: &GridQuality,
) {
    for g in geometry {
        let Some(rect) = to_rect(g.rect) else {
            continue;
        };
        let empty = matrix.get(g.row, g.col).map_or(true, |c| c.is_empty());
        if empty {
            draw_hollow_rect_mut(canvas, rect, EMPTY);
            let (x0, y0) = (g.rect.x as f32, g.rect.y as f32);
            let (x1, y1) = (
                (g.rect.x + g.rect.width - 1) as f32,
                (g.rect.y + g.rect.height - 1) as f32,
            );
            draw_line_segment_mut(canvas, (x0, y0), (x1, y1), EMPTY);
            draw_line_segment_mut(canvas, (x0, y1), (x1, y0), EMPTY);
        } else {
            draw_hollow_rect_mut(canvas, rect, CELL);
            if let Some(cell) = matrix.get(g.row, g.col) {
                let [cx, cy] = cell.plate_centroid;
                draw_cross_mut(canvas, CENTROID, cx.round() as i32, cy.round() as i32);
            }
        }
    }

    for &row in &quality.flagged_rows {
        if let Some(b) = union(geometry.iter().filter(|g| g.row == row).map(|g| g.rect)) {
            draw_thick_outline(canvas, b, FLAGGED);
        }
    }
    for &col in &quality.flagged_cols {
        if let Some(b) = union(geometry.iter().filter(|g| g.col == col).map(|g| g.rect)) {
            draw_thick_outline(canvas, b, FLAGGED);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridQualityChecker;
    use crate::pipeline::TileResult;

    fn geometry(rows: usize, cols: usize, size: u32) -> Vec<TileGeometry> {
        (0..rows * cols)
            .map(|i| TileGeometry {
                row: i / cols,
                col: i % cols,
                rect: BoundingBox::new((i % cols) as u32 * size, (i / cols) as u32 * size, size, size),
            })
            .collect()
    }

    #[test]
    fn flagged_row_is_outlined_in_red() {
        let geo = geometry(2, 2, 20);
        let mut m = PlateResultMatrix::new(2, 2);
        let mut r = TileResult::empty(1, 0);
        r.colony_size = 100.0;
        r.plate_centroid = [10.0, 30.0];
        m.set(r).expect("in grid");
        let mut r = TileResult::empty(1, 1);
        r.colony_size = 100.0;
        r.plate_centroid = [30.0, 30.0];
        m.set(r).expect("in grid");
        let q = GridQualityChecker.check(&m);
        assert_eq!(q.flagged_rows, vec![0]);

        let mut canvas = schematic_canvas(&geo);
        assert_eq!(canvas.dimensions(), (40, 40));
        annotate(&mut canvas, &geo, &m, &q);
        assert_eq!(*canvas.get_pixel(0, 0), FLAGGED);
        assert_eq!(*canvas.get_pixel(10, 30), CENTROID);
        assert_eq!(*canvas.get_pixel(0, 39), CELL);
    }

    #[test]
    fn gray_plate_becomes_rgb() {
        let plate = PlateImage::from_gray(image::GrayImage::from_pixel(4, 4, image::Luma([77])));
        assert_eq!(*plate_canvas(&plate).get_pixel(2, 2), Rgb([77, 77, 77]));
    }
}
