//! Candidate colony regions and their shape metrics.

use std::f64::consts::{PI, SQRT_2};

use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use nalgebra::Matrix2;

use crate::mask::{BoundingBox, Mask};

/// Second moment of a unit pixel about its own center.
const PIXEL_VARIANCE: f64 = 1.0 / 12.0;

/// Shape metrics of one connected component.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct RegionMetrics {
    /// Pixel count.
    pub area: u64,
    /// Outer-border chain length (orthogonal steps 1, diagonal steps √2).
    pub perimeter: f64,
    /// `4π·area / perimeter²`, capped at 1.
    pub circularity: f64,
    /// Major/minor axis ratio of the second-moment ellipse (>= 1).
    pub aspect_ratio: f64,
    /// Tight pixel bounds.
    pub bbox: BoundingBox,
    /// Mean pixel position `[x, y]`.
    pub centroid: [f64; 2],
}

impl RegionMetrics {
    /// Measure a component given as a list of foreground pixel coordinates.
    ///
    /// Returns `None` for an empty pixel list.
    pub fn measure(pixels: &[(u32, u32)]) -> Option<Self> {
        let first = pixels.first()?;
        let n = pixels.len() as f64;

        let mut min_x = first.0;
        let mut min_y = first.1;
        let mut max_x = first.0;
        let mut max_y = first.1;
        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        for &(x, y) in pixels {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
            sum_x += x as f64;
            sum_y += y as f64;
        }
        let cx = sum_x / n;
        let cy = sum_y / n;

        let mut sxx = 0.0;
        let mut syy = 0.0;
        let mut sxy = 0.0;
        for &(x, y) in pixels {
            let dx = x as f64 - cx;
            let dy = y as f64 - cy;
            sxx += dx * dx;
            syy += dy * dy;
            sxy += dx * dy;
        }
        let cov = Matrix2::new(
            sxx / n + PIXEL_VARIANCE,
            sxy / n,
            sxy / n,
            syy / n + PIXEL_VARIANCE,
        );
        let eig = cov.symmetric_eigenvalues();
        let major = eig[0].max(eig[1]);
        let minor = eig[0].min(eig[1]).max(f64::EPSILON);
        let aspect_ratio = (major / minor).sqrt();

        let bbox = BoundingBox::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1);
        let perimeter = outer_perimeter(pixels, bbox);
        let area = pixels.len() as u64;

        Some(Self {
            area,
            perimeter,
            circularity: circularity(area as f64, perimeter),
            aspect_ratio,
            bbox,
            centroid: [cx, cy],
        })
    }

    /// Measure every foreground pixel of `mask` as one region.
    pub fn from_mask(mask: &Mask) -> Option<Self> {
        let pixels: Vec<(u32, u32)> = mask.iter_foreground().collect();
        Self::measure(&pixels)
    }
}

/// `4π·area / perimeter²`, capped at 1; zero when the perimeter vanishes.
pub fn circularity(area: f64, perimeter: f64) -> f64 {
    if perimeter <= 0.0 {
        return 0.0;
    }
    (4.0 * PI * area / (perimeter * perimeter)).min(1.0)
}

fn outer_perimeter(pixels: &[(u32, u32)], bbox: BoundingBox) -> f64 {
    // One pixel of padding so border following never touches the raster edge.
    let mut canvas = GrayImage::new(bbox.width + 2, bbox.height + 2);
    for &(x, y) in pixels {
        canvas.put_pixel(x - bbox.x + 1, y - bbox.y + 1, Luma([255]));
    }

    find_contours::<i32>(&canvas)
        .iter()
        .filter(|c| c.border_type == BorderType::Outer)
        .map(|c| chain_length(c.points.iter().map(|p| [p.x, p.y])))
        .fold(0.0, f64::max)
}

fn chain_length(points: impl Iterator<Item = [i32; 2]>) -> f64 {
    let points: Vec<[i32; 2]> = points.collect();
    let n = points.len();
    if n < 2 {
        return 0.0;
    }
    let mut length = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        let dx = (b[0] - a[0]).abs();
        let dy = (b[1] - a[1]).abs();
        length += match (dx, dy) {
            (0, 0) => 0.0,
            (1, 1) => SQRT_2,
            _ => ((dx * dx + dy * dy) as f64).sqrt(),
        };
    }
    length
}

/// A candidate colony: tile-sized mask plus derived metrics.
#[derive(Debug, Clone)]
pub struct Region {
    pub mask: Mask,
    pub metrics: RegionMetrics,
}

impl Region {
    /// Build a region from a mask, measuring all of its foreground as one component.
    pub fn from_mask(mask: Mask) -> Option<Self> {
        let metrics = RegionMetrics::from_mask(&mask)?;
        Some(Self { mask, metrics })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn square_metrics() {
        let mask = Mask::from_fn(20, 20, |x, y| (5..15).contains(&x) && (5..15).contains(&y));
        let m = RegionMetrics::from_mask(&mask).expect("non-empty");
        assert_eq!(m.area, 100);
        assert_eq!(m.bbox, BoundingBox::new(5, 5, 10, 10));
        assert_abs_diff_eq!(m.centroid[0], 9.5, epsilon = 1e-12);
        assert_abs_diff_eq!(m.perimeter, 36.0, epsilon = 1e-9);
        assert_abs_diff_eq!(m.aspect_ratio, 1.0, epsilon = 1e-9);
        assert!(m.circularity > 0.9);
    }

    #[test]
    fn disk_is_nearly_circular() {
        let mask = Mask::disk(60, 60, [30.0, 30.0], 20.0);
        let m = RegionMetrics::from_mask(&mask).expect("non-empty");
        assert!(m.circularity > 0.85, "circularity {}", m.circularity);
        assert!(m.aspect_ratio < 1.05);
    }

    #[test]
    fn elongated_bar_has_large_aspect_ratio() {
        let mask = Mask::from_fn(40, 10, |x, y| (2..38).contains(&x) && (4..7).contains(&y));
        let m = RegionMetrics::from_mask(&mask).expect("non-empty");
        assert!(m.aspect_ratio > 5.0);
        assert!(m.circularity < 0.4);
    }

    #[test]
    fn single_pixel_has_zero_perimeter() {
        let m = RegionMetrics::measure(&[(3, 4)]).expect("one pixel");
        assert_eq!(m.area, 1);
        assert_eq!(m.perimeter, 0.0);
        assert_eq!(m.circularity, 0.0);
        assert!(RegionMetrics::measure(&[]).is_none());
    }
}
