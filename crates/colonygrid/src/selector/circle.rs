use image::{GrayImage, Luma};
use imageproc::filter::sharpen3x3;
use imageproc::gradients::sobel_gradients;

use super::{Candidate, DetectContext, Detector};
use crate::binarize::ThresholdMethod;
use crate::circle_raster::unique_ring_offsets;
use crate::classify::EmptyReason;
use crate::mask::Mask;
use crate::region::Region;

/// Last-resort strategy: fit the best circle to the tile's edge map.
///
/// The tile is sharpened, its Sobel gradient magnitude binarized into an
/// edge map, and every edge pixel votes for the centers of all circles
/// passing through it. The best circle is the `(center, radius)` whose ring
/// is covered by edges over the largest fraction of its pixels. Its filled
/// disk is reported as the colony; circularity is not measured.
#[derive(Debug, Clone, Copy)]
pub struct CircleFitDetector {
    pub method: ThresholdMethod,
    pub min_radius: u32,
    pub max_radius: u32,
    pub min_vote_fraction: f64,
}

/// Best circle found by [`CircleFitDetector::fit`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleFit {
    pub center: [i32; 2],
    pub radius: u32,
    /// Share of ring pixels that landed on edges.
    pub vote_fraction: f64,
}

impl CircleFitDetector {
    pub const NAME: &'static str = "circle_fit";

    /// Binary edge map of the sharpened tile.
    pub fn edge_map(&self, gray: &GrayImage, ctx: &DetectContext<'_>) -> Option<Mask> {
        let grad = sobel_gradients(&sharpen3x3(gray));
        let max = grad.pixels().map(|p| p[0]).max().unwrap_or(0);
        if max == 0 {
            return None;
        }
        let scaled = GrayImage::from_fn(grad.width(), grad.height(), |x, y| {
            let v = grad.get_pixel(x, y)[0] as u32 * 255 / max as u32;
            Luma([v as u8])
        });
        // Edges are the bright side of the gradient image already; no
        // inversion is needed with foreground defined as `pixel > threshold`.
        ctx.binarizer
            .binarize(&scaled, self.method)
            .map(|b| b.mask)
            .filter(|m| !m.is_empty())
    }

    /// Hough vote over every radius in `[min_radius, max_radius]`.
    pub fn fit(&self, edges: &Mask) -> Option<CircleFit> {
        let (w, h) = edges.dimensions();
        let max_radius = if self.max_radius == 0 {
            w.min(h) / 2
        } else {
            self.max_radius
        };
        let min_radius = self.min_radius.max(1);
        if min_radius > max_radius {
            return None;
        }

        let points: Vec<[i32; 2]> = edges
            .iter_foreground()
            .map(|(x, y)| [x as i32, y as i32])
            .collect();
        let mut acc = vec![0u32; w as usize * h as usize];
        let mut best: Option<CircleFit> = None;

        for radius in min_radius..=max_radius {
            let offsets = unique_ring_offsets(radius);
            acc.fill(0);
            for p in &points {
                for o in &offsets {
                    let cx = p[0] - o[0];
                    let cy = p[1] - o[1];
                    if cx >= 0 && cy >= 0 && (cx as u32) < w && (cy as u32) < h {
                        acc[cy as usize * w as usize + cx as usize] += 1;
                    }
                }
            }

            let mut top = 0u32;
            let mut top_idx = 0usize;
            for (i, &v) in acc.iter().enumerate() {
                if v > top {
                    top = v;
                    top_idx = i;
                }
            }
            if top == 0 {
                continue;
            }
            let fraction = top as f64 / offsets.len() as f64;
            if best.map_or(true, |b| fraction > b.vote_fraction) {
                best = Some(CircleFit {
                    center: [(top_idx % w as usize) as i32, (top_idx / w as usize) as i32],
                    radius,
                    vote_fraction: fraction,
                });
            }
        }
        best
    }
}

impl Detector for CircleFitDetector {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn detect(&self, gray: &GrayImage, ctx: &DetectContext<'_>) -> Result<Candidate, EmptyReason> {
        let edges = self.edge_map(gray, ctx).ok_or(EmptyReason::NoCircleFit)?;
        let fit = self.fit(&edges).ok_or(EmptyReason::NoCircleFit)?;
        if fit.vote_fraction < self.min_vote_fraction {
            return Err(EmptyReason::NoCircleFit);
        }

        let center = [fit.center[0] as f64, fit.center[1] as f64];
        let disk = Mask::disk(gray.width(), gray.height(), center, fit.radius as f64);
        let region = Region::from_mask(disk).ok_or(EmptyReason::NoCircleFit)?;
        Ok(Candidate {
            colony_size: region.metrics.area as f64,
            circularity: 1.0,
            centroid: center,
            region,
            detector: Self::NAME,
            threshold: None,
            user_defined: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binarize::HistogramBinarizer;
    use crate::classify::TileClassifier;
    use crate::components::LabelingAnalyzer;
    use crate::test_utils::disk_tile;

    fn detector() -> CircleFitDetector {
        CircleFitDetector {
            method: ThresholdMethod::Otsu,
            min_radius: 4,
            max_radius: 0,
            min_vote_fraction: 0.7,
        }
    }

    #[test]
    fn recovers_disk_center_and_radius() {
        let gray = disk_tile(64, 64, [30.0, 34.0], 14.0, 40, 200);
        let classifier = TileClassifier::default();
        let ctx = DetectContext {
            binarizer: &HistogramBinarizer,
            analyzer: &LabelingAnalyzer,
            classifier: &classifier,
            min_particle_area: 1,
        };
        let c = detector().detect(&gray, &ctx).expect("circle");
        assert!((c.centroid[0] - 30.0).abs() <= 1.5, "cx {}", c.centroid[0]);
        assert!((c.centroid[1] - 34.0).abs() <= 1.5, "cy {}", c.centroid[1]);
        assert_eq!(c.circularity, 1.0);
        let disk = Mask::disk(64, 64, [30.0, 34.0], 14.0).count() as f64;
        assert!((c.colony_size - disk).abs() / disk < 0.3);
        assert_eq!(c.colony_size, c.region.metrics.area as f64);
    }

    #[test]
    fn ring_of_edges_votes_for_its_center() {
        let edges = Mask::from_fn(50, 50, |x, y| {
            let dx = x as f64 - 25.0;
            let dy = y as f64 - 25.0;
            let d = (dx * dx + dy * dy).sqrt();
            (d - 10.0).abs() <= 1.0
        });
        let fit = detector().fit(&edges).expect("fit");
        assert_eq!(fit.center, [25, 25]);
        assert!((9..=11).contains(&fit.radius), "radius {}", fit.radius);
        assert!(fit.vote_fraction > 0.95);
    }

    #[test]
    fn flat_tile_has_no_circle() {
        let gray = GrayImage::from_pixel(32, 32, Luma([100]));
        let classifier = TileClassifier::default();
        let ctx = DetectContext {
            binarizer: &HistogramBinarizer,
            analyzer: &LabelingAnalyzer,
            classifier: &classifier,
            min_particle_area: 1,
        };
        assert_eq!(
            detector().detect(&gray, &ctx).expect_err("flat"),
            EmptyReason::NoCircleFit
        );
    }
}
