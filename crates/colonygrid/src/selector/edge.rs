use image::GrayImage;
use imageproc::filter::{laplacian_filter, median_filter};

use super::{Candidate, DetectContext, Detector};
use crate::classify::{Classification, EmptyReason};
use crate::components::take_largest;
use crate::mask::Mask;

/// Fallback strategy: Laplacian zero crossings outline the colony.
///
/// A pixel is marked when its Laplacian response is positive and a
/// 4-neighbour is negative by at least `min_step`. For a bright colony the
/// marked pixels form a closed outline just outside its border, which hole
/// filling turns into a solid region.
#[derive(Debug, Clone, Copy)]
pub struct EdgeDetector {
    pub median_radius: u32,
    pub min_step: i16,
}

impl EdgeDetector {
    pub const NAME: &'static str = "edge_zero_crossing";

    pub fn zero_crossings(&self, gray: &GrayImage) -> Mask {
        let smoothed = median_filter(gray, self.median_radius, self.median_radius);
        let lap = laplacian_filter(&smoothed);
        let (w, h) = lap.dimensions();
        let at = |x: i64, y: i64| -> Option<i32> {
            (x >= 0 && y >= 0 && x < w as i64 && y < h as i64)
                .then(|| lap.get_pixel(x as u32, y as u32)[0] as i32)
        };
        let min_step = self.min_step as i32;
        Mask::from_fn(w, h, |x, y| {
            let v = lap.get_pixel(x, y)[0] as i32;
            if v <= 0 {
                return false;
            }
            let (x, y) = (x as i64, y as i64);
            [(x - 1, y), (x + 1, y), (x, y - 1), (x, y + 1)]
                .into_iter()
                .filter_map(|(nx, ny)| at(nx, ny))
                .any(|n| n < 0 && v - n >= min_step)
        })
    }
}

impl Detector for EdgeDetector {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn detect(&self, gray: &GrayImage, ctx: &DetectContext<'_>) -> Result<Candidate, EmptyReason> {
        let edges = self.zero_crossings(gray);
        let components = ctx.analyzer.label(&edges, ctx.min_particle_area, true);

        // No binarization threshold here: only count and shape rules apply.
        if let Classification::Empty(reason) =
            ctx.classifier.classify(gray, &components, u8::MAX)
        {
            return Err(reason);
        }

        let region = take_largest(components).ok_or(EmptyReason::NoParticles)?;
        Candidate::from_component(gray, region, Self::NAME, None)
    }
}
