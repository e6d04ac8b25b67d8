use super::Candidate;
use crate::region::Region;
use crate::tile::PredefinedRegion;

pub(super) const NAME: &str = "predefined";

/// Candidate for a user-defined region.
///
/// Size is the region's pixel area, circularity is the `1.0` sentinel and the
/// centroid is the bounding-box center. `None` when the region is degenerate
/// or lies outside the tile.
pub fn predefined_candidate(width: u32, height: u32, roi: PredefinedRegion) -> Option<Candidate> {
    if roi.bbox.is_degenerate() {
        return None;
    }
    let region = Region::from_mask(roi.to_mask(width, height))?;
    Some(Candidate {
        colony_size: region.metrics.area as f64,
        circularity: 1.0,
        centroid: roi.bbox.center(),
        region,
        detector: NAME,
        threshold: None,
        user_defined: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::BoundingBox;
    use crate::tile::RoiShape;

    #[test]
    fn degenerate_or_outside_regions_yield_nothing() {
        let flat = PredefinedRegion::new(BoundingBox::new(3, 3, 0, 10), RoiShape::Oval);
        assert!(predefined_candidate(32, 32, flat).is_none());
        let outside = PredefinedRegion::new(BoundingBox::new(40, 40, 5, 5), RoiShape::Rectangle);
        assert!(predefined_candidate(32, 32, outside).is_none());
    }

    #[test]
    fn oval_size_is_its_pixel_area() {
        let roi = PredefinedRegion::new(BoundingBox::new(4, 6, 16, 12), RoiShape::Oval);
        let c = predefined_candidate(32, 32, roi).expect("inside");
        assert_eq!(c.colony_size, roi.to_mask(32, 32).count() as f64);
        assert_eq!(c.centroid, [11.5, 11.5]);
    }
}
