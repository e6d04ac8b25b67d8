use image::GrayImage;

use super::{Candidate, DetectContext, Detector};
use crate::binarize::ThresholdMethod;
use crate::classify::{Classification, EmptyReason};
use crate::components::take_largest;

/// Primary strategy: global or local thresholding followed by classification.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdDetector {
    pub method: ThresholdMethod,
}

impl ThresholdDetector {
    pub const NAME: &'static str = "threshold";
}

impl Detector for ThresholdDetector {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn detect(&self, gray: &GrayImage, ctx: &DetectContext<'_>) -> Result<Candidate, EmptyReason> {
        let bin = ctx
            .binarizer
            .binarize(gray, self.method)
            .ok_or(EmptyReason::NoThreshold)?;
        let components = ctx.analyzer.label(&bin.mask, ctx.min_particle_area, true);

        if let Classification::Empty(reason) =
            ctx.classifier.classify(gray, &components, bin.threshold)
        {
            return Err(reason);
        }

        let region = take_largest(components).ok_or(EmptyReason::NoParticles)?;
        Candidate::from_component(gray, region, Self::NAME, Some(bin.threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binarize::HistogramBinarizer;
    use crate::classify::TileClassifier;
    use crate::components::{ComponentAnalyzer, LabelingAnalyzer};
    use crate::mask::Mask;
    use crate::region::Region;
    use crate::test_utils::disk_tile;

    /// Labels like the default analyzer but returns the smallest first.
    struct SmallestFirst;

    impl ComponentAnalyzer for SmallestFirst {
        fn label(&self, mask: &Mask, min_size: u64, fill_holes: bool) -> Vec<Region> {
            let mut regions = LabelingAnalyzer.label(mask, min_size, fill_holes);
            regions.reverse();
            regions
        }
    }

    fn colony_with_speck() -> GrayImage {
        let mut gray = disk_tile(64, 64, [40.0, 40.0], 10.0, 30, 220);
        for (x, y, p) in disk_tile(64, 64, [12.0, 12.0], 3.0, 0, 220).enumerate_pixels() {
            if p[0] > 0 {
                gray.put_pixel(x, y, *p);
            }
        }
        gray
    }

    fn ctx(classifier: &TileClassifier) -> DetectContext<'_> {
        DetectContext {
            binarizer: &HistogramBinarizer,
            analyzer: &LabelingAnalyzer,
            classifier,
            min_particle_area: 1,
        }
    }

    #[test]
    fn keeps_largest_component() {
        let gray = colony_with_speck();
        let classifier = TileClassifier::default();
        let c = ThresholdDetector {
            method: ThresholdMethod::Otsu,
        }
        .detect(&gray, &ctx(&classifier))
        .expect("colony");
        assert!(c.centroid[0] > 35.0 && c.centroid[1] > 35.0);
        assert_eq!(c.threshold, Some(125));
    }

    #[test]
    fn largest_component_does_not_depend_on_analyzer_order() {
        let gray = colony_with_speck();
        let classifier = TileClassifier::default();
        let ctx = DetectContext {
            binarizer: &HistogramBinarizer,
            analyzer: &SmallestFirst,
            classifier: &classifier,
            min_particle_area: 1,
        };
        let c = ThresholdDetector {
            method: ThresholdMethod::Otsu,
        }
        .detect(&gray, &ctx)
        .expect("colony");
        assert!(c.centroid[0] > 35.0 && c.centroid[1] > 35.0);
        assert_eq!(c.region.metrics.area, Mask::disk(64, 64, [40.0, 40.0], 10.0).count());
    }

    #[test]
    fn whole_tile_component_is_discarded() {
        // A bright frame with a dark center: hole filling covers the tile.
        let gray = GrayImage::from_fn(32, 32, |x, y| {
            let edge = x < 2 || y < 2 || x >= 30 || y >= 30;
            image::Luma([if edge { 220 } else { 30 }])
        });
        let classifier = TileClassifier::default();
        let err = ThresholdDetector {
            method: ThresholdMethod::Otsu,
        }
        .detect(&gray, &ctx(&classifier))
        .expect_err("degenerate");
        assert_eq!(err, EmptyReason::WholeTileRegion);
    }
}
