//! Connected-component analysis behind the [`ComponentAnalyzer`] seam.

use image::Luma;
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::mask::Mask;
use crate::region::{Region, RegionMetrics};

/// Binary mask → measured connected components.
pub trait ComponentAnalyzer: Send + Sync {
    /// Label 8-connected foreground components of at least `min_size` pixels.
    ///
    /// With `fill_holes` set, enclosed background is filled before labeling.
    /// No particular order is required; callers pick the colony with
    /// [`largest`] or [`take_largest`].
    fn label(&self, mask: &Mask, min_size: u64, fill_holes: bool) -> Vec<Region>;
}

/// Default analyzer built on `imageproc` region labelling.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelingAnalyzer;

impl ComponentAnalyzer for LabelingAnalyzer {
    fn label(&self, mask: &Mask, min_size: u64, fill_holes: bool) -> Vec<Region> {
        let (w, h) = mask.dimensions();
        if w == 0 || h == 0 {
            return Vec::new();
        }

        let mut mask = mask.clone();
        if fill_holes {
            mask.fill_holes();
        }

        let labels = connected_components(&mask.to_gray(), Connectivity::Eight, Luma([0u8]));
        let mut pixels_by_label: Vec<Vec<(u32, u32)>> = Vec::new();
        for (x, y, p) in labels.enumerate_pixels() {
            let label = p[0] as usize;
            if label == 0 {
                continue;
            }
            if pixels_by_label.len() < label {
                pixels_by_label.resize_with(label, Vec::new);
            }
            pixels_by_label[label - 1].push((x, y));
        }

        let mut regions: Vec<Region> = pixels_by_label
            .into_iter()
            .filter(|px| px.len() as u64 >= min_size.max(1))
            .filter_map(|px| {
                let metrics = RegionMetrics::measure(&px)?;
                let mut component = Mask::new(w, h);
                for &(x, y) in &px {
                    component.set(x, y, true);
                }
                Some(Region {
                    mask: component,
                    metrics,
                })
            })
            .collect();
        regions.sort_by(|a, b| b.metrics.area.cmp(&a.metrics.area));
        regions
    }
}

fn largest_index(regions: &[Region]) -> Option<usize> {
    (0..regions.len()).reduce(|best, i| {
        if regions[i].metrics.area > regions[best].metrics.area {
            i
        } else {
            best
        }
    })
}

/// Maximum-area component (first one on ties).
pub fn largest(regions: &[Region]) -> Option<&Region> {
    largest_index(regions).map(|i| &regions[i])
}

/// Remove and return the maximum-area component (first one on ties).
pub fn take_largest(mut regions: Vec<Region>) -> Option<Region> {
    largest_index(&regions).map(|i| regions.swap_remove(i))
}
