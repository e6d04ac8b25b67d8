//! Raster binarization behind the [`Binarizer`] seam.
//!
//! The detectors only rely on the contract: given a grayscale raster and a
//! named method, return a foreground mask together with the threshold value
//! that produced it. Foreground is always `pixel > threshold` (bright colonies
//! on a darker substrate).

mod histogram;

use image::GrayImage;

use crate::mask::Mask;

pub use histogram::{gray_histogram, Histogram};

/// Named global or local thresholding method.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ThresholdMethod {
    Otsu,
    Huang,
    /// Smooth the histogram until bimodal, split at the valley.
    Minimum,
    /// Pick the level leaving `foreground_fraction` of the pixels above it.
    Percentile { foreground_fraction: f64 },
    Shanbhag,
    /// Local mean over a `(2·radius+1)²` window; foreground is
    /// `pixel > local_mean - offset`.
    LocalMean { radius: u32, offset: i16 },
    /// Iterative minimum-error thresholding.
    ///
    /// Deprecated: kept only for older profiles, prefer `Huang` or `Otsu`.
    MinError,
}

impl ThresholdMethod {
    pub const fn code(self) -> &'static str {
        match self {
            Self::Otsu => "otsu",
            Self::Huang => "huang",
            Self::Minimum => "minimum",
            Self::Percentile { .. } => "percentile",
            Self::Shanbhag => "shanbhag",
            Self::LocalMean { .. } => "local_mean",
            Self::MinError => "min_error",
        }
    }
}

impl std::fmt::Display for ThresholdMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Output of one binarization.
#[derive(Debug, Clone)]
pub struct Binarization {
    pub mask: Mask,
    /// Threshold level on the 0..=255 scale.
    pub threshold: u8,
}

/// Raster → binary mask + threshold.
pub trait Binarizer: Send + Sync {
    /// Returns `None` when the method cannot produce a threshold for this
    /// raster (flat histogram, non-converging iteration).
    fn binarize(&self, gray: &GrayImage, method: ThresholdMethod) -> Option<Binarization>;
}

/// Default binarizer: global histogram methods plus a local-mean variant.
#[derive(Debug, Clone, Copy, Default)]
pub struct HistogramBinarizer;

impl Binarizer for HistogramBinarizer {
    fn binarize(&self, gray: &GrayImage, method: ThresholdMethod) -> Option<Binarization> {
        let (w, h) = gray.dimensions();
        if w == 0 || h == 0 {
            return None;
        }

        if let ThresholdMethod::LocalMean { radius, offset } = method {
            return Some(local_mean(gray, radius, offset));
        }

        let level = match method {
            ThresholdMethod::Otsu => Some(imageproc::contrast::otsu_level(gray)),
            ThresholdMethod::Huang => histogram::huang(&gray_histogram(gray)),
            ThresholdMethod::Minimum => histogram::minimum(&gray_histogram(gray)),
            ThresholdMethod::Percentile {
                foreground_fraction,
            } => histogram::percentile(&gray_histogram(gray), foreground_fraction),
            ThresholdMethod::Shanbhag => histogram::shanbhag(&gray_histogram(gray)),
            ThresholdMethod::MinError => histogram::min_error(&gray_histogram(gray)),
            ThresholdMethod::LocalMean { .. } => return None,
        }?;
        let level = center_in_gap(&gray_histogram(gray), level);

        let mask = Mask::from_fn(w, h, |x, y| gray.get_pixel(x, y)[0] > level);
        Some(Binarization {
            mask,
            threshold: level,
        })
    }
}

/// Move `level` to the middle of the empty histogram run above it.
///
/// Any level inside the run yields the same mask; the midpoint is the value
/// reported to the classifier.
fn center_in_gap(hist: &Histogram, level: u8) -> u8 {
    let start = level as usize;
    match hist[start + 1..].iter().position(|&c| c > 0) {
        Some(0) | None => level,
        Some(gap) => ((start + start + gap + 1) / 2) as u8,
    }
}

fn local_mean(gray: &GrayImage, radius: u32, offset: i16) -> Binarization {
    let (w, h) = gray.dimensions();
    let means = imageproc::filter::box_filter(gray, radius, radius);
    let mut level_sum = 0u64;
    let mask = Mask::from_fn(w, h, |x, y| {
        let level = (means.get_pixel(x, y)[0] as i32 - offset as i32).clamp(0, 255);
        level_sum += level as u64;
        gray.get_pixel(x, y)[0] as i32 > level
    });
    let n = (w as u64 * h as u64).max(1);
    Binarization {
        mask,
        threshold: ((level_sum + n / 2) / n) as u8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::disk_tile;

    #[test]
    fn global_methods_split_bimodal_tile() {
        let tile = disk_tile(64, 64, [32.0, 32.0], 12.0, 40, 210);
        let disk_area = Mask::disk(64, 64, [32.0, 32.0], 12.0).count();
        for method in [
            ThresholdMethod::Otsu,
            ThresholdMethod::Huang,
            ThresholdMethod::Shanbhag,
            ThresholdMethod::Percentile {
                foreground_fraction: disk_area as f64 / (64.0 * 64.0),
            },
        ] {
            let b = HistogramBinarizer
                .binarize(&tile, method)
                .unwrap_or_else(|| panic!("{method} produced no threshold"));
            assert!(
                (40..210).contains(&b.threshold),
                "{method}: threshold {}",
                b.threshold
            );
            assert_eq!(b.mask.count(), disk_area, "{method}");
        }
    }

    #[test]
    fn binary_raster_threshold_sits_mid_gap() {
        let tile = disk_tile(32, 32, [16.0, 16.0], 8.0, 0, 255);
        let b = HistogramBinarizer
            .binarize(&tile, ThresholdMethod::Otsu)
            .expect("two levels");
        assert_eq!(b.threshold, 127);
        assert_eq!(b.mask.count(), Mask::disk(32, 32, [16.0, 16.0], 8.0).count());
    }

    #[test]
    fn local_mean_marks_bright_spot() {
        let tile = disk_tile(48, 48, [24.0, 24.0], 6.0, 30, 200);
        let b = HistogramBinarizer
            .binarize(
                &tile,
                ThresholdMethod::LocalMean {
                    radius: 10,
                    offset: 0,
                },
            )
            .expect("local mean always yields a mask");
        assert!(b.mask.get(24, 24));
        assert!(!b.mask.get(2, 2));
    }

    #[test]
    fn empty_raster_has_no_threshold() {
        let img = GrayImage::new(0, 0);
        assert!(HistogramBinarizer
            .binarize(&img, ThresholdMethod::Otsu)
            .is_none());
    }
}
