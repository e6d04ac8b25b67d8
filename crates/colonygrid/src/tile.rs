//! Tiles (one grid cell's raster) and the plate image they are cut from.

use std::path::Path;

use image::{DynamicImage, GrayImage, RgbImage};

use crate::mask::{BoundingBox, Mask};

/// Shape of a user-supplied region of interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoiShape {
    Rectangle,
    #[default]
    Oval,
}

/// Externally defined single-colony region, in tile coordinates.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PredefinedRegion {
    pub bbox: BoundingBox,
    #[serde(default)]
    pub shape: RoiShape,
}

impl PredefinedRegion {
    pub fn new(bbox: BoundingBox, shape: RoiShape) -> Self {
        Self { bbox, shape }
    }

    /// Rasterize into a `width × height` tile mask.
    pub fn to_mask(&self, width: u32, height: u32) -> Mask {
        match self.shape {
            RoiShape::Rectangle => Mask::rectangle(width, height, self.bbox),
            RoiShape::Oval => Mask::oval(width, height, self.bbox),
        }
    }
}

/// One grid cell handed to the per-tile engine.
#[derive(Debug, Clone)]
pub struct Tile {
    pub row: usize,
    pub col: usize,
    /// Grayscale raster every detector works on.
    pub gray: GrayImage,
    /// Color raster, required by the color scorer.
    pub color: Option<RgbImage>,
    /// Single-colony override: skips detection entirely.
    pub roi: Option<PredefinedRegion>,
    /// Top-left corner of this tile within the plate image.
    pub offset: [u32; 2],
}

impl Tile {
    pub fn new(row: usize, col: usize, gray: GrayImage) -> Self {
        Self {
            row,
            col,
            gray,
            color: None,
            roi: None,
            offset: [0, 0],
        }
    }

    /// Tile from a color raster; the grayscale raster is derived from it.
    pub fn from_color(row: usize, col: usize, color: RgbImage) -> Self {
        let gray = image::imageops::grayscale(&color);
        Self {
            color: Some(color),
            ..Self::new(row, col, gray)
        }
    }

    pub fn with_roi(mut self, roi: PredefinedRegion) -> Self {
        self.roi = Some(roi);
        self
    }

    pub fn with_offset(mut self, offset: [u32; 2]) -> Self {
        self.offset = offset;
        self
    }

    pub fn width(&self) -> u32 {
        self.gray.width()
    }

    pub fn height(&self) -> u32 {
        self.gray.height()
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }
}

/// Full plate photograph.
#[derive(Debug, Clone)]
pub struct PlateImage {
    pub gray: GrayImage,
    pub color: Option<RgbImage>,
}

impl PlateImage {
    pub fn from_gray(gray: GrayImage) -> Self {
        Self { gray, color: None }
    }

    /// Keep the color channels only when the source actually has them.
    pub fn from_dynamic(img: DynamicImage) -> Self {
        let has_color = img.color().has_color();
        let gray = img.to_luma8();
        let color = has_color.then(|| img.to_rgb8());
        Self { gray, color }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, image::ImageError> {
        Ok(Self::from_dynamic(image::open(path)?))
    }

    pub fn width(&self) -> u32 {
        self.gray.width()
    }

    pub fn height(&self) -> u32 {
        self.gray.height()
    }

    /// Cut one tile out of the plate, keeping its plate offset.
    pub fn tile(&self, row: usize, col: usize, rect: BoundingBox) -> Tile {
        let gray = image::imageops::crop_imm(&self.gray, rect.x, rect.y, rect.width, rect.height)
            .to_image();
        let color = self.color.as_ref().map(|c| {
            image::imageops::crop_imm(c, rect.x, rect.y, rect.width, rect.height).to_image()
        });
        Tile {
            row,
            col,
            gray,
            color,
            roi: None,
            offset: [rect.x, rect.y],
        }
    }
}
