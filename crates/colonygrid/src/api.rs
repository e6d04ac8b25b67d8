//! High-level phenotyping API.
//!
//! [`Phenotyper`] is the primary entry point. It wraps a
//! [`PhenotypeConfig`] together with the binarizer and component analyzer
//! every tile is run through.

use std::path::Path;

use crate::binarize::{Binarizer, HistogramBinarizer};
use crate::components::{ComponentAnalyzer, LabelingAnalyzer};
use crate::config::{PhenotypeConfig, Profile};
use crate::grid::Segmenter;
use crate::pipeline::{self, PlateError, PlateReport, TileEngine, TileOutcome};
use crate::tile::{PlateImage, PredefinedRegion, Tile};

/// Primary phenotyping interface.
///
/// Create once, analyze many plates.
///
/// # Examples
///
/// ```no_run
/// use colonygrid::{Phenotyper, PhenotypeConfig, PlateImage, UniformGridSegmenter};
///
/// let plate = PlateImage::open("plate.png").unwrap();
/// let phenotyper = Phenotyper::new(PhenotypeConfig::basic());
/// let report = phenotyper
///     .analyze_plate(&plate, 32, 48, &UniformGridSegmenter::default(), &[])
///     .unwrap();
/// if let Some(matrix) = report.matrix() {
///     println!("{} colonies measured", matrix.measured_count());
/// }
/// ```
pub struct Phenotyper {
    config: PhenotypeConfig,
    binarizer: Box<dyn Binarizer>,
    analyzer: Box<dyn ComponentAnalyzer>,
}

impl Phenotyper {
    /// Phenotyper with the default collaborators.
    pub fn new(config: PhenotypeConfig) -> Self {
        Self::with_collaborators(
            config,
            Box::new(HistogramBinarizer),
            Box::new(LabelingAnalyzer),
        )
    }

    /// Phenotyper with the named preset.
    pub fn for_profile(profile: Profile) -> Self {
        Self::new(PhenotypeConfig::for_profile(profile))
    }

    /// Phenotyper with custom binarization and component labelling.
    pub fn with_collaborators(
        config: PhenotypeConfig,
        binarizer: Box<dyn Binarizer>,
        analyzer: Box<dyn ComponentAnalyzer>,
    ) -> Self {
        Self {
            config,
            binarizer,
            analyzer,
        }
    }

    /// Load a JSON configuration and create a phenotyper in one step.
    pub fn from_config_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self::new(PhenotypeConfig::from_json_file(path)?))
    }

    pub fn config(&self) -> &PhenotypeConfig {
        &self.config
    }

    /// Mutable access to configuration for post-construction tuning.
    pub fn config_mut(&mut self) -> &mut PhenotypeConfig {
        &mut self.config
    }

    fn engine(&self) -> TileEngine<'_> {
        TileEngine {
            config: &self.config,
            binarizer: self.binarizer.as_ref(),
            analyzer: self.analyzer.as_ref(),
        }
    }

    /// Analyze a single tile. Never panics; a panic inside the analysis
    /// comes back as a failed outcome.
    pub fn analyze_tile(&self, tile: &Tile) -> TileOutcome {
        pipeline::run_isolated(&self.engine(), tile)
    }

    /// Analyze pre-cut tiles, one per cell of a `rows × cols` grid.
    ///
    /// The diagnostic, when rendered, is a schematic of the tile outlines.
    pub fn analyze_tiles(
        &self,
        tiles: Vec<Tile>,
        rows: usize,
        cols: usize,
    ) -> Result<PlateReport, PlateError> {
        pipeline::run_plate(&self.engine(), tiles, rows, cols, None)
    }

    /// Grid the plate with `segmenter` and analyze every cell.
    ///
    /// `rois` is either empty or holds one optional user-defined region per
    /// cell in row-major order, in tile coordinates.
    pub fn analyze_plate(
        &self,
        plate: &PlateImage,
        rows: usize,
        cols: usize,
        segmenter: &dyn Segmenter,
        rois: &[Option<PredefinedRegion>],
    ) -> Result<PlateReport, PlateError> {
        if !rois.is_empty() && rois.len() != rows * cols {
            return Err(PlateError::RoiCountMismatch {
                expected: rows * cols,
                found: rois.len(),
            });
        }
        let geometry = segmenter.grid(plate, rows, cols)?;
        let tiles = geometry
            .iter()
            .map(|g| {
                let tile = plate.tile(g.row, g.col, g.rect);
                match rois.get(g.row * cols + g.col).copied().flatten() {
                    Some(roi) => tile.with_roi(roi),
                    None => tile,
                }
            })
            .collect();
        pipeline::run_plate(&self.engine(), tiles, rows, cols, Some(plate))
    }
}

impl Default for Phenotyper {
    fn default() -> Self {
        Self::new(PhenotypeConfig::default())
    }
}
