use image::GrayImage;
use tracing::{debug, info};

use crate::{
    algorithms::lines::adaptive_threshold_inverted,
    config::ScanConfig,
    error::{GridScanError, Result},
    traits::ContourExtractor,
    types::Cell,
};

/// Cuts a table crop into cell candidates.
///
/// Cells are the innermost enclosed regions of the re-binarized table: the
/// outer border and the rulings enclose other contours, cells do not.
#[derive(Debug, Clone)]
pub struct CellSegmenter {
    pub min_area: f64,
    pub max_area: f64,
    pub block_radius: u32,
    pub offset: u8,
}

impl Default for CellSegmenter {
    fn default() -> Self {
        Self::from_config(&ScanConfig::default())
    }
}

impl CellSegmenter {
    pub fn from_config(config: &ScanConfig) -> Self {
        Self {
            min_area: config.min_cell_area,
            max_area: config.max_cell_area,
            block_radius: config.threshold_block_radius,
            offset: config.threshold_offset,
        }
    }

    /// Leaf regions within the area range, in discovery order.
    ///
    /// The range bounds the area enclosed by the contour polygon. A cell's
    /// bounding box also covers the border pixels, so its area is always
    /// larger and may exceed `max_area`.
    pub fn segment(&self, table: &GrayImage, extractor: &dyn ContourExtractor) -> Result<Vec<Cell>> {
        let binary = adaptive_threshold_inverted(table, self.block_radius, self.offset);
        let regions = extractor.extract_regions(&binary)?;
        let total = regions.len();

        let cells: Vec<Cell> = regions
            .into_iter()
            .filter(|region| region.is_leaf())
            .filter(|region| {
                let area = region.area();
                let keep = area >= self.min_area && area <= self.max_area;
                if !keep {
                    debug!(area, bounds = ?region.bounds, "Leaf outside cell area range");
                }
                keep
            })
            .filter_map(|region| {
                let image = region.bounds.crop(table)?;
                Some(Cell { region, image })
            })
            .collect();

        info!(contours = total, cells = cells.len(), "Table segmented");
        if cells.is_empty() {
            return Err(GridScanError::NoCellsFound);
        }
        Ok(cells)
    }
}
