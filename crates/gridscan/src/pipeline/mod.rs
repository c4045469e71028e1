pub mod builder;

use std::fs;
use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, Rgb};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use tracing::{info, warn};

use crate::{
    algorithms::{
        CellSegmenter, ImageNormalizer, LineExtractor, LineMasks, LocatedTable, RowGrouper,
        TableAssembler, TableLocator,
    },
    config::ScanConfig,
    error::{GridScanError, Result},
    ocr::CellRecognizer,
    traits::{Bounded, ContourExtractor, OcrEngineFactory},
    types::{BoundingBox, Cell, TableScan},
};

/// The full screenshot-to-table pipeline
pub struct Pipeline {
    config: ScanConfig,
    contour_extractor: Box<dyn ContourExtractor>,
    ocr: Box<dyn OcrEngineFactory>,
    debug_dir: Option<PathBuf>,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> builder::PipelineBuilder {
        builder::PipelineBuilder::new()
    }

    /// Create a pipeline from already validated parts
    pub fn new(
        config: ScanConfig,
        contour_extractor: Box<dyn ContourExtractor>,
        ocr: Box<dyn OcrEngineFactory>,
        debug_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            config,
            contour_extractor,
            ocr,
            debug_dir,
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Decode the file at `path` and scan it
    pub fn process_path<P: AsRef<Path>>(&self, path: P) -> Result<TableScan> {
        let path = path.as_ref();
        let image = image::open(path)?;
        info!(path = %path.display(), width = image.width(), height = image.height(), "Image loaded");
        self.process(&image)
    }

    /// Run every stage on one image
    pub fn process(&self, image: &DynamicImage) -> Result<TableScan> {
        let config = &self.config;
        let extractor = self.contour_extractor.as_ref();

        // Step 1: normalize size and clean up
        let gray = ImageNormalizer::from_config(config).normalize(image)?;

        // Step 2: ruling masks
        let masks = LineExtractor::from_config(config).extract(&gray);

        // Step 3: pick the table
        let located = TableLocator::from_config(config).locate(&masks.combined, &masks.joints, &gray, extractor)?;

        // Step 4: cut it into cells
        let mut cells = CellSegmenter::from_config(config).segment(&located.image, extractor)?;

        // Step 5: reading order
        config.cell_order.sort(&mut cells, config.row_tolerance);

        if let Some(dir) = &self.debug_dir {
            if let Err(e) = dump_debug_images(dir, &masks, &located, &cells) {
                warn!(dir = %dir.display(), error = %e, "Could not write debug images");
            }
        }

        // Step 6: row boundaries
        let splits = RowGrouper::new(config.expected_rows).split(&cells)?;
        info!(cells = cells.len(), ?splits, "Cells grouped into rows");

        // Step 7: recognize text
        let texts = CellRecognizer::from_config(config).recognize_all(&cells, self.ocr.as_ref())?;

        // Step 8: fold into the matrix
        let table = TableAssembler::assemble(&texts, &splits);
        let boxes: Vec<BoundingBox> = cells.iter().map(|cell| cell.bounds()).collect();

        info!(rows = table.row_count(), columns = table.column_count(), "Table assembled");
        Ok(TableScan {
            table,
            table_bounds: located.candidate.region.bounds,
            cells: TableAssembler::rows(&boxes, &splits),
            image_width: gray.width(),
            image_height: gray.height(),
        })
    }

    /// Get information about the pipeline configuration
    pub fn info(&self) -> String {
        format!(
            "Pipeline: {} OCR, {} rows, {} table selection, {} cell order",
            self.ocr.name(),
            self.config.expected_rows,
            self.config.table_selection,
            self.config.cell_order
        )
    }
}

fn dump_debug_images(dir: &Path, masks: &LineMasks, located: &LocatedTable, cells: &[Cell]) -> Result<()> {
    fs::create_dir_all(dir)?;

    let save = |name: &str, image: &GrayImage| {
        image
            .save(dir.join(name))
            .map_err(|e| GridScanError::Io(std::io::Error::other(e)))
    };
    save("binary.png", &masks.binary)?;
    save("horizontal.png", &masks.horizontal)?;
    save("vertical.png", &masks.vertical)?;
    save("combined.png", &masks.combined)?;
    save("joints.png", &masks.joints)?;

    let mut annotated = DynamicImage::ImageLuma8(located.image.clone()).to_rgb8();
    for cell in cells {
        let bounds = cell.bounds();
        let rect = Rect::at(bounds.x as i32, bounds.y as i32).of_size(bounds.width.max(1), bounds.height.max(1));
        draw_hollow_rect_mut(&mut annotated, rect, Rgb([255, 0, 0]));
    }
    annotated
        .save(dir.join("table.png"))
        .map_err(|e| GridScanError::Io(std::io::Error::other(e)))?;

    info!(dir = %dir.display(), "Debug images written");
    Ok(())
}
