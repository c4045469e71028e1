use std::path::PathBuf;

use tracing::info;

use crate::{
    algorithms::ImageprocContourExtractor,
    config::ScanConfig,
    error::Result,
    ocr::TesseractCliFactory,
    pipeline::Pipeline,
    traits::{ContourExtractor, OcrEngineFactory},
};

/// Builder for creating scan pipelines with a fluent API
pub struct PipelineBuilder {
    config: ScanConfig,
    contour_extractor: Option<Box<dyn ContourExtractor>>,
    ocr: Option<Box<dyn OcrEngineFactory>>,
    debug_dir: Option<PathBuf>,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineBuilder {
    /// Create a new pipeline builder with the default configuration
    pub fn new() -> Self {
        Self {
            config: ScanConfig::default(),
            contour_extractor: None,
            ocr: None,
            debug_dir: None,
        }
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: ScanConfig) -> Self {
        self.config = config;
        self
    }

    /// Number of rows the table is known to have
    pub fn expected_rows(mut self, rows: usize) -> Self {
        self.config.expected_rows = rows;
        self
    }

    /// Set the OCR engine factory (replaces the tesseract default)
    pub fn ocr_engine<F>(mut self, factory: F) -> Self
    where
        F: OcrEngineFactory + 'static,
    {
        self.ocr = Some(Box::new(factory));
        self
    }

    /// Set the contour extractor (replaces any existing one)
    pub fn contour_extractor<E>(mut self, extractor: E) -> Self
    where
        E: ContourExtractor + 'static,
    {
        self.contour_extractor = Some(Box::new(extractor));
        self
    }

    /// Write intermediate masks and the annotated table crop into `dir`
    pub fn debug_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.debug_dir = Some(dir.into());
        self
    }

    /// Validate the configuration, fill in default components and make sure
    /// the OCR engine can start.
    pub fn build(self) -> Result<Pipeline> {
        self.config.validate()?;

        let contour_extractor = self.contour_extractor.unwrap_or_else(|| {
            Box::new(ImageprocContourExtractor {
                epsilon: self.config.polygon_epsilon,
            })
        });
        let ocr = self
            .ocr
            .unwrap_or_else(|| Box::new(TesseractCliFactory::from_config(&self.config.ocr)));

        // probe once; the session is discarded
        drop(ocr.create()?);
        info!(engine = ocr.name(), expected_rows = self.config.expected_rows, "Pipeline ready");

        Ok(Pipeline::new(self.config, contour_extractor, ocr, self.debug_dir))
    }
}
