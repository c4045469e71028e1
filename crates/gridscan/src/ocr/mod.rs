//! Per-cell recognition: binarize each cell, hand it to an OCR session, and
//! keep only results long enough to be real text.

pub mod tesseract;
#[cfg(feature = "leptess")]
pub mod leptess;

pub use tesseract::{TesseractCli, TesseractCliFactory};
#[cfg(feature = "leptess")]
pub use self::leptess::{LepTessEngine, LepTessFactory};

use std::time::Duration;

use image::GrayImage;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::{
    config::ScanConfig,
    error::{GridScanError, Result},
    traits::{OcrEngine, OcrEngineFactory},
    types::Cell,
};

/// Runs OCR over segmented cells
#[derive(Debug, Clone)]
pub struct CellRecognizer {
    /// Text must be strictly longer than this (in chars) to be kept
    pub min_text_len: usize,
    pub denoise_radius: u32,
    pub timeout: Option<Duration>,
    pub parallel: bool,
    pub workers: Option<usize>,
}

impl Default for CellRecognizer {
    fn default() -> Self {
        Self::from_config(&ScanConfig::default())
    }
}

impl CellRecognizer {
    pub fn from_config(config: &ScanConfig) -> Self {
        Self {
            min_text_len: config.min_text_len,
            denoise_radius: config.denoise_radius,
            timeout: config.ocr.timeout(),
            parallel: config.ocr.parallel,
            workers: config.ocr.workers,
        }
    }

    /// Otsu-binarize, flip to dark-on-light when the cell is mostly dark, denoise
    pub fn prepare(&self, cell: &GrayImage) -> GrayImage {
        let level = imageproc::contrast::otsu_level(cell);
        let mut binary = imageproc::contrast::threshold(cell, level);

        let pixels = binary.len().max(1) as f64;
        let brightness = binary.iter().map(|&p| p as f64).sum::<f64>() / pixels;
        if brightness < 128.0 {
            image::imageops::invert(&mut binary);
        }

        if self.denoise_radius > 0 {
            binary = imageproc::filter::median_filter(&binary, self.denoise_radius, self.denoise_radius);
        }
        binary
    }

    /// Trimmed text, or an empty string when the raw engine output is too
    /// short to trust. The length check counts the engine's trailing newline.
    pub fn accept(&self, raw: &str) -> String {
        if raw.chars().count() > self.min_text_len {
            raw.trim().to_string()
        } else {
            String::new()
        }
    }

    /// Recognize one cell. Engine failures degrade to an empty string.
    pub fn recognize_cell(&self, engine: &mut dyn OcrEngine, cell: &Cell, index: usize) -> String {
        let prepared = self.prepare(&cell.image);
        match engine.recognize(&prepared, self.timeout) {
            Ok(raw) => {
                let text = self.accept(&raw);
                debug!(index, raw = raw.trim(), kept = !text.is_empty(), "Cell recognized");
                text
            }
            Err(e) => {
                warn!(index, error = %e, "OCR failed for cell, leaving it empty");
                String::new()
            }
        }
    }

    /// Texts for `cells`, index-aligned with the input.
    ///
    /// In parallel mode the cells are split into one contiguous chunk per
    /// worker and each chunk gets its own session from `factory`.
    pub fn recognize_all(&self, cells: &[Cell], factory: &dyn OcrEngineFactory) -> Result<Vec<String>> {
        info!(cells = cells.len(), engine = factory.name(), parallel = self.parallel, "Running OCR");

        if !self.parallel {
            let mut engine = factory.create()?;
            return Ok(cells
                .iter()
                .enumerate()
                .map(|(index, cell)| self.recognize_cell(engine.as_mut(), cell, index))
                .collect());
        }

        let workers = self.workers.unwrap_or_else(rayon::current_num_threads).max(1);
        let chunk_len = cells.len().div_ceil(workers).max(1);
        let run = || {
            cells
                .par_chunks(chunk_len)
                .enumerate()
                .map(|(chunk, part)| -> Result<Vec<String>> {
                    let mut engine = factory.create()?;
                    Ok(part
                        .iter()
                        .enumerate()
                        .map(|(i, cell)| self.recognize_cell(engine.as_mut(), cell, chunk * chunk_len + i))
                        .collect::<Vec<String>>())
                })
                .collect::<Result<Vec<Vec<String>>>>()
        };

        let chunks = match self.workers {
            Some(workers) => rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .build()
                .map_err(|e| GridScanError::InvalidConfig(format!("OCR thread pool: {e}")))?
                .install(run)?,
            None => run()?,
        };
        debug!(sessions = chunks.len(), "OCR sessions finished");
        Ok(chunks.into_iter().flatten().collect())
    }
}
