//! In-process OCR through libtesseract (`leptess` feature).

use std::io::Cursor;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use image::{GrayImage, ImageFormat};
use ::leptess::{LepTess, Variable};
use tracing::warn;

use crate::{
    config::OcrConfig,
    error::{GridScanError, OcrError, Result},
    traits::{OcrEngine, OcrEngineFactory},
};

#[derive(Debug, Clone)]
pub struct LepTessFactory {
    language: String,
    tessdata_dir: Option<PathBuf>,
    psm: Option<u8>,
}

impl LepTessFactory {
    pub fn from_config(config: &OcrConfig) -> Self {
        Self {
            language: config.language.clone(),
            tessdata_dir: config.tessdata_dir.clone(),
            psm: config.page_segmentation_mode,
        }
    }
}

impl OcrEngineFactory for LepTessFactory {
    fn name(&self) -> &str {
        "leptess"
    }

    fn create(&self) -> Result<Box<dyn OcrEngine>> {
        let data_path = self.tessdata_dir.as_ref().and_then(|dir| dir.to_str());
        let mut api = LepTess::new(data_path, &self.language).map_err(|e| {
            GridScanError::OcrInit(format!(
                "tesseract could not load language '{}': {e}",
                self.language
            ))
        })?;

        if let Some(psm) = self.psm {
            api.set_variable(Variable::TesseditPagesegMode, &psm.to_string())
                .map_err(|e| GridScanError::OcrInit(format!("failed to set page segmentation mode: {e}")))?;
        }

        Ok(Box::new(LepTessEngine { api }))
    }
}

/// One libtesseract handle
pub struct LepTessEngine {
    api: LepTess,
}

// SAFETY: the handle is owned by exactly one engine and only touched through
// `&mut self`, so it is never used from two threads at once.
unsafe impl Send for LepTessEngine {}

impl OcrEngine for LepTessEngine {
    fn recognize(&mut self, image: &GrayImage, deadline: Option<Duration>) -> std::result::Result<String, OcrError> {
        let started = Instant::now();

        let mut png = Cursor::new(Vec::new());
        image.write_to(&mut png, ImageFormat::Png)?;
        self.api
            .set_image_from_mem(png.get_ref())
            .map_err(|e| OcrError::Engine(format!("failed to load cell image: {e}")))?;

        let text = self.api.get_utf8_text().map_err(|_| OcrError::InvalidUtf8)?;

        // libtesseract cannot be interrupted, so the deadline is checked afterwards
        if let Some(limit) = deadline {
            if started.elapsed() > limit {
                warn!(elapsed = ?started.elapsed(), ?limit, "Discarding late OCR result");
                return Err(OcrError::Timeout(limit));
            }
        }
        Ok(text)
    }
}
