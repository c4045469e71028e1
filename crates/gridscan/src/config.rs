use std::fs;
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

use crate::error::{GridScanError, Result};

/// Which region wins when several pass the table filters.
///
/// Earlier versions of this tool disagreed here: one stopped at the first
/// qualifying region in contour order, another kept scanning and took the
/// largest. Both are kept selectable.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TableSelection {
    /// Stop at the first region passing every filter
    FirstQualifying,
    /// Evaluate every region and keep the one with the largest bounding box
    #[default]
    LargestArea,
}

/// Ordering strategy for anything with a bounding box.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CellOrder {
    /// Row-major with a y tolerance band
    #[default]
    ReadingOrder,
    /// Strict (y, x)
    RasterScan,
    /// Bounding-box area, largest first
    AreaDescending,
}

/// OCR engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct OcrConfig {
    /// Tesseract language model, e.g. `eng`
    pub language: String,
    pub tessdata_dir: Option<PathBuf>,
    /// Path to the `tesseract` binary; looked up on `PATH` when unset
    pub executable: Option<PathBuf>,
    pub page_segmentation_mode: Option<u8>,
    /// Per-cell deadline in milliseconds
    pub timeout_ms: Option<u64>,
    /// Recognize cells on a thread pool, one engine per worker
    pub parallel: bool,
    pub workers: Option<usize>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            tessdata_dir: None,
            executable: None,
            page_segmentation_mode: Some(6),
            timeout_ms: None,
            parallel: true,
            workers: None,
        }
    }
}

impl OcrConfig {
    pub fn timeout(&self) -> Option<std::time::Duration> {
        self.timeout_ms.map(std::time::Duration::from_millis)
    }
}

/// Every tunable of a scan. Read-only once a pipeline is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ScanConfig {
    /// Longer image side after normalization
    pub max_dimension: u32,
    /// Scale images smaller than `max_dimension` up (and sharpen them)
    pub upscale: bool,
    /// Median filter radius used for denoising; 0 disables it
    pub denoise_radius: u32,
    pub sharpen_sigma: f32,
    /// Adaptive threshold window is `2 * radius + 1` square
    pub threshold_block_radius: u32,
    /// A pixel is foreground when it exceeds the local mean by more than this
    pub threshold_offset: u8,
    /// Line structuring element is `dimension / morph_scale` long
    pub morph_scale: u32,
    pub min_table_area: f64,
    /// Tables need strictly more joints than this
    pub min_joints: usize,
    pub table_selection: TableSelection,
    /// Douglas-Peucker tolerance for contour simplification
    pub polygon_epsilon: f32,
    pub min_cell_area: f64,
    pub max_cell_area: f64,
    /// Number of rows the table is known to have
    pub expected_rows: usize,
    pub row_tolerance: u32,
    pub cell_order: CellOrder,
    /// OCR text must be strictly longer than this to be kept
    pub min_text_len: usize,
    pub ocr: OcrConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_dimension: 1500,
            upscale: true,
            denoise_radius: 1,
            sharpen_sigma: 3.0,
            threshold_block_radius: 7,
            threshold_offset: 2,
            morph_scale: 20,
            min_table_area: 100.0,
            min_joints: 4,
            table_selection: TableSelection::default(),
            polygon_epsilon: 3.0,
            min_cell_area: 800.0,
            max_cell_area: 10000.0,
            expected_rows: 6,
            row_tolerance: 5,
            cell_order: CellOrder::default(),
            min_text_len: 3,
            ocr: OcrConfig::default(),
        }
    }
}

impl ScanConfig {
    /// Load from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: ScanConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: ScanConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Pick the format from the file extension
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(GridScanError::InvalidConfig(format!(
                "unsupported config format: {}",
                path_ref.display()
            ))),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ScanConfig)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(GridScanError::InvalidConfig(msg.to_string()));

        if self.expected_rows == 0 {
            return invalid("expected_rows must be at least 1");
        }
        if self.morph_scale == 0 {
            return invalid("morph_scale must be at least 1");
        }
        if self.max_dimension == 0 {
            return invalid("max_dimension must be positive");
        }
        if self.threshold_block_radius == 0 {
            return invalid("threshold_block_radius must be positive");
        }
        if self.min_cell_area > self.max_cell_area {
            return invalid("min_cell_area is larger than max_cell_area");
        }
        if self.ocr.workers == Some(0) {
            return invalid("ocr.workers must be at least 1");
        }
        Ok(())
    }
}
