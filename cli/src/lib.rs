pub mod server;

use std::path::{Path, PathBuf};

use clap::Args;
use gridscan::{CellOrder, ScanConfig, TableSelection};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Scan(#[from] gridscan::GridScanError),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error("Blocking scan task failed: {0}")]
    Join(String),
}

/// Upload extensions the service accepts
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Scan settings that can be given on the command line. Each one overrides
/// the value from the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct ScanOverrides {
    /// Number of rows in the table
    #[arg(short, long)]
    pub rows: Option<usize>,

    /// Which region wins when several look like tables: first_qualifying or largest_area
    #[arg(long)]
    pub table_selection: Option<TableSelection>,

    /// Cell ordering: reading_order, raster_scan or area_descending
    #[arg(long)]
    pub cell_order: Option<CellOrder>,

    /// OCR language, e.g. `eng` or `eng+deu`
    #[arg(short, long)]
    pub lang: Option<String>,

    /// Directory holding the tesseract language data
    #[arg(long)]
    pub tessdata_dir: Option<PathBuf>,

    /// Path to the tesseract executable
    #[arg(long)]
    pub tesseract: Option<PathBuf>,

    /// Per-cell OCR deadline in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Number of OCR workers
    #[arg(long)]
    pub workers: Option<usize>,

    /// Recognize cells one after another
    #[arg(long)]
    pub sequential: bool,

    /// Longer image side after normalization
    #[arg(long)]
    pub max_dimension: Option<u32>,

    /// Never enlarge small screenshots
    #[arg(long)]
    pub no_upscale: bool,
}

impl ScanOverrides {
    pub fn apply(&self, mut config: ScanConfig) -> ScanConfig {
        if let Some(rows) = self.rows {
            config.expected_rows = rows;
        }
        if let Some(selection) = self.table_selection {
            config.table_selection = selection;
        }
        if let Some(order) = self.cell_order {
            config.cell_order = order;
        }
        if let Some(lang) = &self.lang {
            config.ocr.language = lang.clone();
        }
        if let Some(dir) = &self.tessdata_dir {
            config.ocr.tessdata_dir = Some(dir.clone());
        }
        if let Some(exe) = &self.tesseract {
            config.ocr.executable = Some(exe.clone());
        }
        if let Some(ms) = self.timeout_ms {
            config.ocr.timeout_ms = Some(ms);
        }
        if let Some(workers) = self.workers {
            config.ocr.workers = Some(workers);
        }
        if self.sequential {
            config.ocr.parallel = false;
        }
        if let Some(max_dimension) = self.max_dimension {
            config.max_dimension = max_dimension;
        }
        if self.no_upscale {
            config.upscale = false;
        }
        config
    }
}

/// Config file (if any) with command line overrides applied, validated
pub fn resolve_config(path: Option<&Path>, overrides: &ScanOverrides) -> Result<ScanConfig, CliError> {
    let base = match path {
        Some(path) => ScanConfig::from_file(path)?,
        None => ScanConfig::default(),
    };
    let config = overrides.apply(base);
    config.validate()?;
    Ok(config)
}

/// Whether an uploaded file name has an accepted image extension
pub fn is_allowed_upload(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Name an accepted upload is stored under: `<unix-millis>_<name>` with
/// every `/` removed. `None` when the extension is not accepted.
pub fn stored_upload_name(file_name: &str, unix_millis: u128) -> Option<String> {
    if !is_allowed_upload(file_name) {
        return None;
    }
    Some(format!("{unix_millis}_{}", file_name.replace('/', "")))
}
