use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridScanError {
    #[error("Failed to load image: {0}")]
    Load(#[from] image::ImageError),

    #[error("Image is empty ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("No table found: no line region passed the area and joint filters")]
    NoTableFound,

    #[error("No cells found inside the table region")]
    NoCellsFound,

    #[error("Found {cells} cells but {expected_rows} rows are expected")]
    Segmentation { cells: usize, expected_rows: usize },

    #[error("Could not initialize OCR engine: {0}")]
    OcrInit(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GridScanError {
    /// True for the errors that mean the input file itself was unusable.
    pub fn is_load_error(&self) -> bool {
        matches!(self, Self::Load(_) | Self::EmptyImage { .. })
    }
}

pub type Result<T> = std::result::Result<T, GridScanError>;

/// Failure of a single recognition call. Never fatal for the scan: the
/// affected cell becomes an empty string.
#[derive(Error, Debug)]
pub enum OcrError {
    #[error("OCR deadline of {0:?} exceeded")]
    Timeout(std::time::Duration),

    #[error("OCR engine failed: {0}")]
    Engine(String),

    #[error("OCR output was not valid UTF-8")]
    InvalidUtf8,

    #[error("IO error during OCR: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode cell image: {0}")]
    Encode(#[from] image::ImageError),
}
