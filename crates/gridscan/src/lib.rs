//! # GridScan
//!
//! Turns a screenshot of a ruled table (a school timetable, a schedule, a
//! price list) into a row-major matrix of recognized strings.
//!
//! The image is normalized and binarized, the horizontal and vertical rulings
//! are isolated with directional morphology, the region with the most grid
//! joints is taken as the table, its enclosed boxes become cells, and every
//! cell goes through OCR. Cells are put in reading order and split into a
//! known number of rows at the largest vertical gaps.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! let rows = gridscan::convert("timetable.png")?;
//! for row in rows {
//!     println!("{}", row.join(" | "));
//! }
//! # Ok::<(), gridscan::GridScanError>(())
//! ```
//!
//! ## Custom Pipeline
//!
//! ```rust,no_run
//! use gridscan::{Pipeline, ScanConfig, TableSelection};
//!
//! let config = ScanConfig {
//!     table_selection: TableSelection::FirstQualifying,
//!     ..ScanConfig::default()
//! };
//! let pipeline = Pipeline::builder()
//!     .config(config)
//!     .expected_rows(5)
//!     .debug_dir("debug")
//!     .build()?;
//!
//! let scan = pipeline.process_path("timetable.png")?;
//! print!("{}", scan.table.render());
//! # Ok::<(), gridscan::GridScanError>(())
//! ```

pub mod error;
pub mod types;
pub mod config;
pub mod traits;
pub mod algorithms;
pub mod ocr;
pub mod pipeline;

#[cfg(test)]
pub(crate) mod test_support;

use std::path::Path;

pub use error::{GridScanError, OcrError, Result};
pub use types::{BoundingBox, Cell, ContourRegion, Table, TableCandidate, TableScan};
pub use config::{CellOrder, OcrConfig, ScanConfig, TableSelection};
pub use traits::*;
pub use algorithms::*;
pub use ocr::{CellRecognizer, TesseractCli, TesseractCliFactory};
pub use pipeline::{Pipeline, builder::PipelineBuilder};

/// Scan the image at `path` with the default configuration and the
/// tesseract engine.
///
/// Returns the table row by row; a cell whose text could not be read is an
/// empty string.
pub fn convert<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<String>>> {
    let image = image::open(path.as_ref())?;
    let pipeline = Pipeline::builder().build()?;
    Ok(pipeline.process(&image)?.table.into_rows())
}
