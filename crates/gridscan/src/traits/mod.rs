use std::time::Duration;

use image::GrayImage;
use crate::{
    error::{OcrError, Result},
    types::{BoundingBox, Cell, ContourRegion, TableCandidate},
};

/// Trait for contour extraction with a two-level parent/child hierarchy
pub trait ContourExtractor: Send + Sync {
    /// Extract contours from a binary image (non-zero pixels are foreground)
    fn extract_regions(&self, binary_image: &GrayImage) -> Result<Vec<ContourRegion>>;

    /// Number of contours in a binary image
    fn count_regions(&self, binary_image: &GrayImage) -> Result<usize> {
        Ok(self.extract_regions(binary_image)?.len())
    }
}

/// Anything that can be ordered by its bounding box
pub trait Bounded {
    fn bounds(&self) -> BoundingBox;
}

impl Bounded for BoundingBox {
    fn bounds(&self) -> BoundingBox {
        *self
    }
}

impl Bounded for ContourRegion {
    fn bounds(&self) -> BoundingBox {
        self.bounds
    }
}

impl Bounded for Cell {
    fn bounds(&self) -> BoundingBox {
        self.region.bounds
    }
}

impl Bounded for TableCandidate {
    fn bounds(&self) -> BoundingBox {
        self.region.bounds
    }
}

/// One OCR session. Holds mutable engine state, so it is never shared:
/// concurrent callers each get their own instance.
pub trait OcrEngine: Send {
    /// Recognize the text in a prepared (dark text on light background) image
    fn recognize(&mut self, image: &GrayImage, deadline: Option<Duration>) -> std::result::Result<String, OcrError>;
}

/// Creates OCR sessions, one per worker
pub trait OcrEngineFactory: Send + Sync {
    /// Short engine name for logs
    fn name(&self) -> &str;

    /// Initialize a new session. Failure here is fatal for a scan.
    fn create(&self) -> Result<Box<dyn OcrEngine>>;
}
