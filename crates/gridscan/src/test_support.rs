//! Synthetic images and scripted OCR engines for unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use image::{GrayImage, Luma};
use imageproc::contours::BorderType;
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

use crate::{
    error::{GridScanError, OcrError, Result},
    traits::{OcrEngine, OcrEngineFactory},
    types::{BoundingBox, Cell, ContourRegion},
};

pub fn white_canvas(width: u32, height: u32) -> GrayImage {
    GrayImage::from_pixel(width, height, Luma([255]))
}

/// Draw a ruled grid with its top-left corner at `(x0, y0)`.
///
/// Column `c` spans `col_widths[c]` pixels from the left edge of its ruling
/// to the left edge of the next one, so the grid covers
/// `sum(col_widths) + thickness` by `sum(row_heights) + thickness` pixels.
pub fn draw_grid(
    image: &mut GrayImage,
    x0: u32,
    y0: u32,
    col_widths: &[u32],
    row_heights: &[u32],
    thickness: u32,
) {
    let width = col_widths.iter().sum::<u32>() + thickness;
    let height = row_heights.iter().sum::<u32>() + thickness;
    let ink = Luma([0]);

    let mut x = x0;
    for step in col_widths.iter().copied().chain(std::iter::once(0)) {
        draw_filled_rect_mut(image, Rect::at(x as i32, y0 as i32).of_size(thickness, height), ink);
        x += step;
    }

    let mut y = y0;
    for step in row_heights.iter().copied().chain(std::iter::once(0)) {
        draw_filled_rect_mut(image, Rect::at(x0 as i32, y as i32).of_size(width, thickness), ink);
        y += step;
    }
}

/// A cell whose region is the full extent of `image`
pub fn cell_from_image(image: GrayImage) -> Cell {
    let (w, h) = image.dimensions();
    let (right, bottom) = (w.saturating_sub(1) as f32, h.saturating_sub(1) as f32);
    Cell {
        region: ContourRegion {
            points: vec![[0.0, 0.0], [right, 0.0], [right, bottom], [0.0, bottom]],
            bounds: BoundingBox::new(0, 0, w, h),
            border_type: BorderType::Hole,
            has_children: false,
        },
        image,
    }
}

type Script = dyn Fn(&GrayImage) -> std::result::Result<String, OcrError> + Send + Sync;

/// Engine factory answering every call with a closure of the cell image
pub struct FnEngineFactory {
    script: Arc<Script>,
    pub created: AtomicUsize,
}

impl FnEngineFactory {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&GrayImage) -> std::result::Result<String, OcrError> + Send + Sync + 'static,
    {
        Self {
            script: Arc::new(script),
            created: AtomicUsize::new(0),
        }
    }
}

impl OcrEngineFactory for FnEngineFactory {
    fn name(&self) -> &str {
        "scripted"
    }

    fn create(&self) -> Result<Box<dyn OcrEngine>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FnEngine {
            script: Arc::clone(&self.script),
        }))
    }
}

struct FnEngine {
    script: Arc<Script>,
}

impl OcrEngine for FnEngine {
    fn recognize(&mut self, image: &GrayImage, _deadline: Option<Duration>) -> std::result::Result<String, OcrError> {
        (self.script)(image)
    }
}

/// Factory whose engines never come up
pub struct FailingFactory;

impl OcrEngineFactory for FailingFactory {
    fn name(&self) -> &str {
        "failing"
    }

    fn create(&self) -> Result<Box<dyn OcrEngine>> {
        Err(GridScanError::OcrInit("language data missing".to_string()))
    }
}
