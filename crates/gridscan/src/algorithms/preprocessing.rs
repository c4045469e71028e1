use image::{imageops::FilterType, DynamicImage, GrayImage, RgbImage};
use tracing::debug;

use crate::{
    config::ScanConfig,
    error::{GridScanError, Result},
};

/// Brings an arbitrary decoded screenshot to a bounded-size grayscale bitmap.
#[derive(Debug, Clone)]
pub struct ImageNormalizer {
    pub max_dimension: u32,
    pub upscale: bool,
    pub denoise_radius: u32,
    pub sharpen_sigma: f32,
}

impl Default for ImageNormalizer {
    fn default() -> Self {
        Self::from_config(&ScanConfig::default())
    }
}

/// Working copy, kept in the source channel layout until the final conversion
enum Working {
    Gray(GrayImage),
    Rgb(RgbImage),
}

impl ImageNormalizer {
    pub fn from_config(config: &ScanConfig) -> Self {
        Self {
            max_dimension: config.max_dimension,
            upscale: config.upscale,
            denoise_radius: config.denoise_radius,
            sharpen_sigma: config.sharpen_sigma,
        }
    }

    /// Resize, denoise, sharpen when enlarged, then convert to grayscale
    pub fn normalize(&self, image: &DynamicImage) -> Result<GrayImage> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(GridScanError::EmptyImage { width, height });
        }

        let scale = self.max_dimension as f64 / width.max(height) as f64;
        let upscaled = scale > 1.0 && self.upscale;
        let resized = if scale < 1.0 || upscaled {
            let new_width = ((width as f64 * scale).round() as u32).max(1);
            let new_height = ((height as f64 * scale).round() as u32).max(1);
            debug!(width, height, new_width, new_height, "Resizing input");
            image.resize_exact(new_width, new_height, FilterType::Triangle)
        } else {
            image.clone()
        };

        let mut working = if resized.color().has_color() {
            Working::Rgb(resized.to_rgb8())
        } else {
            Working::Gray(resized.to_luma8())
        };

        if self.denoise_radius > 0 {
            let r = self.denoise_radius;
            working = match working {
                Working::Gray(img) => Working::Gray(imageproc::filter::median_filter(&img, r, r)),
                Working::Rgb(img) => Working::Rgb(imageproc::filter::median_filter(&img, r, r)),
            };
        }

        // Resampling softens edges; compensate with an unsharp mask
        if upscaled && self.sharpen_sigma > 0.0 {
            match &mut working {
                Working::Gray(img) => {
                    let blurred = imageproc::filter::gaussian_blur_f32(img, self.sharpen_sigma);
                    add_weighted(img, &blurred);
                }
                Working::Rgb(img) => {
                    let blurred = imageproc::filter::gaussian_blur_f32(img, self.sharpen_sigma);
                    add_weighted(img, &blurred);
                }
            }
        }

        Ok(match working {
            Working::Gray(img) => img,
            Working::Rgb(img) => DynamicImage::ImageRgb8(img).to_luma8(),
        })
    }
}

/// `1.5 * original - 0.5 * blurred`, saturated to the u8 range
fn add_weighted(original: &mut [u8], blurred: &[u8]) {
    for (p, b) in original.iter_mut().zip(blurred) {
        let value = 1.5 * *p as f32 - 0.5 * *b as f32;
        *p = value.round().clamp(0.0, 255.0) as u8;
    }
}
