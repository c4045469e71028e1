use image::{GrayImage, Luma};
use imageproc::map::map_colors2;
use tracing::debug;

use crate::config::ScanConfig;

/// Masks derived from one binarized screenshot. All share the input size.
#[derive(Debug, Clone)]
pub struct LineMasks {
    /// Inverted adaptive threshold: ink is white
    pub binary: GrayImage,
    pub horizontal: GrayImage,
    pub vertical: GrayImage,
    /// Union of both line masks
    pub combined: GrayImage,
    /// Intersection of both line masks (grid joints)
    pub joints: GrayImage,
}

/// Separates long straight rulings from text by directional morphology
#[derive(Debug, Clone)]
pub struct LineExtractor {
    pub scale: u32,
    pub block_radius: u32,
    pub offset: u8,
}

impl Default for LineExtractor {
    fn default() -> Self {
        Self::from_config(&ScanConfig::default())
    }
}

impl LineExtractor {
    pub fn from_config(config: &ScanConfig) -> Self {
        Self {
            scale: config.morph_scale,
            block_radius: config.threshold_block_radius,
            offset: config.threshold_offset,
        }
    }

    pub fn extract(&self, gray: &GrayImage) -> LineMasks {
        let binary = adaptive_threshold_inverted(gray, self.block_radius, self.offset);

        let scale = self.scale.max(1);
        let horizontal_size = (binary.width() / scale).max(1);
        let vertical_size = (binary.height() / scale).max(1);
        debug!(horizontal_size, vertical_size, "Line structuring elements");

        let horizontal = open_with_line(&binary, horizontal_size, Axis::Horizontal);
        let vertical = open_with_line(&binary, vertical_size, Axis::Vertical);

        let combined = map_colors2(&horizontal, &vertical, |a: Luma<u8>, b: Luma<u8>| Luma([a[0].max(b[0])]));
        let joints = map_colors2(&horizontal, &vertical, |a: Luma<u8>, b: Luma<u8>| Luma([a[0].min(b[0])]));

        LineMasks {
            binary,
            horizontal,
            vertical,
            combined,
            joints,
        }
    }
}

/// Mean-C adaptive threshold of the inverted image.
///
/// A pixel of `255 - gray` becomes 255 when it exceeds the mean of its
/// `(2 * block_radius + 1)²` neighbourhood by more than `offset`, else 0.
/// Flat areas therefore stay black whatever their brightness.
pub fn adaptive_threshold_inverted(gray: &GrayImage, block_radius: u32, offset: u8) -> GrayImage {
    let mut inverted = gray.clone();
    image::imageops::invert(&mut inverted);
    let means = imageproc::filter::box_filter(&inverted, block_radius, block_radius);

    map_colors2(&inverted, &means, |p: Luma<u8>, mean: Luma<u8>| {
        if p[0] as u16 > mean[0] as u16 + offset as u16 {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Horizontal,
    Vertical,
}

/// Binary opening with a `length`-pixel line element along `axis`.
///
/// Erosion followed by dilation with a line segment keeps exactly the
/// foreground runs along that axis that are at least `length` long, so it is
/// computed from run lengths directly.
fn open_with_line(binary: &GrayImage, length: u32, axis: Axis) -> GrayImage {
    let (width, height) = binary.dimensions();
    let mut out = GrayImage::new(width, height);
    let (lanes, lane_len) = match axis {
        Axis::Horizontal => (height, width),
        Axis::Vertical => (width, height),
    };
    let at = |lane: u32, i: u32| match axis {
        Axis::Horizontal => (i, lane),
        Axis::Vertical => (lane, i),
    };
    let is_on = |lane: u32, i: u32| {
        let (x, y) = at(lane, i);
        binary.get_pixel(x, y)[0] != 0
    };

    for lane in 0..lanes {
        let mut i = 0;
        while i < lane_len {
            if !is_on(lane, i) {
                i += 1;
                continue;
            }
            let start = i;
            while i < lane_len && is_on(lane, i) {
                i += 1;
            }
            if i - start >= length {
                for j in start..i {
                    let (x, y) = at(lane, j);
                    out.put_pixel(x, y, Luma([255]));
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{draw_grid, white_canvas};
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    fn lit(img: &GrayImage) -> usize {
        img.pixels().filter(|p| p[0] != 0).count()
    }

    #[test]
    fn flat_image_has_no_foreground() {
        let gray = GrayImage::from_pixel(60, 60, Luma([180]));
        assert_eq!(lit(&adaptive_threshold_inverted(&gray, 7, 2)), 0);
    }

    #[test]
    fn dark_strokes_become_foreground() {
        let mut gray = white_canvas(60, 60);
        draw_filled_rect_mut(&mut gray, Rect::at(10, 30).of_size(40, 2), Luma([0]));
        let bw = adaptive_threshold_inverted(&gray, 7, 2);
        assert_eq!(bw.get_pixel(20, 30)[0], 255);
        assert_eq!(bw.get_pixel(20, 10)[0], 0);
        assert_eq!(lit(&bw), 80);
    }

    #[test]
    fn opening_keeps_only_long_runs() {
        let mut bw = GrayImage::new(100, 20);
        draw_filled_rect_mut(&mut bw, Rect::at(0, 5).of_size(80, 1), Luma([255]));
        draw_filled_rect_mut(&mut bw, Rect::at(10, 12).of_size(6, 1), Luma([255]));

        let opened = open_with_line(&bw, 20, Axis::Horizontal);
        assert_eq!(lit(&opened), 80);
        assert_eq!(opened.get_pixel(12, 12)[0], 0);

        let vertical = open_with_line(&bw, 3, Axis::Vertical);
        assert_eq!(lit(&vertical), 0);
    }

    #[test]
    fn grid_yields_joints_at_intersections() {
        let mut gray = white_canvas(300, 200);
        // 2x2 grid: 3 vertical and 3 horizontal rulings
        draw_grid(&mut gray, 50, 40, &[80, 120], &[50, 60], 3);

        let masks = LineExtractor::default().extract(&gray);
        let joint_pixels = lit(&masks.joints);
        assert_eq!(joint_pixels, 9 * 9);
        assert!(lit(&masks.combined) > lit(&masks.horizontal));
        assert!(lit(&masks.combined) > lit(&masks.vertical));
        assert_eq!(masks.joints.get_pixel(51, 41)[0], 255);
    }

    #[test]
    fn text_strokes_do_not_survive() {
        let mut gray = white_canvas(300, 200);
        // short glyph-sized blobs
        for i in 0..5 {
            draw_filled_rect_mut(&mut gray, Rect::at(20 + i * 12, 50).of_size(8, 6), Luma([0]));
        }
        let masks = LineExtractor::default().extract(&gray);
        assert_eq!(lit(&masks.combined), 0);
    }
}
