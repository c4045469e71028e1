use geo_types::{Coord, LineString, Polygon};
use image::GrayImage;
use imageproc::contours::BorderType;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Axis-aligned pixel rectangle, inclusive of both edge pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Smallest box covering every point. Returns `None` for an empty slice.
    pub fn from_points(points: &[[f32; 2]]) -> Option<Self> {
        use geo::BoundingRect;

        let line = LineString::new(points.iter().map(|&[x, y]| Coord { x, y }).collect());
        let rect = line.bounding_rect()?;
        let (min, max) = (rect.min(), rect.max());
        let x = min.x.max(0.0).floor() as u32;
        let y = min.y.max(0.0).floor() as u32;
        let right = max.x.max(0.0).floor() as u32;
        let bottom = max.y.max(0.0).floor() as u32;

        Some(Self {
            x,
            y,
            width: right - x + 1,
            height: bottom - y + 1,
        })
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Last column covered by the box.
    pub fn right(&self) -> u32 {
        self.x + self.width.saturating_sub(1)
    }

    /// Last row covered by the box.
    pub fn bottom(&self) -> u32 {
        self.y + self.height.saturating_sub(1)
    }

    /// Clip the box to an image of the given size. `None` when nothing is left.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Self> {
        if self.x >= width || self.y >= height {
            return None;
        }
        Some(Self {
            x: self.x,
            y: self.y,
            width: self.width.min(width - self.x),
            height: self.height.min(height - self.y),
        })
    }

    /// Copy the covered pixels out of `image` (copy-on-crop).
    pub fn crop(&self, image: &GrayImage) -> Option<GrayImage> {
        let clipped = self.clamp_to(image.width(), image.height())?;
        Some(
            image::imageops::crop_imm(image, clipped.x, clipped.y, clipped.width, clipped.height)
                .to_image(),
        )
    }
}

/// A closed contour from the extraction hierarchy.
#[derive(Debug, Clone)]
pub struct ContourRegion {
    /// Boundary points in tracing order
    pub points: Vec<[f32; 2]>,
    /// Bounding box of the (possibly simplified) boundary
    pub bounds: BoundingBox,
    pub border_type: BorderType,
    /// Whether the region encloses another contour (two-level hierarchy)
    pub has_children: bool,
}

impl ContourRegion {
    pub fn to_geo_polygon(&self) -> Polygon<f32> {
        let coords: Vec<Coord<f32>> = self.points.iter().map(|&[x, y]| Coord { x, y }).collect();
        Polygon::new(LineString::new(coords), vec![])
    }

    /// Area enclosed by the boundary polygon.
    pub fn area(&self) -> f64 {
        use geo::Area;
        self.to_geo_polygon().unsigned_area() as f64
    }

    pub fn is_leaf(&self) -> bool {
        !self.has_children
    }
}

/// A line region that qualified as a table.
#[derive(Debug, Clone)]
pub struct TableCandidate {
    pub region: ContourRegion,
    pub joints: usize,
    pub area: f64,
}

/// A leaf contour inside the table plus the pixels it bounds.
#[derive(Debug, Clone)]
pub struct Cell {
    pub region: ContourRegion,
    pub image: GrayImage,
}

/// Row-major matrix of recognized strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Widest row length.
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn into_rows(self) -> Vec<Vec<String>> {
        self.rows
    }

    /// Console rendering: cells separated by `||`, one separator line per row.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for row in &self.rows {
            for cell in row {
                out.push_str(&cell.replace('\n', " "));
                out.push_str(" || ");
            }
            out.push('\n');
            out.push_str("===============\n");
        }
        out
    }
}

/// Everything a scan produced: the table plus the geometry behind it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TableScan {
    pub table: Table,
    /// Table region in normalized-image coordinates
    pub table_bounds: BoundingBox,
    /// Cell boxes in table coordinates, shaped like `table.rows`
    pub cells: Vec<Vec<BoundingBox>>,
    /// Size of the normalized working image
    pub image_width: u32,
    pub image_height: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_from_points_is_inclusive() {
        let points = [[2.0, 3.0], [10.0, 3.0], [10.0, 7.0], [2.0, 7.0]];
        let bounds = BoundingBox::from_points(&points).unwrap();
        assert_eq!(bounds, BoundingBox::new(2, 3, 9, 5));
        assert_eq!(bounds.right(), 10);
        assert_eq!(bounds.bottom(), 7);
        assert_eq!(bounds.area(), 45);
    }

    #[test]
    fn bounding_box_from_no_points() {
        assert!(BoundingBox::from_points(&[]).is_none());
    }

    #[test]
    fn clamp_clips_to_image() {
        let bounds = BoundingBox::new(90, 10, 50, 50);
        assert_eq!(bounds.clamp_to(100, 40), Some(BoundingBox::new(90, 10, 10, 30)));
        assert_eq!(bounds.clamp_to(80, 40), None);
    }

    #[test]
    fn crop_copies_pixels() {
        let mut image = GrayImage::new(20, 20);
        image.put_pixel(5, 6, image::Luma([200]));
        let crop = BoundingBox::new(4, 4, 4, 4).crop(&image).unwrap();
        assert_eq!(crop.dimensions(), (4, 4));
        assert_eq!(crop.get_pixel(1, 2)[0], 200);
    }

    #[test]
    fn region_area_uses_polygon() {
        let region = ContourRegion {
            points: vec![[0.0, 0.0], [10.0, 0.0], [10.0, 5.0], [0.0, 5.0]],
            bounds: BoundingBox::new(0, 0, 11, 6),
            border_type: BorderType::Hole,
            has_children: false,
        };
        assert!((region.area() - 50.0).abs() < 1e-6);
        assert!(region.is_leaf());
    }

    #[test]
    fn render_flattens_newlines() {
        let table = Table {
            rows: vec![
                vec!["Mon\nLab".to_string(), String::new()],
                vec!["Tue".to_string(), "Maths".to_string()],
            ],
        };
        assert_eq!(
            table.render(),
            "Mon Lab ||  || \n===============\nTue || Maths || \n===============\n"
        );
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_count(), 2);
    }
}
