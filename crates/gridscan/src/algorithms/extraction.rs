use geo_types::{Coord, LineString};
use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};

use crate::{
    error::Result,
    traits::ContourExtractor,
    types::{BoundingBox, ContourRegion},
};

/// Imageproc-based contour extractor with a two-level hierarchy.
///
/// Outer borders are parents, the holes directly inside them are their
/// children, and holes never have children. A region is a leaf when it has
/// no children: every hole, and every outer border without a hole.
#[derive(Debug, Clone)]
pub struct ImageprocContourExtractor {
    /// Douglas-Peucker tolerance applied before taking the bounding box
    pub epsilon: f32,
}

impl Default for ImageprocContourExtractor {
    fn default() -> Self {
        Self { epsilon: 3.0 }
    }
}

impl ContourExtractor for ImageprocContourExtractor {
    fn extract_regions(&self, binary_image: &GrayImage) -> Result<Vec<ContourRegion>> {
        let contours = find_contours::<i32>(binary_image);

        let mut encloses_hole = vec![false; contours.len()];
        for contour in &contours {
            if contour.border_type == BorderType::Hole {
                if let Some(parent) = contour.parent {
                    encloses_hole[parent] = true;
                }
            }
        }

        let regions = contours
            .into_iter()
            .enumerate()
            .filter_map(|(i, contour)| {
                let points: Vec<[f32; 2]> = contour
                    .points
                    .iter()
                    .map(|p| [p.x as f32, p.y as f32])
                    .collect();
                let bounds = BoundingBox::from_points(&simplify(&points, self.epsilon))?;
                Some(ContourRegion {
                    points,
                    bounds,
                    border_type: contour.border_type,
                    has_children: contour.border_type == BorderType::Outer && encloses_hole[i],
                })
            })
            .collect();

        Ok(regions)
    }

    fn count_regions(&self, binary_image: &GrayImage) -> Result<usize> {
        Ok(find_contours::<i32>(binary_image).len())
    }
}

/// Douglas-Peucker simplification using geo crate's implementation
pub fn simplify(points: &[[f32; 2]], epsilon: f32) -> Vec<[f32; 2]> {
    use geo::Simplify;

    if epsilon <= 0.0 || points.len() < 3 {
        return points.to_vec();
    }
    let coords: Vec<Coord<f32>> = points.iter().map(|&[x, y]| Coord { x, y }).collect();
    LineString::new(coords)
        .simplify(&epsilon)
        .coords()
        .map(|coord| [coord.x, coord.y])
        .collect()
}
