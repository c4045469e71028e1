use image::GrayImage;
use tracing::{debug, info};

use crate::{
    config::{CellOrder, ScanConfig, TableSelection},
    error::{GridScanError, Result},
    traits::ContourExtractor,
    types::TableCandidate,
};

/// A selected table region together with its pixels
#[derive(Debug, Clone)]
pub struct LocatedTable {
    pub candidate: TableCandidate,
    /// Crop of the normalized image under the candidate's bounding box
    pub image: GrayImage,
}

/// Finds the ruled table among the regions of the line mask.
///
/// A region qualifies when it encloses another contour, its area is at least
/// `min_area`, and more than `min_joints` joint blobs fall inside its
/// bounding box. A plain framed picture has only its four corner joints.
#[derive(Debug, Clone)]
pub struct TableLocator {
    pub min_area: f64,
    pub min_joints: usize,
    pub selection: TableSelection,
}

impl Default for TableLocator {
    fn default() -> Self {
        Self::from_config(&ScanConfig::default())
    }
}

impl TableLocator {
    pub fn from_config(config: &ScanConfig) -> Self {
        Self {
            min_area: config.min_table_area,
            min_joints: config.min_joints,
            selection: config.table_selection,
        }
    }

    /// Regions passing every filter, in contour discovery order. With
    /// `FirstQualifying` the scan stops after the first hit.
    pub fn candidates(
        &self,
        combined: &GrayImage,
        joints: &GrayImage,
        extractor: &dyn ContourExtractor,
    ) -> Result<Vec<TableCandidate>> {
        let regions = extractor.extract_regions(combined)?;
        debug!(regions = regions.len(), "Line mask regions");

        let mut candidates = Vec::new();
        for region in regions {
            if region.is_leaf() {
                continue;
            }

            let area = region.area();
            if area < self.min_area {
                debug!(area, "Dropping line fragment");
                continue;
            }

            let joint_count = match region.bounds.crop(joints) {
                Some(roi) => extractor.count_regions(&roi)?,
                None => 0,
            };
            if joint_count <= self.min_joints {
                debug!(joint_count, bounds = ?region.bounds, "Too few joints for a table");
                continue;
            }

            candidates.push(TableCandidate {
                region,
                joints: joint_count,
                area,
            });
            if self.selection == TableSelection::FirstQualifying {
                break;
            }
        }

        Ok(candidates)
    }

    /// Pick one table according to the selection policy and crop it out of `normalized`
    pub fn locate(
        &self,
        combined: &GrayImage,
        joints: &GrayImage,
        normalized: &GrayImage,
        extractor: &dyn ContourExtractor,
    ) -> Result<LocatedTable> {
        let mut candidates = self.candidates(combined, joints, extractor)?;
        if self.selection == TableSelection::LargestArea {
            CellOrder::AreaDescending.sort(&mut candidates, 0);
        }

        let candidate = candidates
            .into_iter()
            .next()
            .ok_or(GridScanError::NoTableFound)?;
        let image = candidate
            .region
            .bounds
            .crop(normalized)
            .ok_or(GridScanError::NoTableFound)?;

        info!(
            bounds = ?candidate.region.bounds,
            joints = candidate.joints,
            area = candidate.area,
            "Table located"
        );
        Ok(LocatedTable { candidate, image })
    }
}
