use tracing::debug;

use crate::{
    error::{GridScanError, Result},
    traits::Bounded,
};

/// Splits a reading-ordered cell sequence into a known number of rows
#[derive(Debug, Clone)]
pub struct RowGrouper {
    pub expected_rows: usize,
}

impl RowGrouper {
    pub fn new(expected_rows: usize) -> Self {
        Self { expected_rows }
    }

    /// Row boundaries for `items`: `expected_rows + 1` ascending indices,
    /// starting at 0 and ending at `items.len()`. Row `r` is
    /// `items[splits[r]..splits[r + 1]]`.
    pub fn split<T: Bounded>(&self, items: &[T]) -> Result<Vec<usize>> {
        if self.expected_rows == 0 || items.len() < self.expected_rows {
            return Err(GridScanError::Segmentation {
                cells: items.len(),
                expected_rows: self.expected_rows,
            });
        }
        let ys: Vec<i64> = items.iter().map(|item| item.bounds().y as i64).collect();
        let splits = split_by_largest_gaps(&ys, self.expected_rows);
        debug!(?splits, "Row boundaries");
        Ok(splits)
    }
}

/// Gap-based 1-D clustering.
///
/// Position 0 always starts a row. Of the remaining positions, the `k - 1`
/// with the largest jump from the previous y become row starts. Gaps are
/// ranked by (gap, index), so among equal gaps the later position wins.
/// Requires `ys.len() >= k >= 1`.
pub fn split_by_largest_gaps(ys: &[i64], k: usize) -> Vec<usize> {
    let n = ys.len();
    let mut gaps: Vec<(i64, usize)> = (1..n).map(|i| (ys[i] - ys[i - 1], i)).collect();
    gaps.sort_unstable();

    let mut starts = Vec::with_capacity(k + 1);
    starts.push(0);
    starts.extend(gaps[n - k..].iter().map(|&(_, index)| index));
    starts.push(n);
    starts.sort_unstable();
    starts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{algorithms::TableAssembler, config::CellOrder, types::BoundingBox};

    #[test]
    fn splits_at_largest_jumps() {
        let ys = [10, 11, 9, 60, 61, 62, 120, 118];
        assert_eq!(split_by_largest_gaps(&ys, 3), vec![0, 3, 6, 8]);
    }

    #[test]
    fn single_row_keeps_everything_together() {
        let ys = [10, 40, 90];
        assert_eq!(split_by_largest_gaps(&ys, 1), vec![0, 3]);
    }

    #[test]
    fn one_cell_per_row() {
        let ys = [0, 30, 60];
        assert_eq!(split_by_largest_gaps(&ys, 3), vec![0, 1, 2, 3]);
    }

    #[test]
    fn rows_have_varying_lengths() {
        // header row of one merged cell, then two rows of three
        let ys = [0, 50, 50, 51, 100, 101, 100];
        assert_eq!(split_by_largest_gaps(&ys, 3), vec![0, 1, 4, 7]);
    }

    #[test]
    fn falling_ys_never_empty_the_first_row() {
        // x-ordering inside a row can make every jump negative
        assert_eq!(split_by_largest_gaps(&[52, 50, 49], 2), vec![0, 2, 3]);
        assert_eq!(split_by_largest_gaps(&[52, 50, 49], 3), vec![0, 1, 2, 3]);
    }

    #[test]
    fn produces_expected_row_count() {
        let cells: Vec<BoundingBox> = (0..12)
            .map(|i| BoundingBox::new((i % 4) * 100, (i / 4) * 60 + (i % 2), 90, 50))
            .collect();
        let splits = RowGrouper::new(3).split(&cells).unwrap();
        assert_eq!(splits.len(), 4);
        assert_eq!(splits, vec![0, 4, 8, 12]);
    }

    #[test]
    fn ordered_then_grouped_rows_are_row_major() {
        const TOLERANCE: u32 = 5;
        // three rows of four columns, row origins jittered by up to 2px,
        // fed in scrambled order
        let jitter = [2i32, -2, 1, -1, 0, 2, -1, -2, 1, 0, -2, 2];
        let scramble = [7usize, 2, 10, 0, 5, 11, 3, 8, 1, 6, 9, 4];
        let mut cells: Vec<BoundingBox> = scramble
            .iter()
            .map(|&i| {
                let (row, col) = (i / 4, i % 4);
                let y = (40 + row as i32 * 60 + jitter[i]) as u32;
                BoundingBox::new(col as u32 * 100 + 3, y, 95, 55)
            })
            .collect();

        CellOrder::ReadingOrder.sort(&mut cells, TOLERANCE);
        let splits = RowGrouper::new(3).split(&cells).unwrap();
        let rows = TableAssembler::rows(&cells, &splits);

        assert_eq!(rows.len(), 3);
        for row in &rows {
            assert_eq!(row.len(), 4);
            assert!(row.windows(2).all(|pair| pair[0].x <= pair[1].x), "{row:?}");
        }
        for pair in rows.windows(2) {
            let bottom = pair[0].iter().map(|b| b.y).max().unwrap();
            let top = pair[1].iter().map(|b| b.y).min().unwrap();
            assert!(bottom + TOLERANCE <= top, "{bottom} vs {top}");
        }
    }

    #[test]
    fn too_few_cells_is_a_segmentation_error() {
        let cells: Vec<BoundingBox> = (0..3).map(|i| BoundingBox::new(i * 10, 0, 5, 5)).collect();
        let err = RowGrouper::new(6).split(&cells).unwrap_err();
        assert!(matches!(err, GridScanError::Segmentation { cells: 3, expected_rows: 6 }));
    }
}
