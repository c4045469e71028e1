use crate::types::Table;

/// Folds per-cell results back into rows using the row boundaries
#[derive(Debug, Clone, Default)]
pub struct TableAssembler;

impl TableAssembler {
    /// Row `r` gets `items[splits[r]..splits[r + 1]]`, in order
    pub fn rows<T: Clone>(items: &[T], splits: &[usize]) -> Vec<Vec<T>> {
        splits
            .windows(2)
            .map(|bounds| items[bounds[0]..bounds[1]].to_vec())
            .collect()
    }

    pub fn assemble(texts: &[String], splits: &[usize]) -> Table {
        Table {
            rows: Self::rows(texts, splits),
        }
    }
}
