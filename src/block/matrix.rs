use crate::{Error, ErrorKind};
use ndarray::Array2;
use std::collections::HashMap;

/**
A B×B matrix of nonnegative inter-block edge counts, `M[i][j]` being the
total weight of edges from block `i` to block `j` (self-loops land on the
diagonal). Two backends implement this trait — `DenseMatrix` and
`SparseMatrix` — selected at construction by `DriverConfig::sparse` (§4.1/§9);
neither changes the sequence of partitions the driver produces, only memory
use as `B` shrinks from `N` toward the optimum.
*/
pub trait BlockMatrix: std::fmt::Debug + Send + Sync {
    /// Number of blocks `B`, i.e. the matrix is `B x B`.
    fn num_blocks(&self) -> usize;

    fn get(&self, row: usize, col: usize) -> u64;

    fn set(&mut self, row: usize, col: usize, value: u64);

    /// Row `row`'s nonzero `(col, count)` entries.
    fn row(&self, row: usize) -> Vec<(usize, u64)>;

    /// Column `col`'s nonzero `(row, count)` entries.
    fn col(&self, col: usize) -> Vec<(usize, u64)>;

    fn row_sum(&self, row: usize) -> u64 {
        self.row(row).iter().map(|(_, v)| v).sum()
    }

    fn col_sum(&self, col: usize) -> u64 {
        self.col(col).iter().map(|(_, v)| v).sum()
    }

    /// Sum of every entry, i.e. `E` when `M` accounts for the whole graph.
    fn total_sum(&self) -> u64 {
        (0..self.num_blocks()).map(|r| self.row_sum(r)).sum()
    }

    /// Applies a batch of `(row, col, delta)` updates, each `delta` added to
    /// the existing entry (`delta` may be negative, encoded as `i64`).
    fn apply_updates(&mut self, updates: &[(usize, usize, i64)]) -> Result<(), Error>;

    /// Returns a clone with row/col `block` removed entirely (used after a
    /// block has been fully merged away and the block-merge phase compacts
    /// the B x B matrix down to `B - B_to_merge` blocks). Implementations
    /// renumber the remaining blocks to `0..B-1`, preserving relative order.
    fn drop_blocks(&self, dropped: &[usize]) -> Box<dyn BlockMatrix>;

    /// Debug-only check that every entry is nonnegative; `InvariantViolation`
    /// on the first negative entry found.
    fn check_nonnegative(&self) -> Result<(), Error> {
        for row in 0..self.num_blocks() {
            for (col, value) in self.row(row) {
                if (value as i64) < 0 {
                    return Err(Error::invariant_violation(format!(
                        "M[{}][{}] = {} is negative",
                        row, col, value
                    )));
                }
            }
        }
        Ok(())
    }
}

fn check_index(index: usize, bound: usize) -> Result<(), Error> {
    if index >= bound {
        return Err(Error::invalid_index(format!(
            "block index {} is out of range 0..{}",
            index, bound
        )));
    }
    Ok(())
}

/// `ndarray::Array2<u64>`-backed `BlockMatrix`, used when `B` stays small
/// relative to `N` and a contiguous dense layout pays off.
#[derive(Debug, Clone)]
pub struct DenseMatrix {
    data: Array2<i64>,
}

impl DenseMatrix {
    pub fn zeros(num_blocks: usize) -> DenseMatrix {
        DenseMatrix {
            data: Array2::zeros((num_blocks, num_blocks)),
        }
    }
}

impl BlockMatrix for DenseMatrix {
    fn num_blocks(&self) -> usize {
        self.data.nrows()
    }

    fn get(&self, row: usize, col: usize) -> u64 {
        self.data[[row, col]].max(0) as u64
    }

    fn set(&mut self, row: usize, col: usize, value: u64) {
        self.data[[row, col]] = value as i64;
    }

    fn row(&self, row: usize) -> Vec<(usize, u64)> {
        self.data
            .row(row)
            .iter()
            .enumerate()
            .filter(|(_, &v)| v != 0)
            .map(|(col, &v)| (col, v as u64))
            .collect()
    }

    fn col(&self, col: usize) -> Vec<(usize, u64)> {
        self.data
            .column(col)
            .iter()
            .enumerate()
            .filter(|(_, &v)| v != 0)
            .map(|(row, &v)| (row, v as u64))
            .collect()
    }

    fn apply_updates(&mut self, updates: &[(usize, usize, i64)]) -> Result<(), Error> {
        let b = self.num_blocks();
        for &(row, col, delta) in updates {
            check_index(row, b)?;
            check_index(col, b)?;
            self.data[[row, col]] += delta;
        }
        Ok(())
    }

    fn drop_blocks(&self, dropped: &[usize]) -> Box<dyn BlockMatrix> {
        let b = self.num_blocks();
        let keep: Vec<usize> = (0..b).filter(|i| !dropped.contains(i)).collect();
        let mut out = DenseMatrix::zeros(keep.len());
        for (new_row, &old_row) in keep.iter().enumerate() {
            for (new_col, &old_col) in keep.iter().enumerate() {
                let v = self.data[[old_row, old_col]];
                if v != 0 {
                    out.data[[new_row, new_col]] = v;
                }
            }
        }
        Box::new(out)
    }
}

/// Sparse `BlockMatrix`, a `HashMap<(row, col), u64>` overlay over the
/// logical `B x B` extent, used once the merge phase has shrunk `B` enough
/// that most entries are structurally zero.
#[derive(Debug, Clone)]
pub struct SparseMatrix {
    num_blocks: usize,
    entries: HashMap<(usize, usize), i64>,
}

impl SparseMatrix {
    pub fn zeros(num_blocks: usize) -> SparseMatrix {
        SparseMatrix {
            num_blocks,
            entries: HashMap::new(),
        }
    }
}

impl BlockMatrix for SparseMatrix {
    fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    fn get(&self, row: usize, col: usize) -> u64 {
        self.entries.get(&(row, col)).copied().unwrap_or(0).max(0) as u64
    }

    fn set(&mut self, row: usize, col: usize, value: u64) {
        if value == 0 {
            self.entries.remove(&(row, col));
        } else {
            self.entries.insert((row, col), value as i64);
        }
    }

    fn row(&self, row: usize) -> Vec<(usize, u64)> {
        self.entries
            .iter()
            .filter(|(&(r, _), &v)| r == row && v != 0)
            .map(|(&(_, c), &v)| (c, v as u64))
            .collect()
    }

    fn col(&self, col: usize) -> Vec<(usize, u64)> {
        self.entries
            .iter()
            .filter(|(&(_, c), &v)| c == col && v != 0)
            .map(|(&(r, _), &v)| (r, v as u64))
            .collect()
    }

    fn apply_updates(&mut self, updates: &[(usize, usize, i64)]) -> Result<(), Error> {
        for &(row, col, delta) in updates {
            check_index(row, self.num_blocks)?;
            check_index(col, self.num_blocks)?;
            let entry = self.entries.entry((row, col)).or_insert(0);
            *entry += delta;
            if *entry == 0 {
                self.entries.remove(&(row, col));
            }
        }
        Ok(())
    }

    fn drop_blocks(&self, dropped: &[usize]) -> Box<dyn BlockMatrix> {
        let keep: Vec<usize> = (0..self.num_blocks).filter(|i| !dropped.contains(i)).collect();
        let renumber: HashMap<usize, usize> = keep
            .iter()
            .enumerate()
            .map(|(new, &old)| (old, new))
            .collect();
        let mut out = SparseMatrix::zeros(keep.len());
        for (&(row, col), &v) in self.entries.iter() {
            if let (Some(&new_row), Some(&new_col)) = (renumber.get(&row), renumber.get(&col)) {
                if v != 0 {
                    out.entries.insert((new_row, new_col), v);
                }
            }
        }
        Box::new(out)
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    fn exercise(mut matrix: Box<dyn BlockMatrix>) {
        matrix.apply_updates(&[(0, 1, 5), (1, 0, 2), (2, 2, 3)]).unwrap();
        assert_eq!(matrix.get(0, 1), 5);
        assert_eq!(matrix.get(1, 0), 2);
        assert_eq!(matrix.row(0), vec![(1, 5)]);
        assert_eq!(matrix.col(0), vec![(1, 2)]);
        assert_eq!(matrix.row_sum(0), 5);
        assert_eq!(matrix.total_sum(), 10);
        matrix.apply_updates(&[(0, 1, -5)]).unwrap();
        assert_eq!(matrix.get(0, 1), 0);
        assert!(matrix.check_nonnegative().is_ok());
    }

    #[test]
    fn test_dense_matrix() {
        exercise(Box::new(DenseMatrix::zeros(3)));
    }

    #[test]
    fn test_sparse_matrix() {
        exercise(Box::new(SparseMatrix::zeros(3)));
    }

    #[test]
    fn test_out_of_range_update() {
        let mut matrix = DenseMatrix::zeros(2);
        let err = matrix.apply_updates(&[(5, 0, 1)]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidIndex);
    }

    #[test]
    fn test_drop_blocks_renumbers() {
        let mut matrix = DenseMatrix::zeros(3);
        matrix.apply_updates(&[(0, 2, 7), (2, 0, 4)]).unwrap();
        let dropped = matrix.drop_blocks(&[1]);
        assert_eq!(dropped.num_blocks(), 2);
        assert_eq!(dropped.get(0, 1), 7);
        assert_eq!(dropped.get(1, 0), 4);
    }

    #[test]
    fn test_dense_sparse_agree() {
        let mut dense = DenseMatrix::zeros(4);
        let mut sparse = SparseMatrix::zeros(4);
        let updates = [(0, 1, 3), (1, 2, 6), (2, 3, 1), (3, 0, 9)];
        dense.apply_updates(&updates).unwrap();
        sparse.apply_updates(&updates).unwrap();
        for r in 0..4 {
            for c in 0..4 {
                assert_eq!(dense.get(r, c), sparse.get(r, c));
            }
        }
        assert_eq!(dense.total_sum(), sparse.total_sum());
    }
}
