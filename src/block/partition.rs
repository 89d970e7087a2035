use super::matrix::{BlockMatrix, DenseMatrix, SparseMatrix};
use crate::{Error, Graph};
use serde::{Deserialize, Serialize};

/**
A labeling of a graph's `N` vertices into `B` blocks, together with the
aggregate statistics that every phase of the algorithm reads from rather
than recomputing from the vertex-level graph: the inter-block edge-count
matrix `M`, and per-block in/out/total degree vectors.
*/
#[derive(Debug)]
pub struct Partition {
    assignment: Vec<usize>,
    matrix: Box<dyn BlockMatrix>,
    degrees_out: Vec<u64>,
    degrees_in: Vec<u64>,
    degrees: Vec<u64>,
    num_blocks: usize,
}

impl Clone for Partition {
    fn clone(&self) -> Partition {
        Partition {
            assignment: self.assignment.clone(),
            matrix: self.matrix.drop_blocks(&[]),
            degrees_out: self.degrees_out.clone(),
            degrees_in: self.degrees_in.clone(),
            degrees: self.degrees.clone(),
            num_blocks: self.num_blocks,
        }
    }
}

impl Partition {
    /// Every vertex its own singleton block: `B == N`.
    pub fn singleton(graph: &Graph) -> Partition {
        let n = graph.num_vertices();
        let assignment: Vec<usize> = (0..n).collect();
        let matrix: Box<dyn BlockMatrix> = if n > 4096 {
            Box::new(SparseMatrix::zeros(n))
        } else {
            Box::new(DenseMatrix::zeros(n))
        };
        let mut partition = Partition {
            assignment,
            matrix,
            degrees_out: vec![0; n],
            degrees_in: vec![0; n],
            degrees: vec![0; n],
            num_blocks: n,
        };
        partition.initialize_edge_counts(graph);
        partition
    }

    /// A partition over an explicit assignment (one block id per vertex,
    /// blocks numbered densely `0..B`), used to resume from a checkpoint or
    /// to build the partition that results from a completed merge pass.
    pub fn from_assignment(graph: &Graph, assignment: Vec<usize>, sparse: bool) -> Result<Partition, Error> {
        if assignment.len() != graph.num_vertices() {
            return Err(Error::invalid_graph(format!(
                "assignment has {} entries, expected {}",
                assignment.len(),
                graph.num_vertices()
            )));
        }
        let num_blocks = assignment.iter().copied().max().map(|m| m + 1).unwrap_or(0);
        for &b in &assignment {
            if b >= num_blocks {
                return Err(Error::invalid_index(
                    "assignment is not densely numbered 0..B",
                ));
            }
        }
        let matrix: Box<dyn BlockMatrix> = if sparse {
            Box::new(SparseMatrix::zeros(num_blocks))
        } else {
            Box::new(DenseMatrix::zeros(num_blocks))
        };
        let mut partition = Partition {
            assignment,
            matrix,
            degrees_out: vec![0; num_blocks],
            degrees_in: vec![0; num_blocks],
            degrees: vec![0; num_blocks],
            num_blocks,
        };
        partition.initialize_edge_counts(graph);
        Ok(partition)
    }

    /// Recomputes `M` and the degree vectors from scratch by scanning every
    /// edge of `graph` once and bucketing it by the endpoints' current block
    /// assignment. Called once per `Partition` construction; the per-move
    /// kernels in `edge_update.rs` maintain these incrementally afterward.
    fn initialize_edge_counts(&mut self, graph: &Graph) {
        let mut updates = Vec::with_capacity(graph.num_edges() as usize);
        for v in 0..graph.num_vertices() {
            let block_v = self.assignment[v];
            for &(u, weight) in graph.out_neighbors(v) {
                let block_u = self.assignment[u];
                updates.push((block_v, block_u, weight as i64));
            }
        }
        self.matrix.apply_updates(&updates).expect("indices from a valid assignment are always in range");
        for b in 0..self.num_blocks {
            self.degrees_out[b] = self.matrix.row_sum(b);
            self.degrees_in[b] = self.matrix.col_sum(b);
            self.degrees[b] = self.degrees_out[b] + self.degrees_in[b];
        }
    }

    pub fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    pub fn assignment(&self) -> &[usize] {
        &self.assignment
    }

    pub fn block_of(&self, vertex: usize) -> usize {
        self.assignment[vertex]
    }

    pub fn matrix(&self) -> &dyn BlockMatrix {
        self.matrix.as_ref()
    }

    pub(crate) fn matrix_mut(&mut self) -> &mut dyn BlockMatrix {
        self.matrix.as_mut()
    }

    pub fn degree_out(&self, block: usize) -> u64 {
        self.degrees_out[block]
    }

    pub fn degree_in(&self, block: usize) -> u64 {
        self.degrees_in[block]
    }

    pub fn degree(&self, block: usize) -> u64 {
        self.degrees[block]
    }

    pub(crate) fn set_block(&mut self, vertex: usize, block: usize) {
        self.assignment[vertex] = block;
    }

    pub(crate) fn set_degrees(&mut self, block: usize, out: u64, in_: u64) {
        self.degrees_out[block] = out;
        self.degrees_in[block] = in_;
        self.degrees[block] = out + in_;
    }

    /// I1 (degree vectors agree with `M`'s row/col sums), I2 (`M` sums to
    /// `num_edges`) and I3 (`M` has no negative entry), checked together.
    /// Meant to run inside `debug_assert!` right after a committed move, so
    /// release builds never pay for it.
    pub(crate) fn invariants_hold(&self, num_edges: u64) -> bool {
        for block in 0..self.num_blocks {
            if self.matrix.row_sum(block) != self.degrees_out[block] {
                return false;
            }
            if self.matrix.col_sum(block) != self.degrees_in[block] {
                return false;
            }
        }
        self.matrix.total_sum() == num_edges && self.matrix.check_nonnegative().is_ok()
    }

    /**
    The overall description-length entropy S of this partition (§4.2): model
    entropy `E * h(B^2/E) + N ln B` plus data entropy
    `-sum M[i,j] ln(M[i,j] / (d_out[i] * d_in[j]))` over nonzero entries of M.
    Lower is better; the golden-section driver searches for the B minimizing
    this value.
    */
    pub fn overall_entropy(&self, num_vertices: usize, num_edges: u64) -> f64 {
        let e = num_edges as f64;
        let n = num_vertices as f64;
        let b = self.num_blocks as f64;

        let mut data_entropy = 0.0;
        for row in 0..self.num_blocks {
            for (col, count) in self.matrix.row(row) {
                if count == 0 {
                    continue;
                }
                let m = count as f64;
                let denom = self.degrees_out[row] as f64 * self.degrees_in[col] as f64;
                data_entropy -= m * (m / denom).ln();
            }
        }

        // E * h(B^2/E) has a removable singularity at E == 0 (an edgeless
        // graph has nothing for the data term to describe); h's own x == 0
        // branch does not apply here since the singularity is in the E
        // multiplying it, not in x itself.
        let model_entropy = if e == 0.0 { n * b.ln() } else { e * h((b * b) / e) + n * b.ln() };
        model_entropy + data_entropy
    }

    /// A serializable snapshot of this partition for persisting driver state
    /// between runs (§6.4): full assignment, nonzero `M` entries, and both
    /// degree vectors. `sparse` records which `BlockMatrix` backend
    /// `restore` should reconstruct.
    pub fn checkpoint(&self, sparse: bool) -> PartitionCheckpoint {
        let mut matrix_entries = Vec::new();
        for row in 0..self.num_blocks {
            for (col, count) in self.matrix.row(row) {
                matrix_entries.push((row, col, count));
            }
        }
        PartitionCheckpoint {
            assignment: self.assignment.clone(),
            matrix_entries,
            degrees_out: self.degrees_out.clone(),
            degrees_in: self.degrees_in.clone(),
            num_blocks: self.num_blocks,
            sparse,
        }
    }

    /// Reconstructs a `Partition` from a `checkpoint` produced by
    /// `checkpoint`, without rescanning the original graph.
    pub fn restore(checkpoint: PartitionCheckpoint) -> Result<Partition, Error> {
        let num_blocks = checkpoint.num_blocks;
        if checkpoint.assignment.iter().any(|&b| b >= num_blocks) {
            return Err(Error::invalid_index(
                "checkpoint assignment references a block outside 0..num_blocks",
            ));
        }
        if checkpoint.degrees_out.len() != num_blocks || checkpoint.degrees_in.len() != num_blocks {
            return Err(Error::invalid_index(
                "checkpoint degree vectors do not match num_blocks",
            ));
        }
        let mut matrix: Box<dyn BlockMatrix> = if checkpoint.sparse {
            Box::new(SparseMatrix::zeros(num_blocks))
        } else {
            Box::new(DenseMatrix::zeros(num_blocks))
        };
        let updates: Vec<(usize, usize, i64)> = checkpoint
            .matrix_entries
            .iter()
            .map(|&(row, col, count)| (row, col, count as i64))
            .collect();
        matrix.apply_updates(&updates)?;

        let degrees = checkpoint
            .degrees_out
            .iter()
            .zip(checkpoint.degrees_in.iter())
            .map(|(&out, &in_)| out + in_)
            .collect();

        Ok(Partition {
            assignment: checkpoint.assignment,
            matrix,
            degrees_out: checkpoint.degrees_out,
            degrees_in: checkpoint.degrees_in,
            degrees,
            num_blocks,
        })
    }
}

/// The serialized form of a `Partition` (§6.4). Serialization itself (to
/// disk, to a database) is left to the caller via serde.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionCheckpoint {
    pub assignment: Vec<usize>,
    pub matrix_entries: Vec<(usize, usize, u64)>,
    pub degrees_out: Vec<u64>,
    pub degrees_in: Vec<u64>,
    pub num_blocks: usize,
    pub sparse: bool,
}

/// `h(x) = (1 + x) ln(1 + x) - x ln(x)`, the binary-entropy-like term in the
/// model entropy (§4.2). `x` is always `> 0` here (`B >= 1`, `E >= 1`), so no
/// `x == 0` special case is needed.
pub(crate) fn h(x: f64) -> f64 {
    (1.0 + x) * (1.0 + x).ln() - x * x.ln()
}

#[cfg(test)]
mod tests {

    use super::*;

    fn triangle() -> Graph {
        Graph::from_edges(3, &[(0, 1, 1), (1, 2, 1), (2, 0, 1)]).unwrap()
    }

    #[test]
    fn test_singleton_partition() {
        let graph = triangle();
        let partition = Partition::singleton(&graph);
        assert_eq!(partition.num_blocks(), 3);
        assert_eq!(partition.assignment(), &[0, 1, 2]);
        assert_eq!(partition.matrix().total_sum(), 3);
        assert_eq!(partition.degree_out(0), 1);
        assert_eq!(partition.degree_in(0), 1);
    }

    #[test]
    fn test_invariants_hold_for_singleton_and_merged_partitions() {
        let graph = triangle();
        assert!(Partition::singleton(&graph).invariants_hold(graph.num_edges()));
        let merged = Partition::from_assignment(&graph, vec![0, 0, 1], false).unwrap();
        assert!(merged.invariants_hold(graph.num_edges()));
    }

    #[test]
    fn test_from_assignment_merges_edge_counts() {
        let graph = triangle();
        let partition = Partition::from_assignment(&graph, vec![0, 0, 1], false).unwrap();
        assert_eq!(partition.num_blocks(), 2);
        // 0->1 and 1->2 collapse to a self-loop on block 0 plus 0->1; 2->0 is 1->0.
        assert_eq!(partition.matrix().get(0, 0), 1);
        assert_eq!(partition.matrix().get(0, 1), 1);
        assert_eq!(partition.matrix().get(1, 0), 1);
    }

    #[test]
    fn test_from_assignment_rejects_sparse_numbering() {
        let graph = triangle();
        let err = Partition::from_assignment(&graph, vec![0, 0, 2], false).unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::InvalidIndex);
    }

    #[test]
    fn test_overall_entropy_singleton_vs_merged() {
        let graph = triangle();
        let singleton = Partition::singleton(&graph);
        let merged = Partition::from_assignment(&graph, vec![0, 0, 1], false).unwrap();
        let s_singleton = singleton.overall_entropy(3, 3);
        let s_merged = merged.overall_entropy(3, 3);
        assert!(s_singleton.is_finite());
        assert!(s_merged.is_finite());
    }

    #[test]
    fn test_h_is_symmetric_around_small_values() {
        assert!((h(1.0) - (2.0 * 2f64.ln())).abs() < 1e-9);
    }

    #[test]
    fn test_overall_entropy_finite_for_edgeless_graph() {
        let graph = Graph::empty(4).unwrap();
        let partition = Partition::singleton(&graph);
        let s = partition.overall_entropy(4, 0);
        assert!(s.is_finite());
        assert_eq!(s, 4.0 * 4f64.ln());
    }

    #[test]
    fn test_checkpoint_roundtrip() {
        let graph = triangle();
        let partition = Partition::from_assignment(&graph, vec![0, 0, 1], false).unwrap();
        let checkpoint = partition.checkpoint(false);
        let restored = Partition::restore(checkpoint).unwrap();
        assert_eq!(restored.assignment(), partition.assignment());
        assert_eq!(restored.num_blocks(), partition.num_blocks());
        for b in 0..partition.num_blocks() {
            assert_eq!(restored.degree_out(b), partition.degree_out(b));
            assert_eq!(restored.degree_in(b), partition.degree_in(b));
        }
        assert_eq!(restored.matrix().total_sum(), partition.matrix().total_sum());
    }

    #[test]
    fn test_restore_rejects_out_of_range_assignment() {
        let checkpoint = PartitionCheckpoint {
            assignment: vec![0, 2],
            matrix_entries: vec![],
            degrees_out: vec![0, 0],
            degrees_in: vec![0, 0],
            num_blocks: 2,
            sparse: false,
        };
        let err = Partition::restore(checkpoint).unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::InvalidIndex);
    }
}
