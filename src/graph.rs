use crate::{Error, ErrorKind};

/**
A read-only directed graph: N vertices numbered `0..N`, and E directed edges
each carrying an integer weight >= 1. Self-loops are permitted.

`Graph` only stores what the partitioning engine needs — per-vertex out/in
adjacency — and does no file I/O. Loading a TSV edge list and normalizing
1-based file ids to this 0-based representation is a caller concern (see
`SPEC_FULL.md` §1 excluded collaborators).

# Examples

```
use sbm_partition::Graph;
let graph = Graph::from_edges(3, &[(0, 1, 1), (1, 2, 2)]).unwrap();
assert_eq!(graph.num_vertices(), 3);
assert_eq!(graph.num_edges(), 2);
```
*/
#[derive(Debug, Clone)]
pub struct Graph {
    out_neighbors: Vec<Vec<(usize, u64)>>,
    in_neighbors: Vec<Vec<(usize, u64)>>,
    num_vertices: usize,
    num_edges: u64,
    true_block_assignment: Option<Vec<usize>>,
}

impl Graph {
    /**
    Builds a `Graph` from an edge list `(from, to, weight)` over vertices
    `0..num_vertices`. Multiple edges between the same ordered pair are kept
    distinct (their weights are not merged) and simply accumulate in both
    adjacency lists, matching the "total weight of edges" accounting in
    spec §3 (the inter-block matrix sums weights, so distinct parallel edges
    and one pre-summed edge are equivalent from the partitioner's view).

    # Errors

    Returns `ErrorKind::InvalidGraph` if `num_vertices` is 0, if any vertex id
    is `>= num_vertices`, or if any weight is 0.
    */
    pub fn from_edges(num_vertices: usize, edges: &[(usize, usize, u64)]) -> Result<Graph, Error> {
        if num_vertices == 0 {
            return Err(Error::invalid_graph("a graph must have at least one vertex"));
        }
        let mut out_neighbors = vec![Vec::new(); num_vertices];
        let mut in_neighbors = vec![Vec::new(); num_vertices];
        let mut num_edges: u64 = 0;
        for &(u, v, weight) in edges {
            if u >= num_vertices || v >= num_vertices {
                return Err(Error::invalid_graph(format!(
                    "edge ({}, {}) references a vertex outside 0..{}",
                    u, v, num_vertices
                )));
            }
            if weight == 0 {
                return Err(Error::invalid_graph(format!(
                    "edge ({}, {}) has weight 0; weights must be >= 1",
                    u, v
                )));
            }
            out_neighbors[u].push((v, weight));
            in_neighbors[v].push((u, weight));
            num_edges += 1;
        }
        Ok(Graph {
            out_neighbors,
            in_neighbors,
            num_vertices,
            num_edges,
            true_block_assignment: None,
        })
    }

    /// An edgeless graph over `num_vertices` vertices (spec §8 boundary S4).
    pub fn empty(num_vertices: usize) -> Result<Graph, Error> {
        Graph::from_edges(num_vertices, &[])
    }

    /// Attaches ground-truth block labels, one per vertex. Ignored by the
    /// core partitioner; carried through only for an external evaluator.
    pub fn with_true_partition(mut self, labels: Vec<usize>) -> Result<Graph, Error> {
        if labels.len() != self.num_vertices {
            return Err(Error::invalid_graph(format!(
                "expected {} true-partition labels, got {}",
                self.num_vertices,
                labels.len()
            )));
        }
        self.true_block_assignment = Some(labels);
        Ok(self)
    }

    pub fn num_vertices(&self) -> usize {
        self.num_vertices
    }

    pub fn num_edges(&self) -> u64 {
        self.num_edges
    }

    pub fn true_block_assignment(&self) -> Option<&[usize]> {
        self.true_block_assignment.as_deref()
    }

    /// Out-neighbors of `v` as `(neighbor_id, weight)` pairs.
    pub fn out_neighbors(&self, v: usize) -> &[(usize, u64)] {
        &self.out_neighbors[v]
    }

    /// In-neighbors of `v` as `(neighbor_id, weight)` pairs.
    pub fn in_neighbors(&self, v: usize) -> &[(usize, u64)] {
        &self.in_neighbors[v]
    }

    pub fn out_degree(&self, v: usize) -> u64 {
        self.out_neighbors[v].iter().map(|(_, w)| w).sum()
    }

    pub fn in_degree(&self, v: usize) -> u64 {
        self.in_neighbors[v].iter().map(|(_, w)| w).sum()
    }
}
