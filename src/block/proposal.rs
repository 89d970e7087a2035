use super::partition::Partition;
use rand::Rng;
use std::collections::HashMap;

/**
Proposes a new block `s` for a unit (a vertex, or a whole block being
considered for merge) currently in block `r` (§4.3).

`neighbor_counts` is the unit's out+in edges grouped by the *current* block
of each neighbor (self-loops excluded, since a self-loop has no useful
neighbor block to chain through). `agg_move` is true during the
agglomerative block-merge phase, where the proposal must never be `r`
itself (a block cannot usefully "merge with itself").

With no neighbors at all, falls back straight to a uniformly random block.
Otherwise: pick a neighbor block `u` weighted by edge count; with
probability `B / (d[u] + B)` (blocks with few edges of their own are more
likely to hand off to a uniformly random block, tempering the search),
propose a uniformly random block; otherwise propose one of `u`'s own
neighboring blocks, weighted by `M[u][t] + M[t][u]`.
*/
pub fn propose(
    r: usize,
    neighbor_counts: &[(usize, u64)],
    partition: &Partition,
    agg_move: bool,
    rng: &mut impl Rng,
) -> usize {
    let total: u64 = neighbor_counts.iter().map(|(_, c)| c).sum();
    if total == 0 {
        return propose_random_block(r, partition.num_blocks(), agg_move, rng);
    }

    let u = weighted_choice(neighbor_counts, total, rng);
    let b = partition.num_blocks() as f64;
    let hand_off_probability = b / (partition.degree(u) as f64 + b);
    if rng.gen::<f64>() <= hand_off_probability {
        return propose_random_block(r, partition.num_blocks(), agg_move, rng);
    }

    let mut candidates: HashMap<usize, u64> = HashMap::new();
    for (block, count) in partition.matrix().row(u) {
        *candidates.entry(block).or_insert(0) += count;
    }
    for (block, count) in partition.matrix().col(u) {
        *candidates.entry(block).or_insert(0) += count;
    }
    if agg_move {
        candidates.remove(&r);
    }
    let weighted: Vec<(usize, u64)> = candidates.into_iter().filter(|&(_, c)| c > 0).collect();
    let candidate_total: u64 = weighted.iter().map(|(_, c)| c).sum();
    if candidate_total == 0 {
        return propose_random_block(r, partition.num_blocks(), agg_move, rng);
    }
    weighted_choice(&weighted, candidate_total, rng)
}

/// A uniformly random block, excluding `current_block` when `agg_move` is
/// set (a merge proposal must target a different block).
pub fn propose_random_block(current_block: usize, num_blocks: usize, agg_move: bool, rng: &mut impl Rng) -> usize {
    if !agg_move || num_blocks <= 1 {
        return rng.gen_range(0..num_blocks);
    }
    let pick = rng.gen_range(0..num_blocks - 1);
    if pick >= current_block {
        pick + 1
    } else {
        pick
    }
}

/// Picks one `(block, count)` entry from `options`, weighted by `count`,
/// given their precomputed `total`.
fn weighted_choice(options: &[(usize, u64)], total: u64, rng: &mut impl Rng) -> usize {
    let mut target = rng.gen_range(0..total);
    for &(block, count) in options {
        if target < count {
            return block;
        }
        target -= count;
    }
    options.last().expect("options is non-empty when total > 0").0
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::Graph;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn ring_partition() -> Partition {
        let graph = Graph::from_edges(6, &(0..6).map(|i| (i, (i + 1) % 6, 1u64)).collect::<Vec<_>>()).unwrap();
        Partition::from_assignment(&graph, vec![0, 0, 1, 1, 2, 2], false).unwrap()
    }

    #[test]
    fn test_no_neighbors_falls_back_to_random() {
        let partition = ring_partition();
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let s = propose(0, &[], &partition, false, &mut rng);
        assert!(s < partition.num_blocks());
    }

    #[test]
    fn test_agg_move_never_proposes_current_block() {
        let partition = ring_partition();
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        for _ in 0..50 {
            let s = propose(0, &[(1, 3)], &partition, true, &mut rng);
            assert_ne!(s, 0);
        }
    }

    #[test]
    fn test_propose_random_block_excludes_current() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        for _ in 0..50 {
            let b = propose_random_block(2, 5, true, &mut rng);
            assert_ne!(b, 2);
            assert!(b < 5);
        }
    }

    #[test]
    fn test_propose_random_block_single_block_returns_it() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        assert_eq!(propose_random_block(0, 1, true, &mut rng), 0);
    }

    #[test]
    fn test_weighted_choice_respects_zero_weight() {
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        for _ in 0..20 {
            let block = weighted_choice(&[(0, 0), (1, 10)], 10, &mut rng);
            assert_eq!(block, 1);
        }
    }
}
