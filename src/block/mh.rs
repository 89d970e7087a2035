use super::edge_update::{compute_update, MoveKind};
use super::entropy::{delta_entropy, hastings_correction};
use super::partition::Partition;
use super::proposal::propose;
use crate::config::ThresholdStrategy;
use crate::{DriverConfig, Graph};
use rand::Rng;
use std::collections::HashMap;

/// What a single MH sweep over every vertex did, used by `run` to decide
/// whether the sweep has converged for the current `ThresholdStrategy`.
#[derive(Debug, Clone, Copy)]
pub struct SweepRecord {
    pub total_delta_entropy: f64,
    pub accepted_moves: usize,
}

/// One full sweep over `0..N` vertices in order (§4.7 step 2), proposing and
/// possibly accepting a reassignment for each.
fn sweep(graph: &Graph, partition: &mut Partition, config: &DriverConfig, rng: &mut impl Rng) -> SweepRecord {
    let mut total_delta_entropy = 0.0;
    let mut accepted_moves = 0;

    for vertex in 0..graph.num_vertices() {
        let r = partition.block_of(vertex);

        let mut neighbor_counts: HashMap<usize, u64> = HashMap::new();
        let mut self_loop_weight = 0u64;
        for &(neighbor, weight) in graph.out_neighbors(vertex) {
            if neighbor == vertex {
                self_loop_weight += weight;
            } else {
                *neighbor_counts.entry(partition.block_of(neighbor)).or_insert(0) += weight;
            }
        }
        for &(neighbor, weight) in graph.in_neighbors(vertex) {
            if neighbor == vertex {
                continue;
            }
            *neighbor_counts.entry(partition.block_of(neighbor)).or_insert(0) += weight;
        }
        let neighbor_counts: Vec<(usize, u64)> = neighbor_counts.into_iter().collect();
        let vertex_degree: u64 = neighbor_counts.iter().map(|(_, c)| c).sum::<u64>() + 2 * self_loop_weight;

        let s = propose(r, &neighbor_counts, partition, false, rng);
        if s == r {
            continue;
        }

        let out_counts: Vec<(usize, u64)> = graph
            .out_neighbors(vertex)
            .iter()
            .filter(|&&(neighbor, _)| neighbor != vertex)
            .fold(HashMap::new(), |mut acc, &(neighbor, weight)| {
                *acc.entry(partition.block_of(neighbor)).or_insert(0u64) += weight;
                acc
            })
            .into_iter()
            .collect();
        let in_counts: Vec<(usize, u64)> = graph
            .in_neighbors(vertex)
            .iter()
            .filter(|&&(neighbor, _)| neighbor != vertex)
            .fold(HashMap::new(), |mut acc, &(neighbor, weight)| {
                *acc.entry(partition.block_of(neighbor)).or_insert(0u64) += weight;
                acc
            })
            .into_iter()
            .collect();

        let degree_out: Vec<u64> = (0..partition.num_blocks()).map(|b| partition.degree_out(b)).collect();
        let degree_in: Vec<u64> = (0..partition.num_blocks()).map(|b| partition.degree_in(b)).collect();
        let update = compute_update(
            MoveKind::VertexMove,
            r,
            s,
            &out_counts,
            &in_counts,
            self_loop_weight,
            &degree_out,
            &degree_in,
        );
        let delta = delta_entropy(partition, &update);
        if !delta.is_finite() {
            continue;
        }
        let hastings = hastings_correction(partition, &update, &neighbor_counts, vertex_degree);
        let acceptance = (-config.beta * delta).exp() * hastings;

        if acceptance >= 1.0 || rng.gen::<f64>() < acceptance {
            partition.matrix_mut().apply_updates(&update.deltas).expect(
                "indices come from a valid partition and are always in range",
            );
            partition.set_degrees(r, update.new_degree_out_r, update.new_degree_in_r);
            partition.set_degrees(s, update.new_degree_out_s, update.new_degree_in_s);
            partition.set_block(vertex, s);
            debug_assert!(
                partition.invariants_hold(graph.num_edges()),
                "I1/I2/I3 violated after moving vertex {} from block {} to {}",
                vertex,
                r,
                s
            );
            total_delta_entropy += delta;
            accepted_moves += 1;
        }
    }

    SweepRecord {
        total_delta_entropy,
        accepted_moves,
    }
}

/**
Runs the MH vertex-reassignment phase (§4.7) to convergence at the current
`B`: repeatedly sweeps every vertex, accepting proposed moves with
probability `min(1, exp(-beta * delta_S) * hastings)`, until the configured
`ThresholdStrategy` reports the latest sweep's ΔS has stopped improving
relative to what came before, or `max_mh_iterations` sweeps have run.

Returns the final partition together with one `SweepRecord` per sweep
performed, for the caller to fold into its own iteration log.
*/
pub fn run(graph: &Graph, mut partition: Partition, config: &DriverConfig, rng: &mut impl Rng) -> (Partition, Vec<SweepRecord>) {
    let mut history = Vec::new();
    for _ in 0..config.max_mh_iterations {
        let record = sweep(graph, &mut partition, config, rng);
        let converged = has_converged(&history, &record, config);
        history.push(record);
        if converged {
            break;
        }
    }
    (partition, history)
}

fn has_converged(history: &[SweepRecord], latest: &SweepRecord, config: &DriverConfig) -> bool {
    if history.is_empty() {
        return false;
    }
    let reference = reference_delta_entropy(history, &config.threshold_strategy);
    if reference == 0.0 {
        return true;
    }
    let relative_change = (latest.total_delta_entropy - reference).abs() / reference.abs();
    relative_change < config.delta_entropy_threshold
}

/// The ΔS figure a sweep's result is compared against, per the configured
/// `ThresholdStrategy` (§6): the previous sweep's total, a moving average of
/// the last `window` sweeps, or a scaled version of either.
fn reference_delta_entropy(history: &[SweepRecord], strategy: &ThresholdStrategy) -> f64 {
    match strategy {
        ThresholdStrategy::EveryIteration => history.last().map(|r| r.total_delta_entropy).unwrap_or(0.0),
        ThresholdStrategy::MovingAverage(window) => {
            let window = (*window).min(history.len()).max(1);
            let recent = &history[history.len() - window..];
            recent.iter().map(|r| r.total_delta_entropy).sum::<f64>() / window as f64
        }
        ThresholdStrategy::Factor { strategy, direction, factor } => {
            let base = reference_delta_entropy(history, strategy);
            match direction {
                crate::config::FactorDirection::Increase => base * (1.0 + factor),
                crate::config::FactorDirection::Decrease => base * (1.0 - factor),
            }
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn ring_graph(n: usize) -> Graph {
        Graph::from_edges(n, &(0..n).map(|i| (i, (i + 1) % n, 1u64)).collect::<Vec<_>>()).unwrap()
    }

    #[test]
    fn test_sweep_preserves_total_edge_count() {
        let graph = ring_graph(10);
        let mut partition = Partition::from_assignment(&graph, vec![0, 0, 1, 1, 2, 2, 3, 3, 4, 4], false).unwrap();
        let config = DriverConfig::default();
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        sweep(&graph, &mut partition, &config, &mut rng);
        assert_eq!(partition.matrix().total_sum(), graph.num_edges());
    }

    #[test]
    fn test_run_is_deterministic_given_seed() {
        let graph = ring_graph(12);
        let partition = Partition::from_assignment(&graph, vec![0, 0, 0, 1, 1, 1, 2, 2, 2, 3, 3, 3], false).unwrap();
        let config = DriverConfig {
            max_mh_iterations: 3,
            ..DriverConfig::default()
        };
        let mut rng_a = ChaCha20Rng::seed_from_u64(5);
        let mut rng_b = ChaCha20Rng::seed_from_u64(5);
        let (result_a, _) = run(&graph, partition.clone(), &config, &mut rng_a);
        let (result_b, _) = run(&graph, partition.clone(), &config, &mut rng_b);
        assert_eq!(result_a.assignment(), result_b.assignment());
    }

    #[test]
    fn test_reference_delta_entropy_every_iteration() {
        let history = vec![
            SweepRecord { total_delta_entropy: -2.0, accepted_moves: 3 },
            SweepRecord { total_delta_entropy: -1.0, accepted_moves: 1 },
        ];
        let reference = reference_delta_entropy(&history, &ThresholdStrategy::EveryIteration);
        assert_eq!(reference, -1.0);
    }

    #[test]
    fn test_reference_delta_entropy_moving_average() {
        let history = vec![
            SweepRecord { total_delta_entropy: -4.0, accepted_moves: 3 },
            SweepRecord { total_delta_entropy: -2.0, accepted_moves: 1 },
        ];
        let reference = reference_delta_entropy(&history, &ThresholdStrategy::MovingAverage(2));
        assert_eq!(reference, -3.0);
    }
}
