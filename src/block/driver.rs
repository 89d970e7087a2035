use super::merge::merge_blocks;
use super::mh;
use super::partition::Partition;
use super::triplet::{NextStep, PartitionTriplet};
use crate::{DriverConfig, Error, Graph};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A cooperative cancellation flag (§5) shared between the caller and a
/// running `run`. Cloning shares the same underlying flag; `cancel` is safe
/// to call from any thread, including while `run` executes on another.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> CancellationToken {
        CancellationToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One golden-section iteration's telemetry (§6.3): the block count tried,
/// the resulting overall entropy, and how long the block-merge + MH pass
/// took. Downstream evaluators consume a `Vec<IterationRecord>` directly.
#[derive(Debug, Clone, Serialize)]
pub struct IterationRecord {
    pub iteration: usize,
    pub overall_entropy: f64,
    pub num_blocks: usize,
    pub wallclock: Duration,
}

/// The result of a completed (or cancelled) driver run: the final vertex
/// labeling and the full iteration history.
#[derive(Debug, Clone)]
pub struct DriverOutcome {
    pub assignment: Vec<usize>,
    pub history: Vec<IterationRecord>,
}

/**
Runs the outer golden-section search over B (§4.8): seed a singleton
partition, then repeatedly ask the `PartitionTriplet` what to try next,
running a block-merge pass (§4.6) followed by an MH sweep to convergence
(§4.7) for each candidate B, until the triplet reports the bracket has
narrowed to the optimum.

Checks `cancel` between phases and between merge/MH; on cancellation,
returns the best snapshot (`mid`) found so far rather than an error, per
spec's "cancellation yields the best snapshot in the triplet so far".
*/
pub fn run(graph: &Graph, config: &DriverConfig, cancel: &CancellationToken) -> Result<DriverOutcome, Error> {
    config.validate()?;
    let mut rng = match config.seed {
        Some(seed) => ChaCha20Rng::seed_from_u64(seed),
        None => ChaCha20Rng::from_entropy(),
    };

    let mut triplet = PartitionTriplet::new();
    let mut history = Vec::new();
    let mut iteration = 0usize;

    let start = Instant::now();
    let singleton = Partition::singleton(graph);
    let entropy = singleton.overall_entropy(graph.num_vertices(), graph.num_edges());
    tracing::debug!(num_blocks = singleton.num_blocks(), entropy, "seeded singleton partition");
    push_record(&mut history, &mut iteration, &singleton, entropy, start);
    triplet.update(singleton, entropy);

    loop {
        if let Err(err) = check_cancelled(cancel) {
            debug_assert_eq!(err.kind, crate::ErrorKind::Cancelled);
            tracing::debug!("cancellation observed before next golden-section step");
            return Ok(best_so_far(&triplet, history));
        }

        match triplet.next_step(config.block_reduction_rate) {
            NextStep::Optimal(partition) => {
                tracing::info!(num_blocks = partition.num_blocks(), "golden-section search converged");
                return Ok(DriverOutcome {
                    assignment: partition.assignment().to_vec(),
                    history,
                });
            }
            NextStep::Continue { base, blocks_to_merge } => {
                let iteration_start = Instant::now();
                tracing::debug!(from = base.num_blocks(), blocks_to_merge, "starting block-merge pass");
                let merge_seed = rng.gen::<u64>();
                let merged = merge_blocks(graph, &base, blocks_to_merge, config, merge_seed)?;

                if let Err(err) = check_cancelled(cancel) {
                    debug_assert_eq!(err.kind, crate::ErrorKind::Cancelled);
                    tracing::debug!("cancellation observed between block-merge and MH phases");
                    return Ok(best_so_far(&triplet, history));
                }

                tracing::debug!(num_blocks = merged.num_blocks(), "starting MH sweep phase");
                let (settled, sweeps) = mh::run(graph, merged, config, &mut rng);
                tracing::debug!(sweeps = sweeps.len(), "MH phase converged");

                let entropy = settled.overall_entropy(graph.num_vertices(), graph.num_edges());
                push_record(&mut history, &mut iteration, &settled, entropy, iteration_start);
                triplet.update(settled, entropy);
            }
        }
    }
}

fn push_record(history: &mut Vec<IterationRecord>, iteration: &mut usize, partition: &Partition, entropy: f64, start: Instant) {
    history.push(IterationRecord {
        iteration: *iteration,
        overall_entropy: entropy,
        num_blocks: partition.num_blocks(),
        wallclock: start.elapsed(),
    });
    *iteration += 1;
}

/// The boundary between the core and the driver spec §5 describes: the core
/// reports cancellation as `ErrorKind::Cancelled`, and `run` is the one place
/// that downgrades it to "return the best snapshot so far" instead of
/// propagating it like every other error kind.
fn check_cancelled(cancel: &CancellationToken) -> Result<(), Error> {
    if cancel.is_cancelled() {
        Err(Error::cancelled())
    } else {
        Ok(())
    }
}

fn best_so_far(triplet: &PartitionTriplet, history: Vec<IterationRecord>) -> DriverOutcome {
    let mid = triplet.mid().expect("triplet always holds mid after the initial update()");
    DriverOutcome {
        assignment: mid.partition.assignment().to_vec(),
        history,
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    fn ring_graph(n: usize) -> Graph {
        Graph::from_edges(n, &(0..n).map(|i| (i, (i + 1) % n, 1u64)).collect::<Vec<_>>()).unwrap()
    }

    #[test]
    fn test_run_terminates_on_ring() {
        let graph = ring_graph(8);
        let config = DriverConfig {
            seed: Some(1),
            ..DriverConfig::default()
        };
        let outcome = run(&graph, &config, &CancellationToken::new()).unwrap();
        assert_eq!(outcome.assignment.len(), 8);
        assert!(!outcome.history.is_empty());
    }

    #[test]
    fn test_cancellation_returns_best_so_far_without_error() {
        let graph = ring_graph(6);
        let config = DriverConfig {
            seed: Some(2),
            ..DriverConfig::default()
        };
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = run(&graph, &config, &cancel).unwrap();
        assert_eq!(outcome.assignment.len(), 6);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let graph = ring_graph(4);
        let config = DriverConfig {
            beta: 0.0,
            ..DriverConfig::default()
        };
        let err = run(&graph, &config, &CancellationToken::new()).unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::InvalidConfig);
    }

    /// S6: replaying a run with the same seed against the same graph
    /// produces exactly the same (B, S) sequence, single-threaded.
    #[test]
    fn test_replay_is_deterministic_given_seed() {
        let graph = ring_graph(12);
        let config = DriverConfig {
            seed: Some(42),
            ..DriverConfig::default()
        };
        let first = run(&graph, &config, &CancellationToken::new()).unwrap();
        let second = run(&graph, &config, &CancellationToken::new()).unwrap();
        assert_eq!(first.assignment, second.assignment);
        assert_eq!(first.history.len(), second.history.len());
        for (a, b) in first.history.iter().zip(second.history.iter()) {
            assert_eq!(a.num_blocks, b.num_blocks);
            assert_eq!(a.overall_entropy, b.overall_entropy);
        }
    }
}
