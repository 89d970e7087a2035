/*!
A degree-corrected stochastic blockmodel partitioning engine: given a
directed, weighted [`Graph`], find a labeling of its vertices into blocks
that minimizes the description-length entropy of the degree-corrected SBM
(§4.2), by alternating an agglomerative block-merge phase with a
Metropolis–Hastings vertex-reassignment phase inside a golden-section search
over the number of blocks B.

Start with [`Graph::from_edges`], a [`DriverConfig`], and [`run`].
*/

mod error;
pub use error::{Error, ErrorKind};

mod config;
pub use config::{DriverConfig, FactorDirection, ThresholdStrategy};

mod graph;
pub use graph::Graph;

pub mod block;
pub use block::{run, CancellationToken, DriverOutcome, IterationRecord, Partition, PartitionCheckpoint};
