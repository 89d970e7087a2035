//! The degree-corrected stochastic blockmodel partitioning engine: block
//! state (`partition`), the golden-section search over B (`triplet`,
//! `driver`), and the two move phases that search within a fixed B
//! (`merge`, `mh`) built on a shared proposal/update/entropy kernel
//! (`proposal`, `edge_update`, `entropy`) over a pluggable `matrix`.

mod edge_update;
mod entropy;
mod matrix;
mod merge;
mod mh;
mod proposal;
mod triplet;

pub mod driver;
pub mod partition;

pub use driver::{run, CancellationToken, DriverOutcome, IterationRecord};
pub use matrix::{BlockMatrix, DenseMatrix, SparseMatrix};
pub use partition::{Partition, PartitionCheckpoint};
pub use triplet::{NextStep, PartitionTriplet, Snapshot};
