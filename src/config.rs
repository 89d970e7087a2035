use crate::{Error, ErrorKind};

/**
How the MH vertex phase (§4.7) decides that a given value of B has converged
and it is time to hand control back to the outer driver.

`EveryIteration`: compare the latest iteration's ΔS against the configured
`delta_entropy_threshold` directly.

`MovingAverage(window)`: compare the latest ΔS against the moving average of
the last `window` iterations' ΔS.

`Factor`: compare the latest ΔS against a running reference ΔS scaled by
`factor`, nudged `increase` or `decrease` depending on `direction`. Wraps an
inner strategy so a `Factor` can tighten or loosen any of the other two.
*/
#[derive(Debug, Clone, PartialEq)]
pub enum ThresholdStrategy {
    EveryIteration,
    MovingAverage(usize),
    Factor {
        strategy: Box<ThresholdStrategy>,
        direction: FactorDirection,
        factor: f64,
    },
}

impl Default for ThresholdStrategy {
    fn default() -> Self {
        ThresholdStrategy::EveryIteration
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactorDirection {
    Increase,
    Decrease,
}

/**
Configuration recognized by the outer driver (spec §6).

# Examples

```
use sbm_partition::DriverConfig;
let config = DriverConfig {
    seed: Some(42),
    ..DriverConfig::default()
};
assert!(config.validate().is_ok());
```
*/
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// K: number of agglomerative merge proposals scored per block.
    pub num_agg_proposals_per_block: usize,
    /// Fraction of blocks eliminated per merge pass while the golden-section
    /// bracket has not yet been established.
    pub block_reduction_rate: f64,
    /// Inverse-temperature scaling applied to ΔS in the MH acceptance rule.
    pub beta: f64,
    /// Relative entropy-improvement threshold below which the MH phase is
    /// considered converged for the current B.
    pub delta_entropy_threshold: f64,
    pub threshold_strategy: ThresholdStrategy,
    pub factor_direction: FactorDirection,
    pub factor: f64,
    /// Storage choice only (§4.1/§6): no semantic effect on the result.
    pub sparse: bool,
    /// PRNG seed. `None` seeds from OS entropy (non-reproducible).
    pub seed: Option<u64>,
    /// Upper bound on MH sweeps performed for a single value of B, guarding
    /// against a threshold strategy that never reports convergence.
    pub max_mh_iterations: usize,
}

const DEFAULT_DRIVER_CONFIG: DriverConfig = DriverConfig {
    num_agg_proposals_per_block: 10,
    block_reduction_rate: 0.5,
    beta: 3.0,
    delta_entropy_threshold: 5e-4,
    threshold_strategy: ThresholdStrategy::EveryIteration,
    factor_direction: FactorDirection::Increase,
    factor: 0.02,
    sparse: false,
    seed: None,
    max_mh_iterations: 100,
};

impl Default for DriverConfig {
    fn default() -> DriverConfig {
        DEFAULT_DRIVER_CONFIG
    }
}

impl DriverConfig {
    /**
    Validates the configuration, returning `Err(Error { kind:
    ErrorKind::InvalidConfig, .. })` describing the first field out of range.

    # Examples

    ```
    use sbm_partition::DriverConfig;
    let bad = DriverConfig {
        beta: 0.0,
        ..DriverConfig::default()
    };
    assert!(bad.validate().is_err());
    ```
    */
    pub fn validate(&self) -> Result<(), Error> {
        if self.num_agg_proposals_per_block < 1 {
            return Err(Error::invalid_config(
                "num_agg_proposals_per_block (K) must be >= 1",
            ));
        }
        if !(self.block_reduction_rate > 0.0 && self.block_reduction_rate < 1.0) {
            return Err(Error::invalid_config(
                "block_reduction_rate must be in (0, 1)",
            ));
        }
        if !(self.beta > 0.0) {
            return Err(Error::invalid_config("beta must be > 0"));
        }
        if !(self.delta_entropy_threshold > 0.0) {
            return Err(Error::invalid_config(
                "delta_entropy_threshold must be > 0",
            ));
        }
        if !(self.factor > 0.0) {
            return Err(Error::invalid_config("factor must be > 0"));
        }
        if self.max_mh_iterations < 1 {
            return Err(Error::invalid_config("max_mh_iterations must be >= 1"));
        }
        if let ThresholdStrategy::MovingAverage(window) = &self.threshold_strategy {
            if *window < 1 {
                return Err(Error::invalid_config(
                    "MovingAverage window must be >= 1",
                ));
            }
        }
        Ok(())
    }
}
