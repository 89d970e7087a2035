use super::partition::Partition;

/// A `Partition` together with the overall entropy the driver computed for
/// it, so later comparisons don't need to recompute `overall_entropy`.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub partition: Partition,
    pub entropy: f64,
}

/// What the golden-section driver should do next, returned by
/// `PartitionTriplet::next_step`.
#[derive(Debug)]
pub enum NextStep {
    /// The bracket has narrowed to consecutive values of B; `partition` (the
    /// middle, lowest-entropy snapshot) is the answer.
    Optimal(Partition),
    /// Merge `blocks_to_merge` blocks out of `base` and continue searching.
    Continue {
        base: Partition,
        blocks_to_merge: usize,
    },
}

/**
Holds the three best partitions seen so far for the golden-section search
over B (§4.8): `hi` and `lo` bracket `mid`, ordered `hi.B > mid.B > lo.B`,
with `mid` always the lowest-entropy partition found. `hi`/`lo` start `None`
and fill in as the search narrows a bracket around the optimum.
*/
#[derive(Debug, Default)]
pub struct PartitionTriplet {
    hi: Option<Snapshot>,
    mid: Option<Snapshot>,
    lo: Option<Snapshot>,
}

impl PartitionTriplet {
    pub fn new() -> PartitionTriplet {
        PartitionTriplet {
            hi: None,
            mid: None,
            lo: None,
        }
    }

    pub fn mid(&self) -> Option<&Snapshot> {
        self.mid.as_ref()
    }

    /**
    Folds a newly evaluated `(partition, entropy)` into the triplet. If it
    beats the current `mid` (or there is none yet), it becomes the new `mid`
    and the old `mid` is demoted to `hi` or `lo` depending on whether the new
    partition has more or fewer blocks. Otherwise the candidate fills `hi` or
    `lo` directly, whichever side of `mid` its block count falls on.
    */
    pub fn update(&mut self, partition: Partition, entropy: f64) {
        let candidate = Snapshot { partition, entropy };
        match self.mid.take() {
            None => {
                self.mid = Some(candidate);
            }
            Some(current_mid) => {
                let candidate_is_higher = candidate.partition.num_blocks() > current_mid.partition.num_blocks();
                if candidate.entropy <= current_mid.entropy {
                    // candidate becomes the new mid; the old mid sits on the
                    // opposite side of it in B, since `hi.B > mid.B > lo.B`.
                    if candidate_is_higher {
                        self.lo = Some(current_mid);
                    } else {
                        self.hi = Some(current_mid);
                    }
                    self.mid = Some(candidate);
                } else {
                    if candidate_is_higher {
                        self.hi = Some(candidate);
                    } else {
                        self.lo = Some(candidate);
                    }
                    self.mid = Some(current_mid);
                }
            }
        }
    }

    /**
    Decides the next value of B to try, per the golden-section search rule
    (§4.8): while `lo` is unset the bracket hasn't been established yet, so
    the driver keeps eliminating a fixed fraction of blocks from `mid`; once
    both sides are set it narrows the bracket by the golden ratio (0.618)
    until `hi`/`lo` (or `mid`/`lo` when `hi` is still unset) are exactly two
    (or one) blocks apart, at which point `mid` is the answer.

    # Panics

    Panics if `update` has never been called — the driver always seeds the
    triplet with the singleton partition before calling this.
    */
    pub fn next_step(&mut self, block_reduction_rate: f64) -> NextStep {
        let mid = self.mid.clone().expect("next_step called before the first update()");

        if self.lo.is_none() {
            let blocks_to_merge = ((mid.partition.num_blocks() as f64) * block_reduction_rate) as usize;
            if blocks_to_merge == 0 {
                return NextStep::Optimal(mid.partition);
            }
            return NextStep::Continue {
                base: mid.partition,
                blocks_to_merge,
            };
        }

        let lo = self.lo.as_ref().unwrap();
        if let Some(hi) = &self.hi {
            if hi.partition.num_blocks() - lo.partition.num_blocks() == 2 {
                return NextStep::Optimal(mid.partition);
            }
        } else if mid.partition.num_blocks() - lo.partition.num_blocks() == 1 {
            return NextStep::Optimal(mid.partition);
        }

        // slots ordered [hi, mid, lo]; `index` picks the wider of the two
        // segments to subdivide next, matching the golden-ratio split.
        let index = match &self.hi {
            None => 1,
            Some(hi) => {
                let upper_span = hi.partition.num_blocks() - mid.partition.num_blocks();
                let lower_span = mid.partition.num_blocks() - lo.partition.num_blocks();
                if upper_span >= lower_span {
                    0
                } else {
                    1
                }
            }
        };

        let (base, next) = if index == 0 {
            (self.hi.as_ref().unwrap(), &mid)
        } else {
            (&mid, self.lo.as_ref().unwrap())
        };
        let span = (base.partition.num_blocks() - next.partition.num_blocks()) as f64;
        let next_b = next.partition.num_blocks() + (span * 0.618).round() as usize;
        let blocks_to_merge = base.partition.num_blocks() - next_b;

        NextStep::Continue {
            base: base.partition.clone(),
            blocks_to_merge,
        }
    }
}
