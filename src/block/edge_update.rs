/**
The inter-block edge-count row/column arithmetic shared by both phases of
the algorithm (§4.4): moving a single vertex from block `r` to block `s`
during the MH sweep, and merging an entire block `r` into block `s` during
the agglomerative phase, are the same update with a different source of
"the unit's own edges" — a vertex's neighbor list for one, a whole block
row/col for the other.

`MoveKind` documents which of the two a given call models; the arithmetic
itself (`compute_update`) only needs the unit's out/in edge counts grouped
by neighbor block, plus its self-loop weight.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    /// Every vertex currently in block `r` moves to block `s` at once.
    Merge,
    /// A single vertex moves from block `r` to block `s`.
    VertexMove,
}

/**
The effect of moving a unit (a vertex, or an entire block) from `r` to `s`:
the sparse set of `(row, col, delta)` entries to apply to `M` via
`BlockMatrix::apply_updates`, plus the new out/in degrees of `r` and `s`
(the only two blocks whose degree changes).
*/
#[derive(Debug, Clone)]
pub struct EdgeCountUpdate {
    pub kind: MoveKind,
    pub r: usize,
    pub s: usize,
    pub deltas: Vec<(usize, usize, i64)>,
    pub new_degree_out_r: u64,
    pub new_degree_out_s: u64,
    pub new_degree_in_r: u64,
    pub new_degree_in_s: u64,
}

/**
Computes the `M` deltas and new `r`/`s` degrees for moving a unit with the
given out/in edge counts (grouped by the *current* block of each neighbor,
self-loops excluded) and `self_loop_weight` (the unit's own `r -> r` weight,
zero if it has none) from block `r` to block `s`.

Every `(block, count)` pair in `out_counts`/`in_counts` is processed
uniformly regardless of whether `block` happens to equal `r` or `s` — the
row/column update for `r` and for `s` both iterate the full list, so a
neighbor still in `r`, a neighbor already in `s`, and a neighbor elsewhere
all fall out of the same two loops without a special case. The self-loop is
the one edge that is NOT a neighbor-block entry (both endpoints are the
unit itself) and is applied directly: `M[r][r] -= self_loop_weight`,
`M[s][s] += self_loop_weight`.
*/
pub fn compute_update(
    kind: MoveKind,
    r: usize,
    s: usize,
    out_counts: &[(usize, u64)],
    in_counts: &[(usize, u64)],
    self_loop_weight: u64,
    degree_out: &[u64],
    degree_in: &[u64],
) -> EdgeCountUpdate {
    let mut deltas = Vec::with_capacity(out_counts.len() * 2 + in_counts.len() * 2 + 1);

    let mut out_sum: u64 = 0;
    for &(block, count) in out_counts {
        if count == 0 {
            continue;
        }
        out_sum += count;
        deltas.push((r, block, -(count as i64)));
        deltas.push((s, block, count as i64));
    }

    let mut in_sum: u64 = 0;
    for &(block, count) in in_counts {
        if count == 0 {
            continue;
        }
        in_sum += count;
        deltas.push((block, r, -(count as i64)));
        deltas.push((block, s, count as i64));
    }

    if self_loop_weight > 0 {
        deltas.push((r, r, -(self_loop_weight as i64)));
        deltas.push((s, s, self_loop_weight as i64));
    }

    EdgeCountUpdate {
        kind,
        r,
        s,
        deltas,
        new_degree_out_r: degree_out[r] - out_sum - self_loop_weight,
        new_degree_out_s: degree_out[s] + out_sum + self_loop_weight,
        new_degree_in_r: degree_in[r] - in_sum - self_loop_weight,
        new_degree_in_s: degree_in[s] + in_sum + self_loop_weight,
    }
}
