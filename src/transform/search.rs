//! The layer quantile search: one order-statistics search per dimension.
//!
//! Treating each child's `(index, count)` as one step of an empirical CDF
//! over the candidate range `[0, node_count(dim))`, the search locates the
//! smallest candidate `m` whose CDF jump brackets `val01`, probing the CDF
//! lazily through a [`CountingStrategy`] instead of materializing it. The
//! structure is a standard lower-bound halving search; only the evaluation
//! of `F(m)` changes between strategies.
//!
//! When `val01` lands on a flat region of the CDF (`a == b`, no mass between
//! neighbouring candidates) there is no child at `m` to descend into, and a
//! deterministic tie-break policy picks one: the lowest-index child at the
//! left edge of the mass, the highest-index child at the right edge, and the
//! child nearest to `m` (ties to the smaller index) in the interior. The
//! policy lives in the pure helpers at the bottom of this module so it can
//! be tested exhaustively without a tree.

use crate::grid::GridSpec;
use crate::index::{GridIndex, Layer};

use super::strategy::CountingStrategy;

/// Result of one layer search: which child to descend into, and the output
/// coordinate for this dimension.
pub(crate) struct LayerPick {
    pub slot: usize,
    pub value: f64,
}

/// Run the quantile search for one dimension against one layer.
pub(crate) fn layer_quantile<I, S>(
    strategy: &S,
    grid: &GridSpec,
    layer: &Layer<'_, I>,
    dim: usize,
    val01: f64,
) -> LayerPick
where
    I: GridIndex,
    S: CountingStrategy<I>,
{
    let state = strategy.prepare(layer);
    let total = layer.total() as f64;

    let mut count = grid.node_count(dim);
    let mut first = 0usize;
    let mut m = 0usize;
    let (mut a, mut b) = (0u64, 0u64);
    let (mut x, mut y) = (0.0f64, 0.0f64);

    // Lower-bound halving search for the smallest m with F(m) < val01 < F(m+1).
    while count > 0 {
        let step = count / 2;
        let it = first + step;
        m = it;

        let probe = strategy.count_less(layer, &state, m);
        a = probe.0;
        b = probe.1;
        x = a as f64 / total;

        if x < val01 {
            y = b as f64 / total;
            if val01 < y {
                break;
            }
            first = it + 1;
            count -= step + 1;
        } else {
            count = step;
        }
    }
    if count == 0 {
        // Search exhausted without bracketing: F(m+1) comes from the last probe.
        y = b as f64 / total;
    }

    if a == b {
        let slot = if a == 0 {
            min_index_slot(layer.child_indices())
        } else if a == layer.total() {
            max_index_slot(layer.child_indices())
        } else {
            nearest_index_slot(layer.child_indices(), m)
        };
        let value = grid.node_value(dim, layer.child_index(slot))
            + 2.0 * val01 * grid.half_step(dim);
        return LayerPick { slot, value };
    }

    let slot = exact_index_slot(layer.child_indices(), m);
    let gm = grid.node_value(dim, m);
    let gm1 = grid.node_value(dim, m + 1);
    LayerPick {
        slot,
        value: gm + (val01 - x) * (gm1 - gm) / (y - x),
    }
}

// =============================================================================
// Tie-break policy
// =============================================================================

/// Slot of the smallest candidate index.
pub(crate) fn min_index_slot(indices: impl IntoIterator<Item = usize>) -> usize {
    let mut best_slot = 0;
    let mut best_index = usize::MAX;
    for (slot, idx) in indices.into_iter().enumerate() {
        if idx < best_index {
            best_slot = slot;
            best_index = idx;
        }
    }
    best_slot
}

/// Slot of the largest candidate index.
pub(crate) fn max_index_slot(indices: impl IntoIterator<Item = usize>) -> usize {
    let mut best_slot = 0;
    let mut best_index = 0;
    let mut seen = false;
    for (slot, idx) in indices.into_iter().enumerate() {
        if !seen || idx > best_index {
            best_slot = slot;
            best_index = idx;
            seen = true;
        }
    }
    best_slot
}

/// Slot of the candidate numerically closest to `target`; ties prefer the
/// smaller index.
pub(crate) fn nearest_index_slot(
    indices: impl IntoIterator<Item = usize>,
    target: usize,
) -> usize {
    let mut best_slot = 0;
    let mut best_diff = usize::MAX;
    let mut best_index = usize::MAX;
    for (slot, idx) in indices.into_iter().enumerate() {
        let diff = idx.abs_diff(target);
        if diff < best_diff || (diff == best_diff && idx < best_index) {
            best_slot = slot;
            best_diff = diff;
            best_index = idx;
        }
    }
    best_slot
}

/// Slot of the candidate whose index equals `target`.
///
/// The non-degenerate branch guarantees such a child exists; a broken tree
/// falls back to slot 0 instead of panicking.
pub(crate) fn exact_index_slot(
    indices: impl IntoIterator<Item = usize>,
    target: usize,
) -> usize {
    indices
        .into_iter()
        .position(|idx| idx == target)
        .unwrap_or(0)
}
