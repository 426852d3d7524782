//! Per-layer counting strategies.
//!
//! The layer quantile search only ever asks one question of the tree:
//! "how much sample mass sits strictly below candidate index `r`, and how
//! much at or below it". [`CountingStrategy`] abstracts how that question
//! is answered; the strategy is picked once per engine instance, so the
//! per-probe path is monomorphized with no dynamic dispatch.

use crate::index::{GridIndex, Layer};

/// How `count_less` is realized against one layer of the tree.
pub trait CountingStrategy<I: GridIndex> {
    /// Scratch prepared once per visited layer.
    type LayerState;

    /// Build the per-layer scratch for the children of the current node.
    fn prepare(&self, layer: &Layer<'_, I>) -> Self::LayerState;

    /// Returns `(a, b)`: total count of children with coordinate `< r` and
    /// with coordinate `< r + 1`.
    fn count_less(&self, layer: &Layer<'_, I>, state: &Self::LayerState, r: usize) -> (u64, u64);
}

/// Linear-scan counting: O(children) per probe, correct for any child order.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearScan;

impl<I: GridIndex> CountingStrategy<I> for LinearScan {
    type LayerState = ();

    #[inline]
    fn prepare(&self, _layer: &Layer<'_, I>) -> Self::LayerState {}

    fn count_less(&self, layer: &Layer<'_, I>, _state: &(), r: usize) -> (u64, u64) {
        let (mut a, mut b) = (0u64, 0u64);
        for slot in 0..layer.len() {
            let child = layer.child(slot);
            let j = child.index.to_usize();
            if j < r + 1 {
                b += child.count;
                if j < r {
                    a += child.count;
                }
            }
        }
        (a, b)
    }
}

/// Sorted counting: a prefix-sum array over the (pre-sorted) children plus a
/// lower-bound binary search, O(log children) per probe.
///
/// The prefix sums depend on the live node being visited, not on the whole
/// tree, so they are rebuilt fresh for each layer of each transform call.
#[derive(Debug, Clone, Copy, Default)]
pub struct SortedPrefix;

impl<I: GridIndex> CountingStrategy<I> for SortedPrefix {
    type LayerState = Vec<u64>;

    fn prepare(&self, layer: &Layer<'_, I>) -> Vec<u64> {
        let mut psum = Vec::with_capacity(layer.len() + 1);
        psum.push(0);
        let mut acc = 0u64;
        for slot in 0..layer.len() {
            acc += layer.child(slot).count;
            psum.push(acc);
        }
        psum
    }

    #[inline]
    fn count_less(&self, layer: &Layer<'_, I>, psum: &Vec<u64>, r: usize) -> (u64, u64) {
        (
            psum[layer.lower_bound(r)],
            psum[layer.lower_bound(r + 1)],
        )
    }
}
