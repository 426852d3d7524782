//! The quantile transform engine.
//!
//! An engine borrows a [`GridSpec`] and a finalized [`SampleIndex`] and maps
//! uniform vectors from `[0,1)^D` onto the empirical distribution the index
//! encodes: one tree level is descended per dimension, and each level runs
//! the layer quantile search of [`search`] with the counting strategy the
//! engine was constructed with.
//!
//! # Strategy variants
//!
//! - [`QuantileTransform::unordered`] uses [`LinearScan`]: correct for any
//!   child order, O(children) per CDF probe. Simplest, no preparation.
//! - [`QuantileTransform::sorted`] uses [`SortedPrefix`]: requires
//!   [`SampleIndex::sort_children`] to have run, pays O(children) once per
//!   visited layer to build prefix sums, then O(log children) per probe.
//!   Worth it when one tree serves many transform calls, the common case.
//! - [`QuantileTransform::interpolated`] is an alias for the unordered
//!   strategy, kept as a named constructor for call sites that think of the
//!   transform as interpolation rather than as a CDF walk.
//!
//! All variants produce identical output for identical input: they share the
//! search loop and tie-break policy and differ only in how per-layer counts
//! are realized.
//!
//! # Concurrency
//!
//! Transform calls are read-only; any number may run concurrently over a
//! shared index as long as no build-phase mutation races with them.
//! [`transform_batch`](QuantileTransform::transform_batch) parallelizes
//! independent calls with rayon, the one concurrency opportunity the
//! algorithm offers.

mod search;
mod strategy;

pub use strategy::{CountingStrategy, LinearScan, SortedPrefix};

use rayon::prelude::*;

use crate::grid::GridSpec;
use crate::index::{GridIndex, SampleIndex};

use search::layer_quantile;

/// Transform construction and invocation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransformError {
    #[error("dimension mismatch: got {got} values, transform expects {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("grid dimension ({grid}) does not match sample index dimension ({index})")]
    GridMismatch { grid: usize, index: usize },

    #[error("sample index counts are not finalized")]
    NotFinalized,

    #[error("the sorted strategy requires children sorted by ascending coordinate")]
    NotSorted,

    #[error("sample index holds no samples")]
    Empty,

    #[error("batch length {len} is not a multiple of dimension {dimension}")]
    RaggedBatch { len: usize, dimension: usize },
}

/// Inverse-CDF engine over a finalized [`SampleIndex`].
///
/// The counting strategy `S` is chosen once at construction; see the module
/// docs for the trade-off.
pub struct QuantileTransform<'a, I: GridIndex, S: CountingStrategy<I>> {
    grid: &'a GridSpec,
    index: &'a SampleIndex<I>,
    strategy: S,
}

/// Engine using the unordered linear-scan strategy.
pub type UnorderedTransform<'a, I> = QuantileTransform<'a, I, LinearScan>;

/// Engine using the sorted binary-search strategy.
pub type SortedTransform<'a, I> = QuantileTransform<'a, I, SortedPrefix>;

impl<'a, I: GridIndex> QuantileTransform<'a, I, LinearScan> {
    /// Engine over an unordered (or sorted) index; children may be in any
    /// order.
    pub fn unordered(
        grid: &'a GridSpec,
        index: &'a SampleIndex<I>,
    ) -> Result<Self, TransformError> {
        check_pair(grid, index)?;
        Ok(Self {
            grid,
            index,
            strategy: LinearScan,
        })
    }

    /// Alias for [`unordered`](Self::unordered); see the module docs.
    pub fn interpolated(
        grid: &'a GridSpec,
        index: &'a SampleIndex<I>,
    ) -> Result<Self, TransformError> {
        Self::unordered(grid, index)
    }
}

impl<'a, I: GridIndex> QuantileTransform<'a, I, SortedPrefix> {
    /// Engine over a sorted index; fails if
    /// [`SampleIndex::sort_children`] has not run.
    pub fn sorted(grid: &'a GridSpec, index: &'a SampleIndex<I>) -> Result<Self, TransformError> {
        check_pair(grid, index)?;
        if !index.is_sorted() {
            return Err(TransformError::NotSorted);
        }
        Ok(Self {
            grid,
            index,
            strategy: SortedPrefix,
        })
    }
}

fn check_pair<I: GridIndex>(
    grid: &GridSpec,
    index: &SampleIndex<I>,
) -> Result<(), TransformError> {
    if grid.dimension() != index.dimension() {
        return Err(TransformError::GridMismatch {
            grid: grid.dimension(),
            index: index.dimension(),
        });
    }
    if !index.is_finalized() {
        return Err(TransformError::NotFinalized);
    }
    if index.total_samples() == 0 {
        return Err(TransformError::Empty);
    }
    Ok(())
}

impl<'a, I: GridIndex, S: CountingStrategy<I>> QuantileTransform<'a, I, S> {
    /// Number of dimensions the engine transforms.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.grid.dimension()
    }

    /// Transform one uniform vector into a real-valued, grid-interpolated
    /// output vector.
    pub fn transform(&self, in01: &[f64], out: &mut [f64]) -> Result<(), TransformError> {
        self.check_len(in01.len())?;
        self.check_len(out.len())?;

        let mut p = SampleIndex::<I>::ROOT;
        for dim in 0..self.dimension() {
            let layer = self.index.layer(p);
            let pick = layer_quantile(&self.strategy, self.grid, &layer, dim, in01[dim]);
            out[dim] = pick.value;
            p = layer.child_id(pick.slot);
        }
        Ok(())
    }

    /// Allocating variant of [`transform`](Self::transform).
    pub fn transform_vec(&self, in01: &[f64]) -> Result<Vec<f64>, TransformError> {
        let mut out = vec![0.0; self.dimension()];
        self.transform(in01, &mut out)?;
        Ok(out)
    }

    /// Transform one uniform vector into the discretized grid indices of the
    /// chosen tree path, without interpolation.
    pub fn transform_discrete(&self, in01: &[f64], out: &mut [I]) -> Result<(), TransformError> {
        self.check_len(in01.len())?;
        self.check_len(out.len())?;

        let mut p = SampleIndex::<I>::ROOT;
        for dim in 0..self.dimension() {
            let layer = self.index.layer(p);
            let pick = layer_quantile(&self.strategy, self.grid, &layer, dim, in01[dim]);
            out[dim] = I::from_usize(layer.child_index(pick.slot));
            p = layer.child_id(pick.slot);
        }
        Ok(())
    }

    /// Transform a row-major batch of uniform vectors in parallel.
    ///
    /// `in01` and `out` hold `len / dimension` consecutive vectors each;
    /// independent rows are spread over the rayon pool.
    pub fn transform_batch(&self, in01: &[f64], out: &mut [f64]) -> Result<(), TransformError>
    where
        S: Sync,
    {
        let d = self.dimension();
        if in01.len() % d != 0 {
            return Err(TransformError::RaggedBatch {
                len: in01.len(),
                dimension: d,
            });
        }
        if out.len() != in01.len() {
            return Err(TransformError::DimensionMismatch {
                expected: in01.len(),
                got: out.len(),
            });
        }

        in01.par_chunks_exact(d)
            .zip(out.par_chunks_exact_mut(d))
            .try_for_each(|(row, out_row)| self.transform(row, out_row))
    }

    #[inline]
    fn check_len(&self, got: usize) -> Result<(), TransformError> {
        if got != self.dimension() {
            return Err(TransformError::DimensionMismatch {
                expected: self.dimension(),
                got,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{grid_1d6, one_per_cell_1d};
    use approx::assert_relative_eq;

    fn engine_1d(samples: &[Vec<u8>]) -> (GridSpec, SampleIndex<u8>) {
        let grid = grid_1d6();
        let index = SampleIndex::from_discretized(&grid, samples).unwrap();
        (grid, index)
    }

    #[test]
    fn zero_input_hits_first_populated_cell() {
        let (grid, index) = engine_1d(&one_per_cell_1d());
        let engine = QuantileTransform::unordered(&grid, &index).unwrap();

        // Uniform one-per-cell mass: val01 = 0 interpolates exactly onto the
        // first cell's node value, -2 + dx.
        let out = engine.transform_vec(&[0.0]).unwrap();
        assert_relative_eq!(out[0], -1.5, epsilon = 1e-12);
    }

    #[test]
    fn near_one_input_approaches_upper_boundary() {
        let (grid, index) = engine_1d(&one_per_cell_1d());
        let engine = QuantileTransform::unordered(&grid, &index).unwrap();

        let out = engine.transform_vec(&[0.999]).unwrap();
        // m = 5, F(5) = 5/6, F(6) = 1: linear interpolation between the last
        // two node values.
        let expected = 3.5 + (0.999 - 5.0 / 6.0) * (4.5 - 3.5) / (1.0 / 6.0);
        assert_relative_eq!(out[0], expected, epsilon = 1e-12);
        assert!(out[0] > 3.5);
    }

    #[test]
    fn interpolates_inside_a_cdf_jump() {
        // Mass at nodes {1, 3, 4}: two gaps, one at each end.
        let (grid, index) = engine_1d(&[vec![1], vec![3], vec![4]]);
        let engine = QuantileTransform::unordered(&grid, &index).unwrap();

        // val01 = 0.05 brackets at m = 1: F(1) = 0, F(2) = 1/3.
        let out = engine.transform_vec(&[0.05]).unwrap();
        assert_relative_eq!(out[0], -0.5 + 0.05 * 3.0, epsilon = 1e-12);
    }

    #[test]
    fn degenerate_left_edge_picks_smallest_child() {
        let (grid, index) = engine_1d(&[vec![2], vec![3]]);
        let engine = QuantileTransform::unordered(&grid, &index).unwrap();

        // val01 = 0 never enters the mass: a == b == 0, lowest child (2)
        // wins, offset spreads val01 over the half-cell.
        let out = engine.transform_vec(&[0.0]).unwrap();
        assert_relative_eq!(out[0], grid.node_value(0, 2), epsilon = 1e-12);
    }

    #[test]
    fn degenerate_right_edge_picks_largest_child() {
        let (grid, index) = engine_1d(&[vec![2], vec![3]]);
        let engine = QuantileTransform::unordered(&grid, &index).unwrap();

        // val01 = 1: a == b == total, highest child (3) wins.
        let out = engine.transform_vec(&[1.0]).unwrap();
        assert_relative_eq!(
            out[0],
            grid.node_value(0, 3) + 2.0 * 1.0 * grid.half_step(0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn degenerate_interior_picks_nearest_child() {
        let (grid, index) = engine_1d(&[vec![1], vec![4]]);
        let engine = QuantileTransform::unordered(&grid, &index).unwrap();

        // val01 = 0.5 lands on the flat region between the two masses; the
        // search stops at m = 2, nearer to child 1 than child 4.
        let out = engine.transform_vec(&[0.5]).unwrap();
        assert_relative_eq!(
            out[0],
            grid.node_value(0, 1) + 2.0 * 0.5 * grid.half_step(0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn discrete_output_visits_cells_in_order() {
        let (grid, index) = engine_1d(&one_per_cell_1d());
        let engine = QuantileTransform::unordered(&grid, &index).unwrap();

        let mut out = [0u8];
        for k in 0..6u8 {
            let val01 = (k as f64 + 0.5) / 6.0;
            engine.transform_discrete(&[val01], &mut out).unwrap();
            assert_eq!(out[0], k);
        }
    }

    #[test]
    fn sorted_engine_requires_sorted_index() {
        let (grid, index) = engine_1d(&one_per_cell_1d());
        assert!(matches!(
            QuantileTransform::sorted(&grid, &index),
            Err(TransformError::NotSorted)
        ));

        let sorted = SampleIndex::<u8>::from_discretized_sorted(&grid, &one_per_cell_1d()).unwrap();
        assert!(QuantileTransform::sorted(&grid, &sorted).is_ok());
    }

    #[test]
    fn rejects_unfinalized_and_empty_indices() {
        let grid = grid_1d6();

        let mut raw = SampleIndex::<u8>::new(1);
        raw.insert(&[2]).unwrap();
        assert!(matches!(
            QuantileTransform::unordered(&grid, &raw),
            Err(TransformError::NotFinalized)
        ));

        let mut empty = SampleIndex::<u8>::new(1);
        empty.finalize_counts();
        assert!(matches!(
            QuantileTransform::unordered(&grid, &empty),
            Err(TransformError::Empty)
        ));
    }

    #[test]
    fn rejects_mismatched_lengths() {
        let (grid, index) = engine_1d(&one_per_cell_1d());
        let engine = QuantileTransform::unordered(&grid, &index).unwrap();

        assert!(matches!(
            engine.transform_vec(&[0.1, 0.2]),
            Err(TransformError::DimensionMismatch {
                expected: 1,
                got: 2
            })
        ));

        let grid2 = GridSpec::uniform(0.0, 1.0, 4, 2).unwrap();
        assert!(matches!(
            QuantileTransform::unordered(&grid2, &index),
            Err(TransformError::GridMismatch { grid: 2, index: 1 })
        ));
    }

    #[test]
    fn batch_matches_single_calls() {
        let (grid, index) = engine_1d(&one_per_cell_1d());
        let engine = QuantileTransform::unordered(&grid, &index).unwrap();

        let inputs: Vec<f64> = (0..100).map(|i| i as f64 / 100.0).collect();
        let mut batch_out = vec![0.0; inputs.len()];
        engine.transform_batch(&inputs, &mut batch_out).unwrap();

        for (i, &v) in inputs.iter().enumerate() {
            let single = engine.transform_vec(&[v]).unwrap();
            assert_eq!(single[0].to_bits(), batch_out[i].to_bits());
        }
    }

    #[test]
    fn batch_rejects_ragged_input() {
        let grid = GridSpec::uniform(0.0, 5.0, 5, 2).unwrap();
        let index =
            SampleIndex::<u8>::from_discretized(&grid, &[vec![0u8, 1], vec![2, 3]]).unwrap();
        let engine = QuantileTransform::unordered(&grid, &index).unwrap();

        let mut out = vec![0.0; 3];
        assert!(matches!(
            engine.transform_batch(&[0.1, 0.2, 0.3], &mut out),
            Err(TransformError::RaggedBatch {
                len: 3,
                dimension: 2
            })
        ));
    }
}
