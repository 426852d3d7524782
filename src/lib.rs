//! mveqf: multivariate empirical quantile transforms over sparse sample grids.
//!
//! Maps points drawn uniformly from the unit hypercube onto points following
//! an empirical multivariate distribution given by discretized sample
//! observations over a rectangular grid. The sample set is held as a sparse
//! counting tree (one level per dimension), so the transform never needs a
//! dense probability table over the full grid.
//!
//! # Key Types
//!
//! - [`GridSpec`] - Per-dimension bounds, node counts, and spacing
//! - [`SampleIndex`] - The counting tree built from discretized samples
//! - [`QuantileTransform`] - The inverse-CDF engine walking the tree
//! - [`Kde`] - Optional kernel-density weighting front-end
//!
//! # Usage
//!
//! Build a [`SampleIndex`] from discretized (or continuous) sample vectors,
//! then construct an engine with [`QuantileTransform::unordered`] or
//! [`QuantileTransform::sorted`] and feed it uniform vectors:
//!
//! ```
//! use mveqf::{GridSpec, QuantileTransform, SampleIndex};
//!
//! let grid = GridSpec::uniform(-2.0, 4.0, 6, 1).unwrap();
//! let samples: Vec<Vec<u8>> = (0..6).map(|i| vec![i]).collect();
//! let index = SampleIndex::from_discretized(&grid, &samples).unwrap();
//!
//! let engine = QuantileTransform::unordered(&grid, &index).unwrap();
//! let out = engine.transform_vec(&[0.5]).unwrap();
//! assert!(out[0] > -2.0 && out[0] < 4.5);
//! ```

pub mod grid;
pub mod index;
pub mod kde;
pub mod testing;
pub mod transform;

// =============================================================================
// Convenience Re-exports
// =============================================================================

pub use grid::{GridError, GridSpec};
pub use index::{GridIndex, IndexError, SampleIndex};
pub use kde::{Kde, KdeError, Kernel};
pub use transform::{
    CountingStrategy, LinearScan, QuantileTransform, SortedPrefix, SortedTransform,
    TransformError, UnorderedTransform,
};
