//! Shared fixtures and helpers for unit and integration tests.
//!
//! Three recurring scenarios: a six-cell 1-D grid
//! over `[-2, 4]`, a 9x10 2-D grid over `[-3, 3]`, and a sparse 14-point
//! sample over a 5x5x5 grid.

use crate::grid::GridSpec;

/// Default tolerance for floating point comparisons in tests.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

/// `[-2, 4]` split into 6 cells, one dimension.
pub fn grid_1d6() -> GridSpec {
    GridSpec::uniform(-2.0, 4.0, 6, 1).expect("fixture grid")
}

/// One sample in every cell of the 1-D fixture grid.
pub fn one_per_cell_1d() -> Vec<Vec<u8>> {
    (0..6).map(|i| vec![i]).collect()
}

/// `[-3, 3]^2` with 9 nodes in the first dimension and 10 in the second.
pub fn grid_2d() -> GridSpec {
    GridSpec::new(vec![-3.0, -3.0], vec![3.0, 3.0], vec![9, 10]).expect("fixture grid")
}

/// A 16-point 2-D sample with uneven mass per column.
pub fn sample_2d() -> Vec<Vec<u8>> {
    vec![
        vec![2, 6],
        vec![3, 2],
        vec![3, 3],
        vec![3, 5],
        vec![3, 6],
        vec![3, 7],
        vec![4, 5],
        vec![4, 6],
        vec![4, 7],
        vec![5, 3],
        vec![5, 4],
        vec![5, 5],
        vec![5, 6],
        vec![5, 7],
        vec![6, 3],
        vec![6, 4],
    ]
}

/// `[0, 5]^3` with 5 nodes per dimension.
pub fn grid_3d5() -> GridSpec {
    GridSpec::uniform(0.0, 5.0, 5, 3).expect("fixture grid")
}

/// A sparse 14-point 3-D sample. Several points
/// share coordinate prefixes, so the counting tree must stay well below
/// `14 * 3` nodes.
pub fn sparse_3d_sample() -> Vec<Vec<u8>> {
    vec![
        vec![1, 0, 0],
        vec![2, 0, 0],
        vec![4, 0, 0],
        vec![0, 2, 0],
        vec![4, 4, 0],
        vec![4, 3, 0],
        vec![3, 3, 0],
        vec![0, 0, 1],
        vec![3, 0, 2],
        vec![0, 3, 2],
        vec![0, 3, 3],
        vec![2, 0, 4],
        vec![2, 1, 4],
        vec![2, 2, 4],
    ]
}
