//! Grid geometry: per-dimension bounds, node counts, and spacing.
//!
//! A [`GridSpec`] splits each dimension `d` of a rectangular domain into
//! `node_count(d)` equal cells. Grid *nodes* sit at cell centres, so node `i`
//! of dimension `d` has the real value `lower + i * cell_width + half_step`.
//! The transform engine only ever touches the grid through [`node_value`],
//! [`half_step`] and [`nearest_node`], all O(1).
//!
//! [`node_value`]: GridSpec::node_value
//! [`half_step`]: GridSpec::half_step
//! [`nearest_node`]: GridSpec::nearest_node

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Grid construction/validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GridError {
    #[error("mismatched per-dimension lengths: {lower} lower bounds, {upper} upper bounds, {nodes} node counts")]
    LengthMismatch {
        lower: usize,
        upper: usize,
        nodes: usize,
    },

    #[error("a grid needs at least one dimension")]
    Empty,

    #[error("invalid bounds for dimension {dim}: lower {lower} is not below upper {upper}")]
    InvalidBounds { dim: usize, lower: f64, upper: f64 },

    #[error("dimension {dim} has no grid nodes")]
    NoNodes { dim: usize },
}

/// A rectangular grid with per-dimension bounds and node counts.
///
/// `half_step(d)` is half the cell width of dimension `d`; node values are
/// cell centres, offset by `half_step` from the left cell edge.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GridSpec {
    lower: Vec<f64>,
    upper: Vec<f64>,
    nodes: Vec<usize>,
    dx: Vec<f64>,
}

impl GridSpec {
    /// Create a grid from per-dimension bounds and node counts.
    ///
    /// Fails eagerly on mismatched lengths, inverted bounds, non-finite
    /// bounds, or a zero node count.
    pub fn new(lower: Vec<f64>, upper: Vec<f64>, nodes: Vec<usize>) -> Result<Self, GridError> {
        if lower.len() != upper.len() || lower.len() != nodes.len() {
            return Err(GridError::LengthMismatch {
                lower: lower.len(),
                upper: upper.len(),
                nodes: nodes.len(),
            });
        }
        if lower.is_empty() {
            return Err(GridError::Empty);
        }
        for dim in 0..lower.len() {
            if !(lower[dim] < upper[dim]) || !lower[dim].is_finite() || !upper[dim].is_finite() {
                return Err(GridError::InvalidBounds {
                    dim,
                    lower: lower[dim],
                    upper: upper[dim],
                });
            }
            if nodes[dim] == 0 {
                return Err(GridError::NoNodes { dim });
            }
        }

        let dx = (0..lower.len())
            .map(|d| (upper[d] - lower[d]) / (2.0 * nodes[d] as f64))
            .collect();

        Ok(Self {
            lower,
            upper,
            nodes,
            dx,
        })
    }

    /// Create a grid with the same bounds and node count in every dimension.
    pub fn uniform(
        lower: f64,
        upper: f64,
        nodes: usize,
        dimension: usize,
    ) -> Result<Self, GridError> {
        Self::new(
            vec![lower; dimension],
            vec![upper; dimension],
            vec![nodes; dimension],
        )
    }

    /// Number of dimensions.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.nodes.len()
    }

    /// Number of grid nodes along `dim`.
    #[inline]
    pub fn node_count(&self, dim: usize) -> usize {
        self.nodes[dim]
    }

    /// Lower bound of `dim`.
    #[inline]
    pub fn lower(&self, dim: usize) -> f64 {
        self.lower[dim]
    }

    /// Upper bound of `dim`.
    #[inline]
    pub fn upper(&self, dim: usize) -> f64 {
        self.upper[dim]
    }

    /// Half the cell width of `dim`.
    #[inline]
    pub fn half_step(&self, dim: usize) -> f64 {
        self.dx[dim]
    }

    /// Full cell width of `dim`.
    #[inline]
    pub fn cell_width(&self, dim: usize) -> f64 {
        2.0 * self.dx[dim]
    }

    /// Real value of grid node `i` along `dim` (the centre of cell `i`).
    ///
    /// `i` may equal `node_count(dim)`: the interpolation step of the layer
    /// search probes one node past the last cell.
    #[inline]
    pub fn node_value(&self, dim: usize, i: usize) -> f64 {
        self.lower[dim] + i as f64 * self.cell_width(dim) + self.dx[dim]
    }

    /// Index of the grid node closest to `value` along `dim`.
    ///
    /// Values outside the bounds clamp to the first/last node.
    #[inline]
    pub fn nearest_node(&self, dim: usize, value: f64) -> usize {
        let pos = (value - self.lower[dim]) / self.cell_width(dim);
        if pos <= 0.0 {
            0
        } else {
            (pos.floor() as usize).min(self.nodes[dim] - 1)
        }
    }
}
