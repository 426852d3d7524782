//! The sample index: a sparse counting tree over discretized observations.
//!
//! The tree has one level per dimension. Each node owns a set of children
//! with pairwise-distinct discretized coordinates; sample vectors sharing a
//! coordinate prefix collapse onto the same path, so the tree stays small
//! even when the grid does not. Nodes live in an arena owned by the index
//! and are addressed by `u32` handles, which keeps ownership flat and makes
//! a finalized index trivially shareable as read-only data.
//!
//! # Lifecycle
//!
//! 1. [`SampleIndex::new`] with the declared dimensionality
//! 2. [`insert`](SampleIndex::insert) once per sample vector
//! 3. [`finalize_counts`](SampleIndex::finalize_counts) (single bottom-up pass)
//! 4. optionally [`sort_children`](SampleIndex::sort_children) for the
//!    sorted transform strategy
//! 5. any number of concurrent read-only transforms
//!
//! The [`from_discretized`](SampleIndex::from_discretized) and
//! [`from_continuous`](SampleIndex::from_continuous) builders run steps 1-3
//! in one call and validate coordinates against a [`GridSpec`] eagerly.

mod node;

pub use node::GridIndex;
pub(crate) use node::{NodeId, TreeNode};

use crate::grid::GridSpec;

/// Sample index construction errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum IndexError {
    #[error("dimension mismatch: sample has {got} coordinates, index expects {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("coordinate {value} out of range for dimension {dim} ({limit} grid nodes)")]
    OutOfRange {
        dim: usize,
        value: usize,
        limit: usize,
    },

    #[error(
        "index type too small: dimension {dim} has {nodes} grid nodes but the \
         coordinate type holds at most {max}"
    )]
    IndexTypeTooSmall {
        dim: usize,
        nodes: usize,
        max: usize,
    },
}

/// A counting tree over discretized sample vectors.
///
/// `I` is the discretized coordinate type (see [`GridIndex`]).
#[derive(Debug, Clone)]
pub struct SampleIndex<I: GridIndex> {
    dimension: usize,
    nodes: Vec<TreeNode<I>>,
    total: u64,
    finalized: bool,
    sorted: bool,
}

impl<I: GridIndex> SampleIndex<I> {
    pub(crate) const ROOT: NodeId = 0;

    /// Create an empty index for `dimension`-length sample vectors.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            nodes: vec![TreeNode::new(I::default())],
            total: 0,
            finalized: false,
            sorted: false,
        }
    }

    // =========================================================================
    // Builders
    // =========================================================================

    /// Build a finalized index from pre-discretized sample vectors.
    ///
    /// Every coordinate is validated against the grid's node counts;
    /// out-of-range coordinates are rejected, never truncated.
    pub fn from_discretized<C>(grid: &GridSpec, samples: &[C]) -> Result<Self, IndexError>
    where
        C: AsRef<[I]>,
    {
        check_index_type::<I>(grid)?;

        let mut index = Self::new(grid.dimension());
        for sample in samples {
            let coords = sample.as_ref();
            if coords.len() != grid.dimension() {
                return Err(IndexError::DimensionMismatch {
                    expected: grid.dimension(),
                    got: coords.len(),
                });
            }
            for (dim, c) in coords.iter().enumerate() {
                let limit = grid.node_count(dim);
                if c.to_usize() >= limit {
                    return Err(IndexError::OutOfRange {
                        dim,
                        value: c.to_usize(),
                        limit,
                    });
                }
            }
            index.insert(coords)?;
        }
        index.finalize_counts();
        Ok(index)
    }

    /// Like [`from_discretized`](Self::from_discretized), additionally
    /// sorting children for the sorted transform strategy.
    pub fn from_discretized_sorted<C>(grid: &GridSpec, samples: &[C]) -> Result<Self, IndexError>
    where
        C: AsRef<[I]>,
    {
        let mut index = Self::from_discretized(grid, samples)?;
        index.sort_children();
        Ok(index)
    }

    /// Build a finalized index from continuous sample vectors, snapping each
    /// coordinate to its nearest grid node first.
    pub fn from_continuous<C>(grid: &GridSpec, samples: &[C]) -> Result<Self, IndexError>
    where
        C: AsRef<[f64]>,
    {
        check_index_type::<I>(grid)?;

        let mut index = Self::new(grid.dimension());
        let mut coords = vec![I::default(); grid.dimension()];
        for sample in samples {
            let values = sample.as_ref();
            if values.len() != grid.dimension() {
                return Err(IndexError::DimensionMismatch {
                    expected: grid.dimension(),
                    got: values.len(),
                });
            }
            for (dim, &v) in values.iter().enumerate() {
                coords[dim] = I::from_usize(grid.nearest_node(dim, v));
            }
            index.insert(&coords)?;
        }
        index.finalize_counts();
        Ok(index)
    }

    /// Like [`from_continuous`](Self::from_continuous), additionally sorting
    /// children for the sorted transform strategy.
    pub fn from_continuous_sorted<C>(grid: &GridSpec, samples: &[C]) -> Result<Self, IndexError>
    where
        C: AsRef<[f64]>,
    {
        let mut index = Self::from_continuous(grid, samples)?;
        index.sort_children();
        Ok(index)
    }

    // =========================================================================
    // Build phase
    // =========================================================================

    /// Insert one sample vector, creating or reusing one node per level.
    ///
    /// Only the terminal node's occurrence count is bumped here; internal
    /// counts are deferred to [`finalize_counts`](Self::finalize_counts).
    /// Inserting into a finalized index clears the finalized/sorted flags,
    /// so counts must be finalized again before transforming.
    pub fn insert(&mut self, coords: &[I]) -> Result<(), IndexError> {
        if coords.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                got: coords.len(),
            });
        }

        let mut cur = Self::ROOT;
        for &c in coords {
            cur = match self.find_child(cur, c) {
                Some(child) => child,
                None => {
                    let child = self.nodes.len() as NodeId;
                    self.nodes.push(TreeNode::new(c));
                    self.nodes[cur as usize].children.push(child);
                    child
                }
            };
        }
        self.nodes[cur as usize].count += 1;
        self.total += 1;
        self.finalized = false;
        self.sorted = false;
        Ok(())
    }

    /// Aggregate every internal node's count from its subtree.
    ///
    /// Children are always created after their parent, so one reverse pass
    /// over the arena sees every child before its parent. Leaf counts were
    /// set at insert time and are left untouched; the pass is idempotent.
    pub fn finalize_counts(&mut self) {
        for id in (0..self.nodes.len()).rev() {
            if self.nodes[id].children.is_empty() {
                continue;
            }
            let sum: u64 = self.nodes[id]
                .children
                .iter()
                .map(|&c| self.nodes[c as usize].count)
                .sum();
            self.nodes[id].count = sum;
        }
        debug_assert_eq!(self.nodes[0].count, self.total);
        self.finalized = true;
    }

    /// Recursively sort each node's children by ascending coordinate.
    ///
    /// Required by the sorted transform strategy. Sorting mutates child
    /// order in place: it must not race with concurrent transforms over a
    /// shared index.
    pub fn sort_children(&mut self) {
        for id in 0..self.nodes.len() {
            let mut children = std::mem::take(&mut self.nodes[id].children);
            children.sort_by_key(|&c| self.nodes[c as usize].index);
            self.nodes[id].children = children;
        }
        self.sorted = true;
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Declared dimensionality (tree depth).
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of inserted sample vectors.
    #[inline]
    pub fn total_samples(&self) -> u64 {
        self.total
    }

    /// True once counts have been finalized and no insert has happened since.
    #[inline]
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// True once children have been sorted and no insert has happened since.
    #[inline]
    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Total number of tree nodes, root included. Memory diagnostic.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total number of parent-to-child links. Memory diagnostic.
    pub fn link_count(&self) -> usize {
        self.nodes.iter().map(|n| n.children.len()).sum()
    }

    #[inline]
    pub(crate) fn layer(&self, id: NodeId) -> Layer<'_, I> {
        Layer {
            nodes: &self.nodes,
            node: &self.nodes[id as usize],
        }
    }

    fn find_child(&self, parent: NodeId, index: I) -> Option<NodeId> {
        self.nodes[parent as usize]
            .children
            .iter()
            .copied()
            .find(|&c| self.nodes[c as usize].index == index)
    }
}

fn check_index_type<I: GridIndex>(grid: &GridSpec) -> Result<(), IndexError> {
    for dim in 0..grid.dimension() {
        if grid.node_count(dim) > I::MAX_NODES {
            return Err(IndexError::IndexTypeTooSmall {
                dim,
                nodes: grid.node_count(dim),
                max: I::MAX_NODES,
            });
        }
    }
    Ok(())
}

/// Read-only view of one parent node and its children, the unit the layer
/// quantile search operates on.
pub struct Layer<'a, I: GridIndex> {
    nodes: &'a [TreeNode<I>],
    node: &'a TreeNode<I>,
}

impl<'a, I: GridIndex> Layer<'a, I> {
    /// Number of children.
    #[inline]
    pub fn len(&self) -> usize {
        self.node.children.len()
    }

    /// True if the node has no children.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.node.children.is_empty()
    }

    /// Count of sample paths through the parent.
    #[inline]
    pub fn total(&self) -> u64 {
        self.node.count
    }

    /// Count of sample paths through the child at `slot`.
    #[inline]
    pub fn child_count(&self, slot: usize) -> u64 {
        self.child(slot).count
    }

    /// Discretized coordinate of the child at `slot`.
    #[inline]
    pub fn child_index(&self, slot: usize) -> usize {
        self.child(slot).index.to_usize()
    }

    #[inline]
    pub(crate) fn child(&self, slot: usize) -> &'a TreeNode<I> {
        &self.nodes[self.node.children[slot] as usize]
    }

    #[inline]
    pub(crate) fn child_id(&self, slot: usize) -> NodeId {
        self.node.children[slot]
    }

    /// Discretized coordinates of the children, in slot order.
    #[inline]
    pub fn child_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.node
            .children
            .iter()
            .map(|&c| self.nodes[c as usize].index.to_usize())
    }

    /// Number of children with coordinate strictly below `r`.
    ///
    /// Only meaningful once children are sorted by ascending coordinate.
    #[inline]
    pub fn lower_bound(&self, r: usize) -> usize {
        self.node
            .children
            .partition_point(|&c| self.nodes[c as usize].index.to_usize() < r)
    }
}
