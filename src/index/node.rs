//! Arena node and the discretized-index trait.

/// Trait for discretized grid coordinate types.
///
/// Coordinates can be u8 (256 nodes per dimension), u16 (65536 nodes), or
/// u32. Most grids need only u8; the generic parameter keeps the tree small
/// without baking in a width.
pub trait GridIndex:
    Copy + Ord + Send + Sync + Default + std::fmt::Debug + 'static
{
    /// Largest number of grid nodes this type can address.
    const MAX_NODES: usize;

    /// Convert from usize, saturating at MAX_NODES - 1.
    fn from_usize(v: usize) -> Self;

    /// Convert to usize.
    fn to_usize(self) -> usize;
}

impl GridIndex for u8 {
    const MAX_NODES: usize = 256;

    #[inline]
    fn from_usize(v: usize) -> Self {
        v.min(255) as u8
    }

    #[inline]
    fn to_usize(self) -> usize {
        self as usize
    }
}

impl GridIndex for u16 {
    const MAX_NODES: usize = 65536;

    #[inline]
    fn from_usize(v: usize) -> Self {
        v.min(65535) as u16
    }

    #[inline]
    fn to_usize(self) -> usize {
        self as usize
    }
}

impl GridIndex for u32 {
    const MAX_NODES: usize = u32::MAX as usize;

    #[inline]
    fn from_usize(v: usize) -> Self {
        v.min(u32::MAX as usize) as u32
    }

    #[inline]
    fn to_usize(self) -> usize {
        self as usize
    }
}

/// Handle into the node arena. The root is always id 0.
pub(crate) type NodeId = u32;

/// One node of the counting tree.
///
/// A node at depth `d` carries the discretized coordinate of dimension `d-1`
/// and the number of sample paths passing through it. Children are arena
/// handles; a child is always created after its parent, so child ids are
/// strictly greater than the parent's.
#[derive(Debug, Clone)]
pub(crate) struct TreeNode<I> {
    pub index: I,
    pub count: u64,
    pub children: Vec<NodeId>,
}

impl<I> TreeNode<I> {
    pub fn new(index: I) -> Self {
        Self {
            index,
            count: 0,
            children: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_index_saturates() {
        assert_eq!(u8::MAX_NODES, 256);
        assert_eq!(u8::from_usize(0), 0u8);
        assert_eq!(u8::from_usize(255), 255u8);
        assert_eq!(u8::from_usize(256), 255u8); // saturates
        assert_eq!(100u8.to_usize(), 100usize);

        assert_eq!(u16::MAX_NODES, 65536);
        assert_eq!(u16::from_usize(65536), 65535u16); // saturates

        assert_eq!(u32::from_usize(7), 7u32);
    }
}
