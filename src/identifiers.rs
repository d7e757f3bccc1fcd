//! Type-safe identifiers.
//!
//! Page objects are registered in a [`PageGraph`](crate::page::PageGraph)
//! arena and referred to by [`NodeId`] rather than by reference, so a cyclic
//! object graph never needs shared mutable references.

use std::fmt;

// ============================================================================
// NodeId
// ============================================================================

/// Stable index of a node in a page graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Creates a node ID from an arena index.
    ///
    /// Returns `None` if the index does not fit.
    #[inline]
    #[must_use]
    pub fn new(index: usize) -> Option<Self> {
        u32::try_from(index).ok().map(Self)
    }

    /// Returns the arena index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::NodeId;

    #[test]
    fn test_node_id_roundtrips_index() {
        let id = NodeId::new(7).unwrap();
        assert_eq!(id.index(), 7);
        assert_eq!(id.to_string(), "#7");
    }

    #[test]
    fn test_node_id_rejects_oversized_index() {
        if usize::BITS > 32 {
            assert!(NodeId::new(usize::MAX).is_none());
        }
    }
}
