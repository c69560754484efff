//! Per-node transition tables.
//!
//! Two representations with identical visible behavior, selected at compile
//! time by the `dense-transitions` feature:
//!
//! - [`SparseLinks`] (default): sorted `(byte, node)` pairs, binary-search
//!   lookup. Most nodes in signature tries have a handful of children, so
//!   this keeps the arena compact.
//! - [`DenseLinks`]: a 256-slot array indexed by byte value. O(1) lookup at
//!   ~1 KiB per node.

use smallvec::SmallVec;

use super::NodeId;

/// Sorted byte-to-node pairs searched by binary search.
#[cfg_attr(feature = "dense-transitions", allow(dead_code))]
pub(crate) struct SparseLinks {
    links: SmallVec<[(u8, NodeId); 4]>,
}

#[cfg_attr(feature = "dense-transitions", allow(dead_code))]
impl SparseLinks {
    /// Build from pairs sorted by byte value.
    pub(crate) fn from_sorted(pairs: &[(u8, NodeId)]) -> Self {
        debug_assert!(pairs.windows(2).all(|w| w[0].0 < w[1].0));
        SparseLinks {
            links: SmallVec::from_slice(pairs),
        }
    }

    #[inline]
    pub(crate) fn get(&self, byte: u8) -> NodeId {
        match self.links.binary_search_by_key(&byte, |&(b, _)| b) {
            Ok(i) => self.links[i].1,
            Err(_) => NodeId::NONE,
        }
    }
}

/// Direct 256-slot lookup table.
#[cfg_attr(not(feature = "dense-transitions"), allow(dead_code))]
pub(crate) struct DenseLinks {
    slots: Box<[NodeId; 256]>,
}

#[cfg_attr(not(feature = "dense-transitions"), allow(dead_code))]
impl DenseLinks {
    pub(crate) fn from_sorted(pairs: &[(u8, NodeId)]) -> Self {
        let mut slots = Box::new([NodeId::NONE; 256]);
        for &(b, n) in pairs {
            slots[b as usize] = n;
        }
        DenseLinks { slots }
    }

    #[inline]
    pub(crate) fn get(&self, byte: u8) -> NodeId {
        self.slots[byte as usize]
    }
}

#[cfg(feature = "dense-transitions")]
pub(crate) type Links = DenseLinks;
#[cfg(not(feature = "dense-transitions"))]
pub(crate) type Links = SparseLinks;
