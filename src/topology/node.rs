//! Node identifiers: strong, zero-cost handles for material points.
//!
//! A node is known under three names:
//! - [`NodeId`]: the problem-domain index assigned by the initializer,
//! - [`GlobalIndex`]: the distributed-global index shared by all partitions,
//! - [`LocalIndex`]: the position of an owned node in this partition's buffers.
//!
//! Buffers on a partition hold owned nodes first and ghost copies after them. A
//! [`NodeRef`] names one slot of such a buffer and is the only way engine code
//! addresses field data; owned and ghost indices are never mixed arithmetically.

use std::fmt;

/// Problem-domain identifier of a node, as assigned by the initializer.
///
/// # Memory layout
/// `repr(transparent)` over `u64`, so slices of ids can be put on the wire as-is.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct NodeId(u64);

impl NodeId {
    /// Creates a new `NodeId` from its raw value.
    #[inline]
    pub const fn new(raw: u64) -> Self {
        NodeId(raw)
    }

    /// Returns the raw `u64` value.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NodeId").field(&self.get()).finish()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// Distributed-global identifier of a node.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct GlobalIndex(u64);

impl GlobalIndex {
    #[inline]
    pub const fn new(raw: u64) -> Self {
        GlobalIndex(raw)
    }

    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for GlobalIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GlobalIndex").field(&self.get()).finish()
    }
}

impl fmt::Display for GlobalIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// Position of an owned node in the partition-local numbering.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    serde::Serialize,
    serde::Deserialize,
)]
#[repr(transparent)]
pub struct LocalIndex(usize);

impl LocalIndex {
    #[inline]
    pub const fn new(raw: usize) -> Self {
        LocalIndex(raw)
    }

    #[inline]
    pub const fn get(self) -> usize {
        self.0
    }
}

/// A slot of a partition's field buffers: either an owned node or a ghost copy.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum NodeRef {
    /// Locally owned node at the given local index.
    Owned(LocalIndex),
    /// Ghost copy at the given slot of the level's [`GhostMap`](crate::index::GhostMap).
    Ghost(usize),
}

impl NodeRef {
    /// Returns the local index if the node is owned by this partition.
    #[inline]
    pub fn as_owned(self) -> Option<LocalIndex> {
        match self {
            NodeRef::Owned(local) => Some(local),
            NodeRef::Ghost(_) => None,
        }
    }

    #[inline]
    pub fn is_owned(self) -> bool {
        matches!(self, NodeRef::Owned(_))
    }
}

/// Everything the engine knows about one bond endpoint.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NodeHandle {
    pub node: NodeId,
    pub global: GlobalIndex,
    pub slot: NodeRef,
}
