//! Interface to the distributed index manager.
//!
//! The engine never partitions nodes or moves data between partitions itself. It
//! asks an [`IndexManager`] to translate problem-domain ids, to set up ghost copies
//! of the non-local nodes its bonds touch, and to refresh those copies before each
//! pipeline stage. [`DistributedIndexManager`] is the implementation shipped with the
//! crate; simulation frameworks may provide their own.

pub mod distributed;

use std::collections::BTreeSet;

use hashbrown::HashMap;

use crate::data::field::{FieldValue, NodeField};
use crate::pd_error::PdError;
use crate::topology::node::{GlobalIndex, LocalIndex, NodeId};

pub use distributed::DistributedIndexManager;

/// Result of translating a problem-domain id on one partition.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Translation {
    /// Local index if the node is owned by this partition.
    pub local: Option<LocalIndex>,
    pub global: GlobalIndex,
}

/// Ghost slots of one level: slot `i` holds the copy of `globals()[i]`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GhostMap {
    globals: Vec<GlobalIndex>,
    slots: HashMap<GlobalIndex, usize>,
}

impl GhostMap {
    /// Slots in ascending global order.
    pub fn from_set(set: &BTreeSet<GlobalIndex>) -> Self {
        let globals: Vec<GlobalIndex> = set.iter().copied().collect();
        let slots = globals.iter().enumerate().map(|(i, &g)| (g, i)).collect();
        Self { globals, slots }
    }

    pub fn slot(&self, global: GlobalIndex) -> Option<usize> {
        self.slots.get(&global).copied()
    }

    pub fn globals(&self) -> &[GlobalIndex] {
        &self.globals
    }

    pub fn len(&self) -> usize {
        self.globals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.globals.is_empty()
    }
}

/// Distributed index manager consumed by the engine.
///
/// `request_ghost_replication`, `refresh_ghost_values` and `all_partitions_ok` are
/// collectives: every partition calls them for the same level in the same order.
pub trait IndexManager {
    /// Rank of this partition.
    fn rank(&self) -> usize;

    /// Number of nodes of `level` owned by this partition.
    fn owned_count(&self, level: usize) -> Result<usize, PdError>;

    /// Translate a problem-domain id; `None` if the level has no such node.
    fn translate(&self, level: usize, node: NodeId) -> Option<Translation>;

    /// Set up ghost copies of `ghosts` on `level`, replacing any previous set.
    fn request_ghost_replication(
        &mut self,
        level: usize,
        ghosts: &BTreeSet<GlobalIndex>,
    ) -> Result<GhostMap, PdError>;

    /// Overwrite the ghost part of `field` with the owners' current values.
    /// Returns only once every ghost value is current.
    fn refresh_ghost_values<T: FieldValue>(
        &self,
        level: usize,
        field: &mut NodeField<T>,
    ) -> Result<(), PdError>;

    /// Collective AND of `ok` over all partitions.
    fn all_partitions_ok(&self, level: usize, ok: bool) -> Result<bool, PdError>;
}

/// Collective abort checkpoint: agree on whether every partition got `local` right.
///
/// Returns the local error if there is one, [`PdError::RemotePartitionFailed`] if only
/// another partition failed, and the local value otherwise.
pub fn checkpoint<M: IndexManager, T>(
    manager: &M,
    level: usize,
    local: Result<T, PdError>,
) -> Result<T, PdError> {
    let all_ok = manager.all_partitions_ok(level, local.is_ok())?;
    match local {
        Err(e) => Err(e),
        Ok(_) if !all_ok => Err(PdError::RemotePartitionFailed { level }),
        Ok(v) => Ok(v),
    }
}
