//! Ownership metadata for the nodes of one level.
//!
//! The [`NodeOwnership`] map records the owning partition of every node and derives
//! the partition-local numbering from it: on each rank, owned nodes are numbered in
//! ascending global order.

use std::collections::BTreeSet;

use crate::pd_error::PdError;
use crate::topology::node::{GlobalIndex, LocalIndex, NodeId};

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NodeOwnership {
    /// Owner rank per node; the node id is the vector index.
    owners: Vec<usize>,
}

impl NodeOwnership {
    /// Every node owned by rank 0.
    pub fn single(node_count: usize) -> Self {
        Self {
            owners: vec![0; node_count],
        }
    }

    /// Ownership from an explicit per-node owner table.
    pub fn from_owners(owners: Vec<usize>) -> Self {
        Self { owners }
    }

    /// Number of nodes on the level, over all partitions.
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Global index of a problem-domain node id, if the node exists.
    pub fn global_of(&self, node: NodeId) -> Option<GlobalIndex> {
        let idx = usize::try_from(node.get()).ok()?;
        (idx < self.owners.len()).then_some(GlobalIndex::new(node.get()))
    }

    /// Owning rank of a global node.
    pub fn owner(&self, global: GlobalIndex) -> Option<usize> {
        let idx = usize::try_from(global.get()).ok()?;
        self.owners.get(idx).copied()
    }

    /// Owning rank or [`PdError::MissingOwner`].
    pub fn owner_or_err(&self, global: GlobalIndex) -> Result<usize, PdError> {
        self.owner(global).ok_or(PdError::MissingOwner(global))
    }

    /// Returns true if `global` is owned by `rank`.
    pub fn is_owned_by(&self, global: GlobalIndex, rank: usize) -> bool {
        self.owner(global).is_some_and(|owner| owner == rank)
    }

    /// Owned global indices of `rank`, ascending. Position in the iterator is the
    /// node's local index.
    pub fn owned_by(&self, rank: usize) -> impl Iterator<Item = GlobalIndex> + '_ {
        self.owners
            .iter()
            .enumerate()
            .filter(move |&(_, &owner)| owner == rank)
            .map(|(idx, _)| GlobalIndex::new(idx as u64))
    }

    /// Number of nodes owned by `rank`.
    pub fn owned_count(&self, rank: usize) -> usize {
        self.owners.iter().filter(|&&owner| owner == rank).count()
    }

    /// Ranks that own at least one node, sorted.
    pub fn ranks(&self) -> BTreeSet<usize> {
        self.owners.iter().copied().collect()
    }

    /// Local numbering of `rank`: `table[global] = Some(local)` for owned nodes.
    pub fn local_numbering(&self, rank: usize) -> Vec<Option<LocalIndex>> {
        let mut next = 0;
        self.owners
            .iter()
            .map(|&owner| {
                (owner == rank).then(|| {
                    let local = LocalIndex::new(next);
                    next += 1;
                    local
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_numbering_is_ascending_in_global_order() {
        let own = NodeOwnership::from_owners(vec![1, 0, 1, 0, 0]);
        let rank0 = own.local_numbering(0);
        assert_eq!(rank0[1], Some(LocalIndex::new(0)));
        assert_eq!(rank0[3], Some(LocalIndex::new(1)));
        assert_eq!(rank0[4], Some(LocalIndex::new(2)));
        assert_eq!(rank0[0], None);
        let owned: Vec<_> = own.owned_by(1).map(|g| g.get()).collect();
        assert_eq!(owned, vec![0, 2]);
        assert_eq!(own.owned_count(0), 3);
    }

    #[test]
    fn unknown_nodes_have_no_owner() {
        let own = NodeOwnership::single(2);
        assert_eq!(own.global_of(NodeId::new(5)), None);
        assert_eq!(
            own.owner_or_err(GlobalIndex::new(5)),
            Err(PdError::MissingOwner(GlobalIndex::new(5)))
        );
        assert!(own.is_owned_by(GlobalIndex::new(1), 0));
        assert_eq!(own.ranks().into_iter().collect::<Vec<_>>(), vec![0]);
    }
}
