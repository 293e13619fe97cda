//! Building a [`BondTable`] from raw connectivity.

use std::collections::BTreeSet;

use itertools::izip;

use crate::bond::table::{Bond, BondParams, BondTable, RawConnectivity};
use crate::index::{GhostMap, IndexManager, Translation, checkpoint};
use crate::pd_error::PdError;
use crate::topology::node::{GlobalIndex, NodeHandle, NodeId, NodeRef};

/// Validate `raw`, translate every endpoint and set up ghosts for the non-local ones.
///
/// Performs the ghost-replication collective, so every partition must call this for
/// the same level. Rest lengths are left at zero; see
/// [`BondTable::assign_rest_lengths`].
pub fn build_table<M: IndexManager>(
    level: usize,
    raw: &RawConnectivity,
    manager: &mut M,
) -> Result<(BondTable, GhostMap), PdError> {
    // every partition must reach the replication collective, or none
    let (ends, ghosts) = checkpoint(&*manager, level, resolve_endpoints(level, raw, &*manager))?;

    let ghost_map = manager.request_ghost_replication(level, &ghosts)?;
    let handle = |node: NodeId, t: Translation| -> Result<NodeHandle, PdError> {
        let slot = match t.local {
            Some(local) => NodeRef::Owned(local),
            None => NodeRef::Ghost(ghost_slot(&ghost_map, t.global, level)?),
        };
        Ok(NodeHandle {
            node,
            global: t.global,
            slot,
        })
    };

    let mut bonds = Vec::with_capacity(ends.len());
    for (((master, m), (slave, s)), &law, params) in izip!(ends, &raw.law_ids, &raw.parameters) {
        bonds.push(Bond {
            master: handle(master, m)?,
            slave: handle(slave, s)?,
            law,
            params: BondParams::new(params.clone()),
            rest_length: 0.0,
        });
    }
    log::debug!(
        "level {level}: built {} bonds with {} ghost nodes on rank {}",
        bonds.len(),
        ghosts.len(),
        manager.rank()
    );
    Ok((BondTable::new(level, bonds, ghosts), ghost_map))
}

type Ends = Vec<((NodeId, Translation), (NodeId, Translation))>;

fn resolve_endpoints<M: IndexManager>(
    level: usize,
    raw: &RawConnectivity,
    manager: &M,
) -> Result<(Ends, BTreeSet<GlobalIndex>), PdError> {
    let n = raw.checked_len(level)?;
    let translate = |node: NodeId| -> Result<Translation, PdError> {
        manager.translate(level, node).ok_or_else(|| {
            PdError::connectivity(level, format!("node {node} is not known to the index manager"))
        })
    };

    let mut ends = Vec::with_capacity(n);
    let mut ghosts = BTreeSet::new();
    for (i, (&master, &slave)) in raw.masters.iter().zip(&raw.slaves).enumerate() {
        if master == slave {
            return Err(PdError::connectivity(level, format!("bond {i} connects node {master} to itself")));
        }
        let m = translate(master)?;
        let s = translate(slave)?;
        if m.local.is_none() && s.local.is_none() {
            return Err(PdError::connectivity(
                level,
                format!("bond {i} ({master} -> {slave}) touches no node owned by rank {}", manager.rank()),
            ));
        }
        for t in [&m, &s] {
            if t.local.is_none() {
                ghosts.insert(t.global);
            }
        }
        ends.push(((master, m), (slave, s)));
    }
    Ok((ends, ghosts))
}

fn ghost_slot(map: &GhostMap, global: GlobalIndex, level: usize) -> Result<usize, PdError> {
    map.slot(global).ok_or_else(|| {
        PdError::connectivity(level, format!("index manager returned no ghost slot for node {global}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::DistributedIndexManager;
    use crate::topology::node::LocalIndex;

    fn chain(pairs: &[(u64, u64)]) -> RawConnectivity {
        let mut raw = RawConnectivity::new();
        for &(m, s) in pairs {
            raw.push(NodeId::new(m), NodeId::new(s), 0, vec![]);
        }
        raw
    }

    #[test]
    fn serial_table_has_only_owned_endpoints() {
        let mut mgr = DistributedIndexManager::serial(&[3]);
        let (table, ghosts) = build_table(0, &chain(&[(0, 1), (1, 2)]), &mut mgr).unwrap();
        assert!(ghosts.is_empty());
        assert_eq!(table.len(), 2);
        assert_eq!(table.bonds()[1].master.slot, NodeRef::Owned(LocalIndex::new(1)));
    }

    #[test]
    fn self_bonds_are_rejected() {
        let mut mgr = DistributedIndexManager::serial(&[3]);
        let err = build_table(0, &chain(&[(0, 1), (2, 2)]), &mut mgr).unwrap_err();
        assert!(matches!(err, PdError::InvalidConnectivity { level: 0, .. }));
    }

    #[test]
    fn unknown_nodes_are_rejected() {
        let mut mgr = DistributedIndexManager::serial(&[2]);
        let err = build_table(0, &chain(&[(0, 5)]), &mut mgr).unwrap_err();
        assert!(matches!(err, PdError::InvalidConnectivity { .. }));
    }
}
