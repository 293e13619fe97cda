//! Ownership-table index manager over any [`Communicator`].
//!
//! Global ids equal problem-domain ids; local ids number each rank's owned nodes in
//! ascending global order. Ghost replication and refresh are delegated to
//! [`ghost_exchange`](crate::algs::ghost_exchange).

use std::collections::{BTreeMap, BTreeSet};

use crate::algs::communicator::{Communicator, GhostCommTags, NoComm};
use crate::algs::ghost_exchange::{self, GhostPlan};
use crate::data::field::{FieldValue, NodeField};
use crate::index::{GhostMap, IndexManager, Translation};
use crate::pd_error::PdError;
use crate::topology::node::{GlobalIndex, LocalIndex, NodeId};
use crate::topology::ownership::NodeOwnership;

#[derive(Clone, Debug)]
struct LevelPartition {
    ownership: NodeOwnership,
    /// `locals[global] = Some(local)` for nodes owned here.
    locals: Vec<Option<LocalIndex>>,
    owned: usize,
    plan: GhostPlan,
}

/// Index manager holding one ownership table per level.
#[derive(Clone, Debug)]
pub struct DistributedIndexManager<C> {
    comm: C,
    tags: GhostCommTags,
    levels: Vec<Option<LevelPartition>>,
}

impl DistributedIndexManager<NoComm> {
    /// Single-partition manager; `node_counts[level]` nodes per level, all owned.
    pub fn serial(node_counts: &[usize]) -> Self {
        let mut mgr = Self::new(NoComm);
        for (level, &n) in node_counts.iter().enumerate() {
            mgr.set_level_ownership(level, NodeOwnership::single(n));
        }
        mgr
    }
}

impl<C: Communicator> DistributedIndexManager<C> {
    pub fn new(comm: C) -> Self {
        Self {
            comm,
            tags: GhostCommTags::default(),
            levels: Vec::new(),
        }
    }

    /// Install (or replace) the ownership table of `level`. Drops any ghost plan.
    pub fn set_level_ownership(&mut self, level: usize, ownership: NodeOwnership) {
        let rank = self.comm.rank();
        let locals = ownership.local_numbering(rank);
        let owned = ownership.owned_count(rank);
        if self.levels.len() <= level {
            self.levels.resize_with(level + 1, || None);
        }
        self.levels[level] = Some(LevelPartition {
            ownership,
            locals,
            owned,
            plan: GhostPlan::default(),
        });
    }

    pub fn comm(&self) -> &C {
        &self.comm
    }

    /// Global ids of the nodes owned on `level`, in local order.
    pub fn owned_globals(&self, level: usize) -> Result<Vec<GlobalIndex>, PdError> {
        let part = self.level(level)?;
        Ok(part.ownership.owned_by(self.comm.rank()).collect())
    }

    fn level(&self, level: usize) -> Result<&LevelPartition, PdError> {
        self.levels
            .get(level)
            .and_then(Option::as_ref)
            .ok_or_else(|| PdError::Configuration(format!("no ownership table for level {level}")))
    }
}

impl<C: Communicator> IndexManager for DistributedIndexManager<C> {
    fn rank(&self) -> usize {
        self.comm.rank()
    }

    fn owned_count(&self, level: usize) -> Result<usize, PdError> {
        Ok(self.level(level)?.owned)
    }

    fn translate(&self, level: usize, node: NodeId) -> Option<Translation> {
        let part = self.levels.get(level)?.as_ref()?;
        let global = part.ownership.global_of(node)?;
        let local = part.locals.get(global.get() as usize).copied().flatten();
        Some(Translation { local, global })
    }

    fn request_ghost_replication(
        &mut self,
        level: usize,
        ghosts: &BTreeSet<GlobalIndex>,
    ) -> Result<GhostMap, PdError> {
        let me = self.comm.rank();
        let map = GhostMap::from_set(ghosts);
        let part = self.level(level)?;

        let mut requests: BTreeMap<usize, Vec<(usize, GlobalIndex)>> = BTreeMap::new();
        for (slot, &global) in map.globals().iter().enumerate() {
            let owner = part.ownership.owner_or_err(global)?;
            if owner == me {
                return Err(PdError::GhostExchange {
                    neighbor: me,
                    message: format!("node {global} is owned locally and cannot be a ghost"),
                });
            }
            requests.entry(owner).or_default().push((slot, global));
        }

        let locals = &part.locals;
        let plan = ghost_exchange::build_plan(&self.comm, self.tags, &requests, |peer, global| {
            locals
                .get(global.get() as usize)
                .copied()
                .flatten()
                .ok_or_else(|| PdError::GhostExchange {
                    neighbor: peer,
                    message: format!("rank {me} was asked for node {global} it does not own"),
                })
        })?;
        log::debug!(
            "rank {me} level {level}: {} ghosts requested, {} exported",
            plan.import_count(),
            plan.exports.values().map(Vec::len).sum::<usize>()
        );

        if let Some(Some(part)) = self.levels.get_mut(level) {
            part.plan = plan;
        }
        Ok(map)
    }

    fn refresh_ghost_values<T: FieldValue>(
        &self,
        level: usize,
        field: &mut NodeField<T>,
    ) -> Result<(), PdError> {
        let part = self.level(level)?;
        if field.owned_len() != part.owned || field.ghost_len() < part.plan.import_count() {
            return Err(PdError::FieldSizeMismatch {
                field: "ghost refresh",
                expected: part.owned + part.plan.import_count(),
                found: field.len(),
            });
        }
        if part.plan.is_empty() {
            return Ok(());
        }
        ghost_exchange::refresh(&self.comm, self.tags, &part.plan, field)
    }

    fn all_partitions_ok(&self, _level: usize, ok: bool) -> Result<bool, PdError> {
        ghost_exchange::all_ok(&self.comm, self.tags, ok)
    }
}
