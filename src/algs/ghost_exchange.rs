//! Ghost exchange over a [`Communicator`]: plan construction and value refresh.
//!
//! Plan construction is a collective in two stages: every rank tells every other
//! rank how many nodes it wants from it, then ships the requested global ids. The
//! owner turns each request list into an export list of local indices; the
//! requester keeps the matching import list of ghost slots. Refresh afterwards only
//! talks to ranks with a non-empty import or export list.
//!
//! All functions drain every posted handle before returning, even on error.

use std::collections::BTreeMap;

use crate::algs::communicator::{Communicator, GhostCommTags, Wait};
use crate::algs::wire::{
    WireCount, WireIndex, WireScalar, WireStatus, cast_slice, collect_from, expect_exact_len,
};
use crate::data::field::{FieldValue, NodeField};
use crate::pd_error::PdError;
use crate::topology::node::{GlobalIndex, LocalIndex};

/// Who sends what to whom during a ghost refresh of one level.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GhostPlan {
    /// peer rank → ghost slots filled from that peer, in message order.
    pub imports: BTreeMap<usize, Vec<usize>>,
    /// peer rank → owned nodes sent to that peer, in message order.
    pub exports: BTreeMap<usize, Vec<LocalIndex>>,
}

impl GhostPlan {
    pub fn is_empty(&self) -> bool {
        self.imports.is_empty() && self.exports.is_empty()
    }

    /// Number of ghost slots this plan fills.
    pub fn import_count(&self) -> usize {
        self.imports.values().map(Vec::len).sum()
    }
}

/// Build a [`GhostPlan`] collectively.
///
/// `requests` maps each owner rank to the `(ghost slot, global id)` pairs this rank
/// needs from it. `local_of` translates a requested global id into a local index on
/// this rank (the owner side) and fails if the id is not owned here.
pub fn build_plan<C, F>(
    comm: &C,
    tags: GhostCommTags,
    requests: &BTreeMap<usize, Vec<(usize, GlobalIndex)>>,
    local_of: F,
) -> Result<GhostPlan, PdError>
where
    C: Communicator,
    F: Fn(usize, GlobalIndex) -> Result<LocalIndex, PdError>,
{
    let me = comm.rank();
    let peers: Vec<usize> = (0..comm.size()).filter(|&p| p != me).collect();

    // 1) request counts, all-to-all (zero counts included: owners cannot know who asks)
    let mut recv_counts = Vec::with_capacity(peers.len());
    for &peer in &peers {
        let mut cnt = WireCount::new(0);
        let h = comm.irecv(
            peer,
            tags.request_sizes.as_u16(),
            bytemuck::bytes_of_mut(&mut cnt),
        );
        recv_counts.push((peer, h));
    }
    let mut pending = Vec::with_capacity(peers.len());
    for &peer in &peers {
        let n = requests.get(&peer).map_or(0, Vec::len);
        let count = WireCount::new(n);
        pending.push(comm.isend(
            peer,
            tags.request_sizes.as_u16(),
            bytemuck::bytes_of(&count),
        ));
    }
    let mut incoming: BTreeMap<usize, usize> = BTreeMap::new();
    let mut maybe_err = None;
    for (peer, h) in recv_counts {
        match h.wait() {
            Some(data) => {
                match expect_exact_len(peer, data.len(), std::mem::size_of::<WireCount>()) {
                    Ok(()) => {
                        let cnt: Vec<WireCount> = collect_from(&data);
                        if cnt[0].get() > 0 {
                            incoming.insert(peer, cnt[0].get());
                        }
                    }
                    Err(e) => {
                        maybe_err.get_or_insert(e);
                    }
                }
            }
            None => {
                maybe_err.get_or_insert(PdError::GhostExchange {
                    neighbor: peer,
                    message: "no request count received".into(),
                });
            }
        }
    }
    for h in pending {
        let _ = h.wait();
    }
    if let Some(e) = maybe_err {
        return Err(e);
    }

    // 2) request id lists, only where non-empty
    let mut recv_ids = Vec::with_capacity(incoming.len());
    for (&peer, &n) in &incoming {
        let mut buf = vec![0u8; n * std::mem::size_of::<WireIndex>()];
        let h = comm.irecv(peer, tags.request_ids.as_u16(), &mut buf);
        recv_ids.push((peer, n, h));
    }
    let mut pending = Vec::with_capacity(requests.len());
    let mut imports = BTreeMap::new();
    for (&owner, wanted) in requests {
        if wanted.is_empty() {
            continue;
        }
        let ids: Vec<WireIndex> = wanted.iter().map(|(_, g)| WireIndex::of(g.get())).collect();
        pending.push(comm.isend(owner, tags.request_ids.as_u16(), cast_slice(&ids)));
        imports.insert(owner, wanted.iter().map(|&(slot, _)| slot).collect());
    }
    let mut exports = BTreeMap::new();
    for (peer, n, h) in recv_ids {
        let Some(data) = h.wait() else {
            maybe_err.get_or_insert(PdError::GhostExchange {
                neighbor: peer,
                message: "no request list received".into(),
            });
            continue;
        };
        if let Err(e) = expect_exact_len(peer, data.len(), n * std::mem::size_of::<WireIndex>()) {
            maybe_err.get_or_insert(e);
            continue;
        }
        let ids: Vec<WireIndex> = collect_from(&data);
        let locals: Result<Vec<LocalIndex>, PdError> = ids
            .iter()
            .map(|w| local_of(peer, GlobalIndex::new(w.get())))
            .collect();
        match locals {
            Ok(locals) => {
                exports.insert(peer, locals);
            }
            Err(e) => {
                maybe_err.get_or_insert(e);
            }
        }
    }
    for h in pending {
        let _ = h.wait();
    }
    if let Some(e) = maybe_err {
        return Err(e);
    }

    log::debug!(
        "rank {me}: ghost plan imports from {:?}, exports to {:?}",
        imports.keys().collect::<Vec<_>>(),
        exports.keys().collect::<Vec<_>>()
    );
    Ok(GhostPlan { imports, exports })
}

/// Send owned values along the plan's exports and overwrite ghost slots from its
/// imports. Blocks until every import has arrived.
pub fn refresh<C, T>(
    comm: &C,
    tags: GhostCommTags,
    plan: &GhostPlan,
    field: &mut NodeField<T>,
) -> Result<(), PdError>
where
    C: Communicator,
    T: FieldValue,
{
    let mut recvs = Vec::with_capacity(plan.imports.len());
    for (&peer, slots) in &plan.imports {
        let mut buf = vec![0u8; slots.len() * T::WIDTH * std::mem::size_of::<WireScalar>()];
        let h = comm.irecv(peer, tags.values.as_u16(), &mut buf);
        recvs.push((peer, slots, buf.len(), h));
    }

    let mut pending = Vec::with_capacity(plan.exports.len());
    let mut components = Vec::new();
    for (&peer, locals) in &plan.exports {
        components.clear();
        for &local in locals {
            field.owned(local).write_components(&mut components);
        }
        let wire: Vec<WireScalar> = components.iter().map(|&v| WireScalar::of(v)).collect();
        pending.push(comm.isend(peer, tags.values.as_u16(), cast_slice(&wire)));
    }

    let mut maybe_err = None;
    for (peer, slots, expected, h) in recvs {
        let Some(data) = h.wait() else {
            maybe_err.get_or_insert(PdError::GhostExchange {
                neighbor: peer,
                message: "no ghost values received".into(),
            });
            continue;
        };
        if let Err(e) = expect_exact_len(peer, data.len(), expected) {
            maybe_err.get_or_insert(e);
            continue;
        }
        if maybe_err.is_some() {
            continue;
        }
        let wire: Vec<WireScalar> = collect_from(&data);
        let values: Vec<f64> = wire.iter().map(WireScalar::get).collect();
        for (&slot, chunk) in slots.iter().zip(values.chunks_exact(T::WIDTH)) {
            *field.ghost_mut(slot) = T::from_components(chunk);
        }
    }
    for h in pending {
        let _ = h.wait();
    }
    match maybe_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Collective logical AND of `ok` over all ranks.
pub fn all_ok<C: Communicator>(comm: &C, tags: GhostCommTags, ok: bool) -> Result<bool, PdError> {
    let me = comm.rank();
    let peers: Vec<usize> = (0..comm.size()).filter(|&p| p != me).collect();
    let mut recvs = Vec::with_capacity(peers.len());
    for &peer in &peers {
        let mut flag = WireStatus::new(false);
        let h = comm.irecv(peer, tags.status.as_u16(), bytemuck::bytes_of_mut(&mut flag));
        recvs.push((peer, h));
    }
    let flag = WireStatus::new(ok);
    let pending: Vec<_> = peers
        .iter()
        .map(|&peer| comm.isend(peer, tags.status.as_u16(), bytemuck::bytes_of(&flag)))
        .collect();
    let mut all = ok;
    let mut maybe_err = None;
    for (peer, h) in recvs {
        match h.wait() {
            Some(data) if data.len() == std::mem::size_of::<WireStatus>() => {
                let flag: Vec<WireStatus> = collect_from(&data);
                all &= flag[0].is_ok();
            }
            _ => {
                maybe_err.get_or_insert(PdError::GhostExchange {
                    neighbor: peer,
                    message: "no status flag received".into(),
                });
            }
        }
    }
    for h in pending {
        let _ = h.wait();
    }
    match maybe_err {
        Some(e) => Err(e),
        None => Ok(all),
    }
}
