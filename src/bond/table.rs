//! Bond tables: connectivity, immutable parameters and mutable state per bond.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::data::field::NodeField;
use crate::data::tensor::Vector;
use crate::debug_invariants::DebugInvariants;
use crate::law::LawId;
use crate::pd_error::PdError;
use crate::topology::node::{GlobalIndex, NodeHandle, NodeId, NodeRef};

/// Raw connectivity for one level as delivered by the bond-connectivity source:
/// parallel arrays, one entry per bond, in the source's order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawConnectivity {
    pub masters: Vec<NodeId>,
    pub slaves: Vec<NodeId>,
    pub law_ids: Vec<LawId>,
    pub parameters: Vec<Vec<f64>>,
}

impl RawConnectivity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one bond.
    pub fn push(&mut self, master: NodeId, slave: NodeId, law: LawId, parameters: Vec<f64>) {
        self.masters.push(master);
        self.slaves.push(slave);
        self.law_ids.push(law);
        self.parameters.push(parameters);
    }

    /// Number of bonds, or an error if the arrays disagree in length.
    pub fn checked_len(&self, level: usize) -> Result<usize, PdError> {
        let n = self.masters.len();
        if self.slaves.len() != n || self.law_ids.len() != n || self.parameters.len() != n {
            return Err(PdError::connectivity(
                level,
                format!(
                    "array lengths differ: {} masters, {} slaves, {} law ids, {} parameter blocks",
                    n,
                    self.slaves.len(),
                    self.law_ids.len(),
                    self.parameters.len()
                ),
            ));
        }
        Ok(n)
    }

    /// Bonds touching at least one node accepted by `keep`, order preserved.
    pub fn filtered<F: Fn(NodeId) -> bool>(&self, level: usize, keep: F) -> Result<Self, PdError> {
        let n = self.checked_len(level)?;
        let mut out = Self::new();
        for i in 0..n {
            if keep(self.masters[i]) || keep(self.slaves[i]) {
                out.push(
                    self.masters[i],
                    self.slaves[i],
                    self.law_ids[i],
                    self.parameters[i].clone(),
                );
            }
        }
        Ok(out)
    }
}

/// Immutable per-bond parameter block, interpreted by the bond's law.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BondParams(Vec<f64>);

impl BondParams {
    pub fn new(values: Vec<f64>) -> Self {
        BondParams(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

/// A directed master → slave bond.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bond {
    pub master: NodeHandle,
    pub slave: NodeHandle,
    pub law: LawId,
    pub params: BondParams,
    /// Reference-configuration length; set once reference positions are known.
    pub rest_length: f64,
}

impl Bond {
    /// Same endpoints, law and parameters (rest length and state ignored).
    pub fn same_connectivity(&self, other: &Bond) -> bool {
        self.master == other.master
            && self.slave == other.slave
            && self.law == other.law
            && self.params == other.params
    }
}

/// Where a bond is in its life: `Intact → Damaged → Broken`, never back.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BondPhase {
    Intact,
    Damaged,
    Broken,
}

/// Mutable runtime state of a bond.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BondState {
    /// Damage reported by the law at the last evaluation.
    pub damage: f64,
    pub broken: bool,
    /// Law-private scratch that persists between evaluations.
    pub history: Vec<f64>,
}

impl BondState {
    pub fn phase(&self) -> BondPhase {
        if self.broken {
            BondPhase::Broken
        } else if self.damage > 0.0 {
            BondPhase::Damaged
        } else {
            BondPhase::Intact
        }
    }
}

/// All bonds of one level on one partition, in input order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BondTable {
    level: usize,
    bonds: Vec<Bond>,
    states: Vec<BondState>,
    /// Global ids of the non-local nodes the bonds touch.
    ghosts: BTreeSet<GlobalIndex>,
}

impl BondTable {
    pub(crate) fn new(level: usize, bonds: Vec<Bond>, ghosts: BTreeSet<GlobalIndex>) -> Self {
        let states = vec![BondState::default(); bonds.len()];
        Self {
            level,
            bonds,
            states,
            ghosts,
        }
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn states(&self) -> &[BondState] {
        &self.states
    }

    pub(crate) fn states_mut(&mut self) -> &mut [BondState] {
        &mut self.states
    }

    pub fn ghosts(&self) -> &BTreeSet<GlobalIndex> {
        &self.ghosts
    }

    pub fn len(&self) -> usize {
        self.bonds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bonds.is_empty()
    }

    /// Number of broken bonds.
    pub fn broken_count(&self) -> usize {
        self.states.iter().filter(|s| s.broken).count()
    }

    /// True if both tables hold the same bonds in the same order.
    pub fn same_connectivity(&self, other: &BondTable) -> bool {
        self.bonds.len() == other.bonds.len()
            && self
                .bonds
                .iter()
                .zip(&other.bonds)
                .all(|(a, b)| a.same_connectivity(b))
    }

    /// Take over the runtime state of `previous`, which must have the same connectivity.
    pub(crate) fn adopt_states(&mut self, previous: BondTable) {
        debug_assert!(self.same_connectivity(&previous));
        self.states = previous.states;
    }

    /// Compute every bond's rest length from (ghost-refreshed) reference positions.
    pub(crate) fn assign_rest_lengths<const D: usize>(
        &mut self,
        reference: &NodeField<Vector<D>>,
    ) -> Result<(), PdError> {
        for bond in &mut self.bonds {
            let xi = reference.get(bond.slave.slot) - reference.get(bond.master.slot);
            let r = xi.norm();
            if !(r.is_finite() && r > 0.0) {
                return Err(PdError::connectivity(
                    self.level,
                    format!(
                        "bond {} -> {} has zero or invalid rest length",
                        bond.master.node, bond.slave.node
                    ),
                ));
            }
            bond.rest_length = r;
        }
        Ok(())
    }

    /// Number of bonds touching each owned node (`owned` nodes).
    pub fn bond_counts(&self, owned: usize) -> Vec<usize> {
        let mut counts = vec![0; owned];
        for bond in &self.bonds {
            for end in [bond.master.slot, bond.slave.slot] {
                if let NodeRef::Owned(local) = end {
                    counts[local.get()] += 1;
                }
            }
        }
        counts
    }
}

impl DebugInvariants for BondTable {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "BondTable");
    }

    fn validate_invariants(&self) -> Result<(), PdError> {
        if self.states.len() != self.bonds.len() {
            return Err(PdError::InvariantViolation(format!(
                "{} bonds but {} states",
                self.bonds.len(),
                self.states.len()
            )));
        }
        for (i, bond) in self.bonds.iter().enumerate() {
            if bond.master.node == bond.slave.node {
                return Err(PdError::InvariantViolation(format!("bond {i} is a self-bond")));
            }
            if !bond.master.slot.is_owned() && !bond.slave.slot.is_owned() {
                return Err(PdError::InvariantViolation(format!(
                    "bond {i} touches no owned node"
                )));
            }
            for end in [&bond.master, &bond.slave] {
                let is_ghost = self.ghosts.contains(&end.global);
                match end.slot {
                    NodeRef::Owned(_) if is_ghost => {
                        return Err(PdError::InvariantViolation(format!(
                            "bond {i}: owned endpoint {} listed as ghost",
                            end.node
                        )));
                    }
                    NodeRef::Ghost(slot) if !is_ghost || slot >= self.ghosts.len() => {
                        return Err(PdError::InvariantViolation(format!(
                            "bond {i}: ghost endpoint {} has no valid slot",
                            end.node
                        )));
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }
}
