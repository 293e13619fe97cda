//! Bond force and damage evaluation.
//!
//! Evaluation never touches caller buffers or the level's bond states: it returns an
//! [`Evaluation`] holding per-owned-node force increments and the bonds' new states,
//! which the engine commits only once the whole level has succeeded.

use std::sync::Arc;

use crate::algs::kinematics::BondWeight;
use crate::bond::{Bond, BondState, BondTable};
use crate::data::level::KinematicFields;
use crate::data::tensor::Vector;
use crate::law::{BondContext, BondLaw, Endpoint, LawRegistry};
use crate::pd_error::PdError;
use crate::topology::node::{NodeHandle, NodeRef};

/// Laws and weights of a level's bonds, resolved before any evaluation starts.
pub struct ResolvedLaws<const D: usize> {
    pub laws: Vec<Arc<dyn BondLaw<D>>>,
    pub weights: Vec<BondWeight>,
}

impl<const D: usize> ResolvedLaws<D> {
    /// Look up every bond's law; the first unregistered id fails the whole level.
    pub fn resolve(
        registry: &LawRegistry<D>,
        table: &BondTable,
        horizon: f64,
        grid_spacing: f64,
    ) -> Result<Self, PdError> {
        let mut laws = Vec::with_capacity(table.len());
        let mut weights = Vec::with_capacity(table.len());
        for (i, bond) in table.bonds().iter().enumerate() {
            let law = registry.lookup(bond.law, table.level(), i)?;
            weights.push(BondWeight {
                influence: law.influence(bond.rest_length, horizon),
                volume_fraction: law.volume_fraction(bond.rest_length, horizon, grid_spacing),
            });
            laws.push(Arc::clone(law));
        }
        Ok(Self { laws, weights })
    }
}

/// Uncommitted result of evaluating one level.
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluation<const D: usize> {
    /// Force increment per owned node.
    pub forces: Vec<Vector<D>>,
    /// Broken-bond fraction per owned node.
    pub node_damage: Vec<f64>,
    /// New state per bond, in table order.
    pub states: Vec<BondState>,
    /// Bonds that broke during this evaluation.
    pub newly_broken: usize,
}

/// Scalars shared by every bond of the evaluation.
#[derive(Copy, Clone, Debug)]
pub struct EvalParams {
    pub horizon: f64,
    pub grid_spacing: f64,
    pub time: f64,
}

/// Evaluate every bond of `table` in order.
///
/// Broken bonds are skipped. A bond that breaks in this evaluation still contributes
/// the force its law returned.
pub fn evaluate<const D: usize>(
    table: &BondTable,
    resolved: &ResolvedLaws<D>,
    fields: &KinematicFields<D>,
    bond_counts: &[usize],
    params: EvalParams,
) -> Evaluation<D> {
    let owned = bond_counts.len();
    let mut forces = vec![Vector::<D>::zeros(); owned];
    let mut states = table.states().to_vec();
    let mut newly_broken = 0;

    for (i, (bond, state)) in table.bonds().iter().zip(states.iter_mut()).enumerate() {
        if state.broken {
            continue;
        }
        let law = &resolved.laws[i];
        let w = resolved.weights[i];
        let ctx = BondContext {
            master: endpoint(law.as_ref(), &bond.master, fields),
            slave: endpoint(law.as_ref(), &bond.slave, fields),
            rest_length: bond.rest_length,
            horizon: params.horizon,
            grid_spacing: params.grid_spacing,
            influence: w.influence,
            volume_fraction: w.volume_fraction,
            parameters: bond.params.as_slice(),
            damage: state.damage,
            time: params.time,
        };
        let response = law.force_damage(&ctx, &mut state.history);

        add_force(&mut forces, bond.master.slot, &response.master_force);
        add_force(&mut forces, bond.slave.slot, &response.slave_force);
        state.damage = response.damage;
        if response.damage >= law.breakage_threshold() {
            state.broken = true;
            newly_broken += 1;
            log::trace!(
                "level {}: bond {i} ({} -> {}) broke at damage {}",
                table.level(),
                bond.master.node,
                bond.slave.node,
                response.damage
            );
        }
    }

    let node_damage = node_damage(table.bonds(), &states, bond_counts);
    Evaluation {
        forces,
        node_damage,
        states,
        newly_broken,
    }
}

fn endpoint<const D: usize>(
    law: &dyn BondLaw<D>,
    end: &NodeHandle,
    fields: &KinematicFields<D>,
) -> Endpoint<D> {
    let slot = end.slot;
    let reference_position = *fields.reference.get(slot);
    let deformation_gradient = *fields.deformation_gradient.get(slot);
    Endpoint {
        node: end.node,
        reference_position,
        position: *fields.position.get(slot),
        velocity: *fields.velocity.get(slot),
        mean_position: *fields.mean_position.get(slot),
        deformation_gradient,
        shape_tensor: *fields.shape_tensor.get(slot),
        shape_tensor_inverse: *fields.shape_tensor_inverse.get(slot),
        stress: law.stress(&deformation_gradient, &reference_position, end.node),
    }
}

#[inline]
fn add_force<const D: usize>(forces: &mut [Vector<D>], slot: NodeRef, f: &Vector<D>) {
    if let NodeRef::Owned(local) = slot {
        forces[local.get()] += f;
    }
}

/// Broken bonds over total bonds per owned node; 0 for nodes without bonds.
pub fn node_damage(bonds: &[Bond], states: &[BondState], bond_counts: &[usize]) -> Vec<f64> {
    let mut broken = vec![0usize; bond_counts.len()];
    for (bond, _) in bonds.iter().zip(states).filter(|(_, s)| s.broken) {
        for end in [bond.master.slot, bond.slave.slot] {
            if let NodeRef::Owned(local) = end {
                broken[local.get()] += 1;
            }
        }
    }
    broken
        .into_iter()
        .zip(bond_counts)
        .map(|(b, &n)| if n == 0 { 0.0 } else { b as f64 / n as f64 })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bond::{RawConnectivity, build_table};
    use crate::config::ElasticConfig;
    use crate::data::field::NodeField;
    use crate::index::DistributedIndexManager;
    use crate::law::{BondResponse, DefaultBondLaw, LawFunctions};
    use crate::topology::node::{LocalIndex, NodeId};
    use nalgebra::{Matrix1, Vector1};

    const PARAMS: EvalParams = EvalParams {
        horizon: 1.5,
        grid_spacing: 1.0,
        time: 0.0,
    };

    /// Two 1-D nodes one unit apart, the slave displaced to `slave_x`.
    fn pair(raw_params: Vec<f64>, law: u32, slave_x: f64) -> (BondTable, KinematicFields<1>, Vec<usize>) {
        let mut raw = RawConnectivity::new();
        raw.push(NodeId::new(0), NodeId::new(1), law, raw_params);
        let mut mgr = DistributedIndexManager::serial(&[2]);
        let (mut table, _) = build_table(0, &raw, &mut mgr).unwrap();
        let x0 = [Vector1::new(0.0), Vector1::new(1.0)];
        let reference = NodeField::from_owned("reference", &x0, 2, 0).unwrap();
        table.assign_rest_lengths(&reference).unwrap();
        let mut fields = KinematicFields::new(reference);
        fields
            .position
            .copy_owned_from("position", &[Vector1::new(0.0), Vector1::new(slave_x)])
            .unwrap();
        let counts = table.bond_counts(2);
        for local in [LocalIndex::new(0), LocalIndex::new(1)] {
            *fields.deformation_gradient.owned_mut(local) = Matrix1::new(slave_x);
            *fields.shape_tensor.owned_mut(local) = Matrix1::new(1.0);
            *fields.shape_tensor_inverse.owned_mut(local) = Matrix1::new(1.0);
        }
        (table, fields, counts)
    }

    fn registry() -> LawRegistry<1> {
        LawRegistry::new(DefaultBondLaw::new(ElasticConfig::default()))
    }

    #[test]
    fn unregistered_law_fails_resolution() {
        let (table, _, _) = pair(vec![], 5, 1.0);
        let err = ResolvedLaws::resolve(&registry(), &table, 1.5, 1.0).err().unwrap();
        assert_eq!(
            err,
            PdError::UnregisteredLaw {
                law_id: 5,
                level: 0,
                bond: 0
            }
        );
    }

    #[test]
    fn breaking_bond_keeps_its_last_force_then_goes_quiet() {
        let (mut table, fields, counts) = pair(vec![0.5], 0, 2.0);
        let resolved = ResolvedLaws::resolve(&registry(), &table, 1.5, 1.0).unwrap();
        let first = evaluate(&table, &resolved, &fields, &counts, PARAMS);
        assert_eq!(first.newly_broken, 1);
        assert!(first.states[0].broken);
        // damage 1 scales the force away
        assert_eq!(first.forces[0], Vector1::zeros());
        assert_eq!(first.node_damage, vec![1.0, 1.0]);

        table.states_mut().clone_from_slice(&first.states);
        let second = evaluate(&table, &resolved, &fields, &counts, PARAMS);
        assert_eq!(second.newly_broken, 0);
        assert_eq!(second.forces, vec![Vector1::zeros(); 2]);
    }

    #[test]
    fn asymmetric_custom_law_is_applied_verbatim() {
        let mut reg = registry();
        reg.register_functions(
            7,
            LawFunctions::new(|f, _, _| *f).with_force_damage(|_, history| {
                history.push(1.0);
                BondResponse {
                    master_force: Vector1::new(2.0),
                    slave_force: Vector1::new(-0.5),
                    damage: 0.25,
                }
            }),
        );
        let (table, fields, counts) = pair(vec![], 7, 1.0);
        let resolved = ResolvedLaws::resolve(&reg, &table, 1.5, 1.0).unwrap();
        let out = evaluate(&table, &resolved, &fields, &counts, PARAMS);
        assert_eq!(out.forces, vec![Vector1::new(2.0), Vector1::new(-0.5)]);
        assert_eq!(out.states[0].history, vec![1.0]);
        assert_eq!(out.states[0].damage, 0.25);
        assert!(!out.states[0].broken);
        // the table itself is untouched until the caller commits
        assert_eq!(table.states()[0], BondState::default());
    }
}
