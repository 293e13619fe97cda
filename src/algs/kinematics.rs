//! Kinematic field pipeline: mean position → shape tensor → deformation gradient.
//!
//! Every stage accumulates into owned nodes only, visiting bonds in table order. Since
//! each partition lists every bond touching its owned nodes in global order, a node's
//! sums are formed in the same order no matter how the nodes are partitioned. Values
//! of ghost endpoints are read from the ghost slots refreshed after the previous stage.

use crate::bond::{Bond, BondTable};
use crate::data::field::NodeField;
use crate::data::level::KinematicFields;
use crate::data::tensor::{Tensor, Vector, checked_inverse, outer};
use crate::pd_error::PdError;
use crate::topology::node::{LocalIndex, NodeHandle, NodeId, NodeRef};

/// Influence and volume fraction of one bond, evaluated by its law at the rest length.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BondWeight {
    pub influence: f64,
    pub volume_fraction: f64,
}

/// Calls `f(local, this, other)` once per owned endpoint of each bond, in table order.
fn for_each_owned_end<F>(bonds: &[Bond], weights: &[BondWeight], mut f: F)
where
    F: FnMut(LocalIndex, &NodeHandle, &NodeHandle, &BondWeight),
{
    for (bond, w) in bonds.iter().zip(weights) {
        let (m, s) = (&bond.master, &bond.slave);
        if let NodeRef::Owned(local) = m.slot {
            f(local, m, s, w);
        }
        if let NodeRef::Owned(local) = s.slot {
            f(local, s, m, w);
        }
    }
}

/// `x̄_i = (x_i + Σ ω x_j) / (1 + Σ ω)` for every owned node. Ghost slots are zeroed.
pub fn mean_positions<const D: usize>(
    table: &BondTable,
    weights: &[BondWeight],
    position: &NodeField<Vector<D>>,
    out: &mut NodeField<Vector<D>>,
) {
    out.fill_zero();
    let mut denominators = vec![1.0; out.owned_len()];
    for (i, x) in position.owned_values().iter().enumerate() {
        *out.owned_mut(LocalIndex::new(i)) = *x;
    }
    for_each_owned_end(table.bonds(), weights, |local, _, other, w| {
        *out.owned_mut(local) += position.get(other.slot) * w.influence;
        denominators[local.get()] += w.influence;
    });
    for (i, d) in denominators.into_iter().enumerate() {
        *out.owned_mut(LocalIndex::new(i)) /= d;
    }
}

/// `B_i = Σ ω ν ξ ⊗ ξ` and its inverse for every owned node.
///
/// Nodes without bonds get `B = 0` and `B⁻¹ = 0`. Any other singular `B_i` fails with
/// [`PdError::DegenerateGeometry`] naming the first such node in local order; the
/// outputs are fully written either way.
pub fn shape_tensors<const D: usize>(
    level: usize,
    table: &BondTable,
    weights: &[BondWeight],
    fields: &mut KinematicFields<D>,
) -> Result<(), PdError> {
    let KinematicFields {
        reference,
        shape_tensor,
        shape_tensor_inverse,
        ..
    } = fields;
    shape_tensor.fill_zero();
    shape_tensor_inverse.fill_zero();
    // problem-domain id of every owned node that has at least one bond
    let mut bonded: Vec<Option<NodeId>> = vec![None; shape_tensor.owned_len()];
    for_each_owned_end(table.bonds(), weights, |local, this, other, w| {
        let xi = reference.get(other.slot) - reference.get(this.slot);
        *shape_tensor.owned_mut(local) += outer(&xi, &xi) * (w.influence * w.volume_fraction);
        bonded[local.get()].get_or_insert(this.node);
    });

    let mut degenerate = None;
    for (i, node) in bonded.into_iter().enumerate() {
        let Some(node) = node else { continue };
        let local = LocalIndex::new(i);
        match checked_inverse(shape_tensor.owned(local)) {
            Some(inv) => *shape_tensor_inverse.owned_mut(local) = inv,
            None => {
                degenerate.get_or_insert(node);
            }
        }
    }
    match degenerate {
        None => Ok(()),
        Some(node) => Err(PdError::DegenerateGeometry { level, node }),
    }
}

/// `F_i = (Σ ω ν η ⊗ ξ) B_i⁻¹` for every owned node; nodes without bonds get `F = I`.
pub fn deformation_gradients<const D: usize>(
    table: &BondTable,
    weights: &[BondWeight],
    bond_counts: &[usize],
    fields: &mut KinematicFields<D>,
) {
    let KinematicFields {
        reference,
        position,
        shape_tensor_inverse,
        deformation_gradient,
        ..
    } = fields;
    deformation_gradient.fill_zero();
    for_each_owned_end(table.bonds(), weights, |local, this, other, w| {
        let xi = reference.get(other.slot) - reference.get(this.slot);
        let eta = position.get(other.slot) - position.get(this.slot);
        *deformation_gradient.owned_mut(local) += outer(&eta, &xi) * (w.influence * w.volume_fraction);
    });
    for (i, &count) in bond_counts.iter().enumerate() {
        let local = LocalIndex::new(i);
        let f = deformation_gradient.owned_mut(local);
        *f = if count == 0 {
            Tensor::<D>::identity()
        } else {
            *f * shape_tensor_inverse.owned(local)
        };
    }
}
