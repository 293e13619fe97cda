//! Constitutive bond laws.
//!
//! A bond law bundles four cooperating operations:
//! - a **stress** law giving the first Piola–Kirchhoff stress at a node from its
//!   deformation gradient,
//! - a **force/damage** law giving the bond's nodal forces and updated damage,
//! - an **influence** function weighting a bond by its rest length,
//! - a **volume-fraction** function correcting for bonds that straddle the horizon.
//!
//! Laws are selected per bond by a [`LawId`] through the [`LawRegistry`].

pub mod default;
pub mod functions;
pub mod registry;

use crate::data::tensor::{Tensor, Vector};
use crate::topology::node::NodeId;

pub use default::{DefaultBondLaw, DefaultParams};
pub use functions::{FnBondLaw, LawFunctions};
pub use registry::LawRegistry;

/// Identifier selecting a registered law. Id 0 is the built-in default.
pub type LawId = u32;

/// Law id that always resolves to the default law unless explicitly replaced.
pub const DEFAULT_LAW_ID: LawId = 0;

/// Kinematic state of one bond endpoint, as seen by the force/damage law.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Endpoint<const D: usize> {
    pub node: NodeId,
    pub reference_position: Vector<D>,
    pub position: Vector<D>,
    pub velocity: Vector<D>,
    pub mean_position: Vector<D>,
    pub deformation_gradient: Tensor<D>,
    pub shape_tensor: Tensor<D>,
    pub shape_tensor_inverse: Tensor<D>,
    /// Output of the bond's stress law at this endpoint.
    pub stress: Tensor<D>,
}

/// Everything a force/damage law sees about one bond.
#[derive(Clone, Debug)]
pub struct BondContext<'a, const D: usize> {
    pub master: Endpoint<D>,
    pub slave: Endpoint<D>,
    pub rest_length: f64,
    pub horizon: f64,
    pub grid_spacing: f64,
    /// The law's influence at this bond's rest length.
    pub influence: f64,
    /// The law's volume fraction at this bond's rest length.
    pub volume_fraction: f64,
    /// Immutable per-bond parameter block.
    pub parameters: &'a [f64],
    /// Damage recorded after the previous evaluation.
    pub damage: f64,
    pub time: f64,
}

impl<const D: usize> BondContext<'_, D> {
    /// Reference bond vector `X_slave − X_master`.
    pub fn reference_bond(&self) -> Vector<D> {
        self.slave.reference_position - self.master.reference_position
    }

    /// Current bond vector `x_slave − x_master`.
    pub fn current_bond(&self) -> Vector<D> {
        self.slave.position - self.master.position
    }

    /// Engineering stretch of the bond relative to its rest length.
    pub fn stretch(&self) -> f64 {
        (self.current_bond().norm() - self.rest_length) / self.rest_length
    }
}

/// Result of a force/damage evaluation: `D` force components on the master plus the
/// updated damage, and the force the law assigns to the slave.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BondResponse<const D: usize> {
    pub master_force: Vector<D>,
    pub slave_force: Vector<D>,
    pub damage: f64,
}

/// A complete constitutive law for bonds.
///
/// Implementations must be deterministic: the engine may evaluate the same bond on
/// several partitions and relies on identical results.
pub trait BondLaw<const D: usize>: Send + Sync {
    /// First Piola–Kirchhoff stress at a node.
    fn stress(&self, deformation_gradient: &Tensor<D>, reference_position: &Vector<D>, node: NodeId) -> Tensor<D>;

    /// Forces and updated damage for one bond. `history` is the bond's private,
    /// mutable state; it persists between evaluations and is empty initially.
    fn force_damage(&self, bond: &BondContext<'_, D>, history: &mut Vec<f64>) -> BondResponse<D>;

    /// Weight of a bond of reference length `rest_length`. Must be non-negative.
    fn influence(&self, rest_length: f64, horizon: f64) -> f64;

    /// Fraction of the neighbor's volume inside the horizon.
    fn volume_fraction(&self, rest_length: f64, horizon: f64, grid_spacing: f64) -> f64;

    /// Damage at or above which the bond is broken for good.
    fn breakage_threshold(&self) -> f64 {
        1.0
    }
}
