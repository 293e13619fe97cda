//! # pd-sieve
//!
//! pd-sieve is a distributed bond-based peridynamic force and damage engine. Given a
//! partitioned set of material points connected by directed bonds, it computes
//! per-node kinematic quantities, evaluates a pluggable constitutive law per bond,
//! accumulates the resulting forces into caller-owned buffers and tracks bond damage.
//!
//! ## Features
//! - Correspondence-model kinematics: mean positions, shape tensors, deformation gradients
//! - A [`LawRegistry`](law::LawRegistry) mapping law ids to [`BondLaw`](law::BondLaw)
//!   objects, with a built-in St. Venant–Kirchhoff law under id 0
//! - Ghost replication through a pluggable [`IndexManager`](index::IndexManager);
//!   [`DistributedIndexManager`](index::DistributedIndexManager) runs over any
//!   [`Communicator`](algs::communicator::Communicator), including the in-process
//!   [`LocalComm`](algs::communicator::LocalComm)
//! - Generic over the spatial dimension `D`
//!
//! ## Determinism
//!
//! Bonds are evaluated in input order and every node sums its bonds in the same
//! order on every partition, so results are bit-identical for any partition count as
//! long as each partition lists the bonds touching its owned nodes in global order.
//!
//! ## Usage
//!
//! ```
//! use pd_sieve::prelude::*;
//! use nalgebra::Vector1;
//!
//! let mut engine =
//!     BondForceEngine::<1, _>::new(ForceGenConfig::default(), DistributedIndexManager::serial(&[2]))?;
//! let mut raw = RawConnectivity::new();
//! raw.push(NodeId::new(0), NodeId::new(1), DEFAULT_LAW_ID, vec![]);
//! let x0 = [Vector1::new(0.0), Vector1::new(1.0)];
//! engine.initialize_level(0, &raw, &x0, 0.0, true)?;
//!
//! let x = [Vector1::new(0.0), Vector1::new(2.0)];
//! let mut force = vec![Vector1::zeros(); 2];
//! let mut damage = vec![0.0; 2];
//! engine.compute_forces_and_damage(0, &mut force, &mut damage, &x, &[Vector1::zeros(); 2], 0.0)?;
//! assert!(force[0][0] > 0.0 && force[1][0] < 0.0);
//! # Ok::<(), PdError>(())
//! ```

pub mod algs;
pub mod bond;
pub mod config;
pub mod data;
pub mod debug_invariants;
pub mod force_gen;
pub mod index;
pub mod law;
pub mod pd_error;
pub mod topology;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::communicator::{Communicator, LocalComm, NoComm};
    pub use crate::bond::{BondPhase, BondState, BondTable, RawConnectivity};
    pub use crate::config::{ElasticConfig, ForceGenConfig};
    pub use crate::data::tensor::{Tensor, Vector};
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::force_gen::BondForceEngine;
    pub use crate::index::{DistributedIndexManager, IndexManager};
    pub use crate::law::{
        BondContext, BondLaw, BondResponse, DEFAULT_LAW_ID, DefaultBondLaw, DefaultParams, Endpoint,
        LawFunctions, LawId, LawRegistry,
    };
    pub use crate::pd_error::PdError;
    pub use crate::topology::node::{GlobalIndex, LocalIndex, NodeId, NodeRef};
    pub use crate::topology::ownership::NodeOwnership;
}
