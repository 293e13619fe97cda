//! Re-export public algorithms.

pub mod bond_forces;
pub mod communicator;
pub mod ghost_exchange;
pub mod kinematics;
pub mod wire;

pub use bond_forces::{Evaluation, ResolvedLaws, evaluate};
pub use kinematics::{BondWeight, deformation_gradients, mean_positions, shape_tensors};
