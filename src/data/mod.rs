//! Data module: nodal fields, small tensors and per-level storage.

pub mod field;
pub mod level;
pub mod tensor;

pub use field::{FieldValue, NodeField};
pub use level::{KinematicFields, LevelData, LevelStore};
pub use tensor::{Tensor, Vector};
