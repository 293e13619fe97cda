//! Node identity and ownership.

pub mod node;
pub mod ownership;
