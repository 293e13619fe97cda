//! Bonds: raw connectivity in, translated and ghost-resolved bond tables out.

pub mod builder;
pub mod table;

pub use builder::build_table;
pub use table::{Bond, BondParams, BondPhase, BondState, BondTable, RawConnectivity};
