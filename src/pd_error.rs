//! PdError: Unified error type for pd-sieve public APIs
//!
//! Every fallible operation of the engine returns this type. Errors are reported
//! synchronously at the offending operation and are never retried internally; they
//! indicate malformed input or a call-sequence mistake, not transient conditions.

use thiserror::Error;

use crate::topology::node::{GlobalIndex, NodeId};

/// Unified error type for pd-sieve operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PdError {
    /// Invalid engine or law configuration (non-positive horizon, bad constants, ...).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Bond connectivity references an unknown node, forms a self-bond, or the
    /// connectivity arrays disagree in length.
    #[error("Invalid connectivity on level {level}: {reason}")]
    InvalidConnectivity { level: usize, reason: String },

    /// A bond references a law id that was never registered.
    #[error("Bond law {law_id} is not registered (bond {bond} on level {level})")]
    UnregisteredLaw {
        law_id: u32,
        level: usize,
        bond: usize,
    },

    /// Compute was requested on a level that was never initialized.
    #[error("Level {0} has not been initialized")]
    UninitializedLevel(usize),

    /// Shape tensor of a node is singular: its bonded neighborhood does not span space.
    #[error("Degenerate geometry at node {node} on level {level}: shape tensor is singular")]
    DegenerateGeometry { level: usize, node: NodeId },

    /// Ghost exchange reported a failure; propagated unchanged from the index manager.
    #[error("Ghost exchange failed with neighbor {neighbor}: {message}")]
    GhostExchange { neighbor: usize, message: String },

    /// A ghost was requested for a node the index manager does not know about.
    #[error("No owner recorded for global node {0}")]
    MissingOwner(GlobalIndex),

    /// A caller-supplied buffer has the wrong number of entries.
    #[error("Field `{field}` has {found} entries, expected {expected}")]
    FieldSizeMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    /// Another partition aborted the collective step for this level.
    #[error("A remote partition failed while computing level {level}")]
    RemotePartitionFailed { level: usize },

    /// Internal data structure invariant broken (see [`DebugInvariants`](crate::DebugInvariants)).
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

impl PdError {
    /// Shorthand for an [`PdError::InvalidConnectivity`] with a formatted reason.
    pub(crate) fn connectivity(level: usize, reason: impl Into<String>) -> Self {
        PdError::InvalidConnectivity {
            level,
            reason: reason.into(),
        }
    }

    /// True for errors raised because of the input data, as opposed to call order or
    /// communication problems.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            PdError::Configuration(_)
                | PdError::InvalidConnectivity { .. }
                | PdError::UnregisteredLaw { .. }
                | PdError::DegenerateGeometry { .. }
                | PdError::FieldSizeMismatch { .. }
        )
    }
}
