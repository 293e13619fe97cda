//! Per-level storage: bond table, ghost map and ghost-replicated field buffers.

use crate::bond::BondTable;
use crate::data::field::NodeField;
use crate::data::tensor::{Tensor, Vector};
use crate::debug_invariants::DebugInvariants;
use crate::index::GhostMap;
use crate::pd_error::PdError;

/// Nodal fields of one level, each sized owned + ghost.
#[derive(Clone, Debug, PartialEq)]
pub struct KinematicFields<const D: usize> {
    pub reference: NodeField<Vector<D>>,
    pub position: NodeField<Vector<D>>,
    pub velocity: NodeField<Vector<D>>,
    pub mean_position: NodeField<Vector<D>>,
    pub shape_tensor: NodeField<Tensor<D>>,
    pub shape_tensor_inverse: NodeField<Tensor<D>>,
    pub deformation_gradient: NodeField<Tensor<D>>,
}

impl<const D: usize> KinematicFields<D> {
    /// Fields whose reference configuration is `reference`; everything else zeroed.
    pub fn new(reference: NodeField<Vector<D>>) -> Self {
        let (owned, ghosts) = (reference.owned_len(), reference.ghost_len());
        Self {
            position: NodeField::zeros(owned, ghosts),
            velocity: NodeField::zeros(owned, ghosts),
            mean_position: NodeField::zeros(owned, ghosts),
            shape_tensor: NodeField::zeros(owned, ghosts),
            shape_tensor_inverse: NodeField::zeros(owned, ghosts),
            deformation_gradient: NodeField::zeros(owned, ghosts),
            reference,
        }
    }

    fn sizes(&self) -> [(&'static str, usize, usize); 7] {
        [
            ("reference", self.reference.owned_len(), self.reference.ghost_len()),
            ("position", self.position.owned_len(), self.position.ghost_len()),
            ("velocity", self.velocity.owned_len(), self.velocity.ghost_len()),
            ("mean position", self.mean_position.owned_len(), self.mean_position.ghost_len()),
            ("shape tensor", self.shape_tensor.owned_len(), self.shape_tensor.ghost_len()),
            (
                "inverse shape tensor",
                self.shape_tensor_inverse.owned_len(),
                self.shape_tensor_inverse.ghost_len(),
            ),
            (
                "deformation gradient",
                self.deformation_gradient.owned_len(),
                self.deformation_gradient.ghost_len(),
            ),
        ]
    }
}

/// Everything the engine keeps for one initialized level.
#[derive(Clone, Debug)]
pub struct LevelData<const D: usize> {
    pub table: BondTable,
    pub ghosts: GhostMap,
    pub fields: KinematicFields<D>,
    /// Bonds per owned node.
    pub bond_counts: Vec<usize>,
    /// Simulation time of the last initialization.
    pub initialized_at: f64,
}

impl<const D: usize> LevelData<D> {
    pub fn owned_len(&self) -> usize {
        self.fields.reference.owned_len()
    }
}

impl<const D: usize> DebugInvariants for LevelData<D> {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "LevelData");
    }

    fn validate_invariants(&self) -> Result<(), PdError> {
        self.table.validate_invariants()?;
        let owned = self.owned_len();
        let ghosts = self.ghosts.len();
        if self.table.ghosts().len() != ghosts {
            return Err(PdError::InvariantViolation(format!(
                "bond table needs {} ghosts, ghost map holds {ghosts}",
                self.table.ghosts().len()
            )));
        }
        for (name, o, g) in self.fields.sizes() {
            if o != owned || g != ghosts {
                return Err(PdError::InvariantViolation(format!(
                    "{name} field sized {o} + {g}, expected {owned} + {ghosts}"
                )));
            }
        }
        if self.bond_counts.len() != owned {
            return Err(PdError::InvariantViolation(format!(
                "{} bond counts for {owned} owned nodes",
                self.bond_counts.len()
            )));
        }
        Ok(())
    }
}

/// Level index → level data. A level is initialized iff it has an entry.
#[derive(Clone, Debug, Default)]
pub struct LevelStore<const D: usize> {
    levels: Vec<Option<LevelData<D>>>,
}

impl<const D: usize> LevelStore<D> {
    pub fn new() -> Self {
        Self { levels: Vec::new() }
    }

    pub fn is_initialized(&self, level: usize) -> bool {
        matches!(self.levels.get(level), Some(Some(_)))
    }

    pub fn get(&self, level: usize) -> Result<&LevelData<D>, PdError> {
        self.levels
            .get(level)
            .and_then(Option::as_ref)
            .ok_or(PdError::UninitializedLevel(level))
    }

    pub fn get_mut(&mut self, level: usize) -> Result<&mut LevelData<D>, PdError> {
        self.levels
            .get_mut(level)
            .and_then(Option::as_mut)
            .ok_or(PdError::UninitializedLevel(level))
    }

    /// Install `data` for `level`, returning what was there before.
    pub fn insert(&mut self, level: usize, data: LevelData<D>) -> Option<LevelData<D>> {
        if self.levels.len() <= level {
            self.levels.resize_with(level + 1, || None);
        }
        self.levels[level].replace(data)
    }

    pub fn remove(&mut self, level: usize) -> Option<LevelData<D>> {
        self.levels.get_mut(level).and_then(Option::take)
    }
}
