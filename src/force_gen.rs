//! The peridynamic force generator.
//!
//! [`BondForceEngine`] owns the law registry and the per-level data, and drives the
//! pipeline for one level at a time:
//!
//! 1. copy the caller's positions and velocities and refresh their ghosts,
//! 2. mean positions, refresh,
//! 3. shape tensors and their inverses, refresh,
//! 4. deformation gradients, refresh,
//! 5. bond evaluation,
//! 6. commit: add forces and damage to the caller's buffers, store new bond states.
//!
//! Nothing the caller can observe changes before step 6, so a failed call leaves the
//! caller's buffers and the bond states exactly as they were. Every partition runs the
//! same sequence of collectives; local failures are agreed on at abort checkpoints so
//! the other partitions return [`PdError::RemotePartitionFailed`] instead of blocking.

use std::sync::Arc;

use crate::algs::bond_forces::{self, EvalParams, ResolvedLaws};
use crate::algs::kinematics;
use crate::bond::{BondTable, RawConnectivity, build_table};
use crate::config::ForceGenConfig;
use crate::data::field::NodeField;
use crate::data::level::{KinematicFields, LevelData, LevelStore};
use crate::data::tensor::{Tensor, Vector};
use crate::debug_invariants::DebugInvariants;
use crate::index::{IndexManager, checkpoint};
use crate::law::{BondLaw, DefaultBondLaw, LawFunctions, LawId, LawRegistry};
use crate::pd_error::PdError;

/// Bond-based peridynamic force and damage engine for `D` spatial dimensions.
pub struct BondForceEngine<const D: usize, M> {
    config: ForceGenConfig,
    registry: LawRegistry<D>,
    manager: M,
    levels: LevelStore<D>,
}

impl<const D: usize, M: IndexManager> BondForceEngine<D, M> {
    /// Engine with the default law under id 0, built from `config.elastic`.
    pub fn new(config: ForceGenConfig, manager: M) -> Result<Self, PdError> {
        let registry = LawRegistry::new(DefaultBondLaw::new(config.elastic));
        Self::with_registry(config, registry, manager)
    }

    /// Engine using a pre-populated registry.
    pub fn with_registry(config: ForceGenConfig, registry: LawRegistry<D>, manager: M) -> Result<Self, PdError> {
        config.validate()?;
        if D == 0 {
            return Err(PdError::Configuration("spatial dimension must be at least 1".into()));
        }
        log::debug!(
            "bond force engine: D = {D}, horizon = {}, grid spacing = {}, laws {:?}",
            config.horizon,
            config.grid_spacing,
            registry.ids().collect::<Vec<_>>()
        );
        Ok(Self {
            config,
            registry,
            manager,
            levels: LevelStore::new(),
        })
    }

    /// Install or overwrite the law for `id`.
    pub fn register_bond_law(&mut self, id: LawId, law: Arc<dyn BondLaw<D>>) {
        self.registry.register(id, law);
    }

    /// Install or overwrite the law for `id` from function slots.
    pub fn register_bond_law_functions(&mut self, id: LawId, fns: LawFunctions<D>) {
        self.registry.register_functions(id, fns);
    }

    /// Build the bond table and buffers of `level` from `connectivity`.
    ///
    /// `reference_positions` holds one entry per owned node in local order. With
    /// `initial_time` all bond states start intact; otherwise states are carried over
    /// from the previous initialization if the connectivity is unchanged.
    /// Collective over all partitions. On error the level is left uninitialized.
    pub fn initialize_level(
        &mut self,
        level: usize,
        connectivity: &RawConnectivity,
        reference_positions: &[Vector<D>],
        time: f64,
        initial_time: bool,
    ) -> Result<(), PdError> {
        // Any failure below leaves the level uninitialized.
        let previous = self.levels.remove(level);
        let owned = checkpoint(
            &self.manager,
            level,
            self.manager.owned_count(level).and_then(|owned| {
                expect_len("reference positions", owned, reference_positions.len()).map(|_| owned)
            }),
        )?;

        let (mut table, ghosts) = build_table(level, connectivity, &mut self.manager)?;
        let mut reference = NodeField::from_owned("reference positions", reference_positions, owned, ghosts.len())?;
        self.manager.refresh_ghost_values(level, &mut reference)?;
        checkpoint(&self.manager, level, table.assign_rest_lengths(&reference))?;

        match previous {
            Some(prev) if !initial_time && prev.table.same_connectivity(&table) => {
                log::debug!("level {level}: connectivity unchanged, keeping bond states");
                table.adopt_states(prev.table);
            }
            Some(prev) if !prev.table.same_connectivity(&table) => {
                log::warn!(
                    "level {level}: connectivity changed ({} -> {} bonds), bond states reset",
                    prev.table.len(),
                    table.len()
                );
            }
            Some(_) => log::debug!("level {level}: re-initialized, bond states reset"),
            None => {}
        }

        let bond_counts = table.bond_counts(owned);
        let data = LevelData {
            fields: KinematicFields::new(reference),
            bond_counts,
            ghosts,
            table,
            initialized_at: time,
        };
        data.debug_assert_invariants();
        log::info!(
            "level {level} initialized at t = {time}: {} bonds, {owned} owned nodes, {} ghosts",
            data.table.len(),
            data.ghosts.len()
        );
        self.levels.insert(level, data);
        Ok(())
    }

    /// Add this step's bond forces and node damage of `level` to `force` and `damage`.
    ///
    /// All slices are indexed by local id of the owned nodes. Collective over all
    /// partitions. On error neither the buffers nor the bond states change.
    pub fn compute_forces_and_damage(
        &mut self,
        level: usize,
        force: &mut [Vector<D>],
        damage: &mut [f64],
        positions: &[Vector<D>],
        velocities: &[Vector<D>],
        time: f64,
    ) -> Result<(), PdError> {
        let Self {
            config,
            registry,
            manager,
            levels,
        } = self;
        let manager = &*manager;

        let prepared = levels.get_mut(level).and_then(|data| {
            let owned = data.owned_len();
            expect_len("force", owned, force.len())?;
            expect_len("damage", owned, damage.len())?;
            expect_len("positions", owned, positions.len())?;
            expect_len("velocities", owned, velocities.len())?;
            let resolved = ResolvedLaws::resolve(&*registry, &data.table, config.horizon, config.grid_spacing)?;
            data.fields.position.copy_owned_from("positions", positions)?;
            data.fields.velocity.copy_owned_from("velocities", velocities)?;
            Ok((data, resolved))
        });
        let (data, resolved) = checkpoint(manager, level, prepared)?;
        let LevelData {
            table,
            fields,
            bond_counts,
            ..
        } = data;
        log::debug!("level {level}: computing {} bonds at t = {time}", table.len());

        manager.refresh_ghost_values(level, &mut fields.position)?;
        manager.refresh_ghost_values(level, &mut fields.velocity)?;

        kinematics::mean_positions(table, &resolved.weights, &fields.position, &mut fields.mean_position);
        manager.refresh_ghost_values(level, &mut fields.mean_position)?;

        let shapes = kinematics::shape_tensors(level, table, &resolved.weights, fields);
        checkpoint(manager, level, shapes)?;
        manager.refresh_ghost_values(level, &mut fields.shape_tensor)?;
        manager.refresh_ghost_values(level, &mut fields.shape_tensor_inverse)?;

        kinematics::deformation_gradients(table, &resolved.weights, bond_counts, fields);
        manager.refresh_ghost_values(level, &mut fields.deformation_gradient)?;

        let params = EvalParams {
            horizon: config.horizon,
            grid_spacing: config.grid_spacing,
            time,
        };
        let evaluation = bond_forces::evaluate(table, &resolved, fields, bond_counts, params);

        for (f, df) in force.iter_mut().zip(&evaluation.forces) {
            *f += df;
        }
        for (d, dd) in damage.iter_mut().zip(&evaluation.node_damage) {
            *d += dd;
        }
        table.states_mut().clone_from_slice(&evaluation.states);
        if evaluation.newly_broken > 0 {
            log::warn!(
                "level {level}: {} bonds broke at t = {time} ({} of {} broken)",
                evaluation.newly_broken,
                table.broken_count(),
                table.len()
            );
        }
        Ok(())
    }

    /// Drop everything stored for `level`. Returns whether it was initialized.
    pub fn clear_level(&mut self, level: usize) -> bool {
        let cleared = self.levels.remove(level).is_some();
        if cleared {
            log::info!("level {level} cleared");
        }
        cleared
    }

    pub fn is_level_initialized(&self, level: usize) -> bool {
        self.levels.is_initialized(level)
    }

    pub fn bond_table(&self, level: usize) -> Result<&BondTable, PdError> {
        Ok(&self.levels.get(level)?.table)
    }

    /// Mean positions of the owned nodes from the last computation.
    pub fn mean_positions(&self, level: usize) -> Result<&[Vector<D>], PdError> {
        Ok(self.levels.get(level)?.fields.mean_position.owned_values())
    }

    /// Shape tensors of the owned nodes from the last computation.
    pub fn shape_tensors(&self, level: usize) -> Result<&[Tensor<D>], PdError> {
        Ok(self.levels.get(level)?.fields.shape_tensor.owned_values())
    }

    /// Deformation gradients of the owned nodes from the last computation.
    pub fn deformation_gradients(&self, level: usize) -> Result<&[Tensor<D>], PdError> {
        Ok(self.levels.get(level)?.fields.deformation_gradient.owned_values())
    }

    pub fn level_data(&self, level: usize) -> Result<&LevelData<D>, PdError> {
        self.levels.get(level)
    }

    pub fn config(&self) -> &ForceGenConfig {
        &self.config
    }

    pub fn registry(&self) -> &LawRegistry<D> {
        &self.registry
    }

    pub fn manager(&self) -> &M {
        &self.manager
    }

    /// Mutable access to the index manager, e.g. to install a new level's ownership.
    pub fn manager_mut(&mut self) -> &mut M {
        &mut self.manager
    }
}

fn expect_len(field: &'static str, expected: usize, found: usize) -> Result<(), PdError> {
    if expected == found {
        Ok(())
    } else {
        Err(PdError::FieldSizeMismatch { field, expected, found })
    }
}
