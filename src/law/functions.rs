//! Laws assembled from individual function slots.
//!
//! Mirrors the four-slot registration style: a stress function is mandatory, the
//! other three slots are optional and bound to the built-in default law when the
//! law is registered.

use std::fmt;
use std::sync::Arc;

use crate::data::tensor::{Tensor, Vector};
use crate::law::{BondContext, BondLaw, BondResponse, DefaultBondLaw};
use crate::topology::node::NodeId;

pub type StressFn<const D: usize> =
    Arc<dyn Fn(&Tensor<D>, &Vector<D>, NodeId) -> Tensor<D> + Send + Sync>;
pub type ForceDamageFn<const D: usize> =
    Arc<dyn Fn(&BondContext<'_, D>, &mut Vec<f64>) -> BondResponse<D> + Send + Sync>;
pub type InfluenceFn = Arc<dyn Fn(f64, f64) -> f64 + Send + Sync>;
pub type VolumeFractionFn = Arc<dyn Fn(f64, f64, f64) -> f64 + Send + Sync>;

/// Function slots for [`LawRegistry::register_functions`](crate::law::LawRegistry::register_functions).
#[derive(Clone)]
pub struct LawFunctions<const D: usize> {
    pub stress: StressFn<D>,
    pub force_damage: Option<ForceDamageFn<D>>,
    pub influence: Option<InfluenceFn>,
    pub volume_fraction: Option<VolumeFractionFn>,
    pub breakage_threshold: Option<f64>,
}

impl<const D: usize> LawFunctions<D> {
    pub fn new<F>(stress: F) -> Self
    where
        F: Fn(&Tensor<D>, &Vector<D>, NodeId) -> Tensor<D> + Send + Sync + 'static,
    {
        Self {
            stress: Arc::new(stress),
            force_damage: None,
            influence: None,
            volume_fraction: None,
            breakage_threshold: None,
        }
    }

    pub fn with_force_damage<F>(mut self, f: F) -> Self
    where
        F: Fn(&BondContext<'_, D>, &mut Vec<f64>) -> BondResponse<D> + Send + Sync + 'static,
    {
        self.force_damage = Some(Arc::new(f));
        self
    }

    pub fn with_influence<F>(mut self, f: F) -> Self
    where
        F: Fn(f64, f64) -> f64 + Send + Sync + 'static,
    {
        self.influence = Some(Arc::new(f));
        self
    }

    pub fn with_volume_fraction<F>(mut self, f: F) -> Self
    where
        F: Fn(f64, f64, f64) -> f64 + Send + Sync + 'static,
    {
        self.volume_fraction = Some(Arc::new(f));
        self
    }

    pub fn with_breakage_threshold(mut self, threshold: f64) -> Self {
        self.breakage_threshold = Some(threshold);
        self
    }
}

/// A [`BondLaw`] whose four operations are closures, every slot filled.
#[derive(Clone)]
pub struct FnBondLaw<const D: usize> {
    stress: StressFn<D>,
    force_damage: ForceDamageFn<D>,
    influence: InfluenceFn,
    volume_fraction: VolumeFractionFn,
    breakage_threshold: f64,
}

impl<const D: usize> FnBondLaw<D> {
    /// Resolve unset slots against `default`.
    pub fn resolve(fns: LawFunctions<D>, default: DefaultBondLaw) -> Self {
        let force_damage: ForceDamageFn<D> = match fns.force_damage {
            Some(f) => f,
            None => Arc::new(move |bond: &BondContext<'_, D>, history: &mut Vec<f64>| {
                BondLaw::<D>::force_damage(&default, bond, history)
            }),
        };
        let influence: InfluenceFn = match fns.influence {
            Some(f) => f,
            None => Arc::new(move |r: f64, horizon: f64| BondLaw::<D>::influence(&default, r, horizon)),
        };
        let volume_fraction: VolumeFractionFn = match fns.volume_fraction {
            Some(f) => f,
            None => Arc::new(move |r: f64, horizon: f64, h: f64| {
                BondLaw::<D>::volume_fraction(&default, r, horizon, h)
            }),
        };
        Self {
            stress: fns.stress,
            force_damage,
            influence,
            volume_fraction,
            breakage_threshold: fns
                .breakage_threshold
                .unwrap_or_else(|| BondLaw::<D>::breakage_threshold(&default)),
        }
    }
}

impl<const D: usize> BondLaw<D> for FnBondLaw<D> {
    fn stress(&self, f: &Tensor<D>, x0: &Vector<D>, node: NodeId) -> Tensor<D> {
        (self.stress)(f, x0, node)
    }

    fn force_damage(&self, bond: &BondContext<'_, D>, history: &mut Vec<f64>) -> BondResponse<D> {
        (self.force_damage)(bond, history)
    }

    fn influence(&self, rest_length: f64, horizon: f64) -> f64 {
        (self.influence)(rest_length, horizon)
    }

    fn volume_fraction(&self, rest_length: f64, horizon: f64, grid_spacing: f64) -> f64 {
        (self.volume_fraction)(rest_length, horizon, grid_spacing)
    }

    fn breakage_threshold(&self) -> f64 {
        self.breakage_threshold
    }
}

impl<const D: usize> fmt::Debug for FnBondLaw<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnBondLaw")
            .field("breakage_threshold", &self.breakage_threshold)
            .finish_non_exhaustive()
    }
}
