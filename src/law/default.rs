//! Built-in bond law installed under id 0.
//!
//! Correspondence-model force with a St. Venant–Kirchhoff stress, unit influence,
//! partial-volume correction at the horizon, and stretch-driven damage.

use crate::config::ElasticConfig;
use crate::data::tensor::{Tensor, Vector, green_lagrange};
use crate::law::{BondContext, BondLaw, BondResponse};
use crate::topology::node::NodeId;

/// Interpretation of a bond's parameter block by the default law.
///
/// Layout `[critical_stretch, onset_stretch, master_volume, slave_volume]`; missing
/// trailing entries take the defaults below.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DefaultParams {
    /// Stretch at which the bond breaks. Default `∞`.
    pub critical_stretch: f64,
    /// Stretch at which damage starts to grow. Default: the critical stretch.
    pub onset_stretch: f64,
    /// Default 1.
    pub master_volume: f64,
    /// Default 1.
    pub slave_volume: f64,
}

impl DefaultParams {
    pub fn from_block(block: &[f64]) -> Self {
        let critical_stretch = block.first().copied().unwrap_or(f64::INFINITY);
        Self {
            critical_stretch,
            onset_stretch: block.get(1).copied().unwrap_or(critical_stretch),
            master_volume: block.get(2).copied().unwrap_or(1.0),
            slave_volume: block.get(3).copied().unwrap_or(1.0),
        }
    }

    pub fn to_block(&self) -> Vec<f64> {
        vec![
            self.critical_stretch,
            self.onset_stretch,
            self.master_volume,
            self.slave_volume,
        ]
    }

    /// Damage implied by `stretch`: 0 below onset, 1 at or above critical, linear
    /// in between.
    pub fn damage_at(&self, stretch: f64) -> f64 {
        if stretch >= self.critical_stretch {
            1.0
        } else if stretch <= self.onset_stretch {
            0.0
        } else {
            ((stretch - self.onset_stretch) / (self.critical_stretch - self.onset_stretch))
                .clamp(0.0, 1.0)
        }
    }
}

impl Default for DefaultParams {
    fn default() -> Self {
        Self::from_block(&[])
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DefaultBondLaw {
    elastic: ElasticConfig,
}

impl DefaultBondLaw {
    pub fn new(elastic: ElasticConfig) -> Self {
        Self { elastic }
    }

    pub fn elastic(&self) -> &ElasticConfig {
        &self.elastic
    }
}

impl<const D: usize> BondLaw<D> for DefaultBondLaw {
    fn stress(&self, f: &Tensor<D>, _reference_position: &Vector<D>, _node: NodeId) -> Tensor<D> {
        let e = green_lagrange(f);
        let s = Tensor::<D>::identity() * (self.elastic.lambda * e.trace()) + e * (2.0 * self.elastic.mu);
        f * s
    }

    fn force_damage(&self, bond: &BondContext<'_, D>, _history: &mut Vec<f64>) -> BondResponse<D> {
        let params = DefaultParams::from_block(bond.parameters);
        let damage = params.damage_at(bond.stretch()).max(bond.damage);

        let xi = bond.reference_bond();
        let traction = (bond.master.stress * bond.master.shape_tensor_inverse
            + bond.slave.stress * bond.slave.shape_tensor_inverse)
            * xi
            * (bond.influence * bond.volume_fraction);
        let master_force =
            traction * ((1.0 - damage) * params.master_volume * params.slave_volume);
        BondResponse {
            master_force,
            slave_force: -master_force,
            damage,
        }
    }

    fn influence(&self, _rest_length: f64, _horizon: f64) -> f64 {
        1.0
    }

    fn volume_fraction(&self, rest_length: f64, horizon: f64, grid_spacing: f64) -> f64 {
        let half = 0.5 * grid_spacing;
        if rest_length <= horizon - half {
            1.0
        } else if rest_length <= horizon + half {
            (horizon + half - rest_length) / grid_spacing
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::law::Endpoint;
    use nalgebra::{Matrix1, Vector1};

    fn law() -> DefaultBondLaw {
        DefaultBondLaw::new(ElasticConfig { lambda: 1.0, mu: 1.0 })
    }

    fn endpoint(x0: f64, x: f64, f: f64, b: f64) -> Endpoint<1> {
        let ff = Matrix1::new(f);
        Endpoint {
            node: NodeId::new(0),
            reference_position: Vector1::new(x0),
            position: Vector1::new(x),
            velocity: Vector1::zeros(),
            mean_position: Vector1::new(x),
            deformation_gradient: ff,
            shape_tensor: Matrix1::new(b),
            shape_tensor_inverse: Matrix1::new(1.0 / b),
            stress: BondLaw::<1>::stress(&law(), &ff, &Vector1::new(x0), NodeId::new(0)),
        }
    }

    #[test]
    fn stress_vanishes_without_deformation() {
        let p = BondLaw::<3>::stress(&law(), &Tensor::<3>::identity(), &Vector::<3>::zeros(), NodeId::new(0));
        assert_eq!(p, Tensor::<3>::zeros());
    }

    #[test]
    fn params_fill_missing_entries() {
        let p = DefaultParams::from_block(&[0.2]);
        assert_eq!(p.critical_stretch, 0.2);
        assert_eq!(p.onset_stretch, 0.2);
        assert_eq!(p.master_volume, 1.0);
        assert_eq!(DefaultParams::from_block(&p.to_block()), p);
        assert_eq!(DefaultParams::default().damage_at(1.0e9), 0.0);
    }

    #[test]
    fn damage_ramps_between_onset_and_critical() {
        let p = DefaultParams::from_block(&[0.4, 0.2]);
        assert_eq!(p.damage_at(0.1), 0.0);
        assert!((p.damage_at(0.3) - 0.5).abs() < 1e-12);
        assert_eq!(p.damage_at(0.4), 1.0);
    }

    #[test]
    fn volume_fraction_is_partial_at_the_horizon() {
        let vf = |r| BondLaw::<2>::volume_fraction(&law(), r, 3.0, 1.0);
        assert_eq!(vf(2.0), 1.0);
        assert!((vf(3.0) - 0.5).abs() < 1e-12);
        assert_eq!(vf(4.0), 0.0);
    }

    #[test]
    fn stretched_bond_pulls_endpoints_together_and_never_heals() {
        let params = [0.5, 0.25];
        let ctx = BondContext {
            master: endpoint(0.0, 0.0, 1.3, 1.0),
            slave: endpoint(1.0, 1.3, 1.3, 1.0),
            rest_length: 1.0,
            horizon: 1.5,
            grid_spacing: 1.0,
            influence: 1.0,
            volume_fraction: 1.0,
            parameters: &params,
            damage: 0.0,
            time: 0.0,
        };
        let r = BondLaw::<1>::force_damage(&law(), &ctx, &mut Vec::new());
        assert!(r.master_force[0] > 0.0);
        assert_eq!(r.slave_force, -r.master_force);
        assert!((r.damage - 0.2).abs() < 1e-12);

        let relaxed = BondContext {
            slave: endpoint(1.0, 1.0, 1.0, 1.0),
            damage: r.damage,
            ..ctx.clone()
        };
        let r2 = BondLaw::<1>::force_damage(&law(), &relaxed, &mut Vec::new());
        assert_eq!(r2.damage, r.damage);
    }
}
