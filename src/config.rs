//! Engine configuration.
//!
//! Plain serde structs; reading them from a file is left to the caller.

use serde::{Deserialize, Serialize};

use crate::pd_error::PdError;

/// Lamé constants of the default St. Venant–Kirchhoff stress law.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElasticConfig {
    pub lambda: f64,
    pub mu: f64,
}

impl Default for ElasticConfig {
    fn default() -> Self {
        Self {
            lambda: 1.0,
            mu: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceGenConfig {
    /// Interaction radius in the reference configuration.
    pub horizon: f64,
    /// Lagrangian point spacing, used by the partial-volume correction.
    pub grid_spacing: f64,
    pub elastic: ElasticConfig,
}

impl Default for ForceGenConfig {
    fn default() -> Self {
        Self {
            horizon: 3.0,
            grid_spacing: 1.0,
            elastic: ElasticConfig::default(),
        }
    }
}

impl ForceGenConfig {
    pub fn validate(&self) -> Result<(), PdError> {
        if !(self.horizon.is_finite() && self.horizon > 0.0) {
            return Err(PdError::Configuration(format!(
                "horizon must be positive, got {}",
                self.horizon
            )));
        }
        if !(self.grid_spacing.is_finite() && self.grid_spacing > 0.0) {
            return Err(PdError::Configuration(format!(
                "grid spacing must be positive, got {}",
                self.grid_spacing
            )));
        }
        let ElasticConfig { lambda, mu } = self.elastic;
        if !lambda.is_finite() || !mu.is_finite() || mu < 0.0 {
            return Err(PdError::Configuration(format!(
                "invalid Lamé constants (lambda = {lambda}, mu = {mu})"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_json_with_defaults() {
        let cfg: ForceGenConfig = serde_json::from_str(r#"{ "horizon": 1.5 }"#).unwrap();
        assert_eq!(cfg.horizon, 1.5);
        assert_eq!(cfg.grid_spacing, 1.0);
        assert_eq!(cfg.elastic, ElasticConfig::default());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn non_positive_horizon_is_rejected() {
        for horizon in [0.0, -1.0, f64::NAN] {
            let cfg = ForceGenConfig {
                horizon,
                ..Default::default()
            };
            assert!(matches!(cfg.validate(), Err(PdError::Configuration(_))));
        }
    }

    #[test]
    fn negative_shear_modulus_is_rejected() {
        let cfg = ForceGenConfig {
            elastic: ElasticConfig { lambda: 1.0, mu: -2.0 },
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
