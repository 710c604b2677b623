use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration for the interior-point solver.
///
/// Omitted fields take their [`Default`] values when deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Maximum number of Newton iterations.
    pub max_iters: usize,

    /// Largest acceptable absolute constraint residual.
    pub constraint_tol: f64,

    /// Largest acceptable scaled optimality residual.
    pub optimality_tol: f64,

    /// Consecutive infeasible iterations that improve neither the best
    /// constraint violation nor, through an accepted step, the best
    /// objective by 0.1% before the problem is declared infeasible.
    pub stall_iters: usize,

    /// Initial barrier parameter.
    pub mu_init: f64,

    /// Relative distance the starting point is pushed inside its bounds.
    pub bound_push: f64,
}

/// Errors that can occur when validating an interior-point config.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_iters must be at least 1")]
    MaxIters,

    #[error("constraint_tol must be finite and positive")]
    ConstraintTol,

    #[error("optimality_tol must be finite and positive")]
    OptimalityTol,

    #[error("stall_iters must be at least 1")]
    StallIters,

    #[error("mu_init must be finite and positive")]
    MuInit,

    #[error("bound_push must be in (0, 0.5)")]
    BoundPush,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_iters: 1000,
            constraint_tol: 1e-6,
            optimality_tol: 1e-6,
            stall_iters: 30,
            mu_init: 0.1,
            bound_push: 1e-2,
        }
    }
}

impl Config {
    /// Validates iteration limits and tolerances.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |v: f64| v.is_finite() && v > 0.0;

        if self.max_iters == 0 {
            return Err(ConfigError::MaxIters);
        }
        if !positive(self.constraint_tol) {
            return Err(ConfigError::ConstraintTol);
        }
        if !positive(self.optimality_tol) {
            return Err(ConfigError::OptimalityTol);
        }
        if self.stall_iters == 0 {
            return Err(ConfigError::StallIters);
        }
        if !positive(self.mu_init) {
            return Err(ConfigError::MuInit);
        }
        if !positive(self.bound_push) || self.bound_push >= 0.5 {
            return Err(ConfigError::BoundPush);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert_eq!(Config::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_bad_settings() {
        let config = Config {
            max_iters: 0,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::MaxIters));

        let config = Config {
            constraint_tol: -1.0,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ConstraintTol));

        let config = Config {
            optimality_tol: f64::NAN,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::OptimalityTol));

        let config = Config {
            bound_push: 0.5,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::BoundPush));
    }
}
