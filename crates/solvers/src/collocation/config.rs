use serde::{Deserialize, Serialize};

use crate::interior_point;

use super::Scheme;

/// Configuration for a collocation solve.
///
/// Omitted fields take their [`Default`] values when deserialized, so a
/// TOML file only needs the keys it changes:
///
/// ```
/// use trajopt_solvers::collocation::{Config, Scheme};
///
/// let config: Config = toml::from_str(
///     r#"
///     mesh_intervals = 40
///     scheme = "hermite_simpson"
///
///     [solver]
///     max_iters = 200
///     "#,
/// )?;
///
/// assert_eq!(config.scheme, Scheme::HermiteSimpson);
/// assert_eq!(config.solver.constraint_tol, 1e-6);
/// # Ok::<(), toml::de::Error>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Number of mesh intervals `N`; the mesh has `N + 1` points.
    pub mesh_intervals: usize,

    pub scheme: Scheme,

    /// Evaluates per-point and per-interval work on the rayon thread pool.
    ///
    /// Results are identical to a serial solve.
    pub parallel: bool,

    pub solver: interior_point::Config,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mesh_intervals: 20,
            scheme: Scheme::default(),
            parallel: true,
            solver: interior_point::Config::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_fills_in_defaults() {
        let config: Config = serde_json::from_str(r#"{ "parallel": false }"#).unwrap();

        assert!(!config.parallel);
        assert_eq!(config.mesh_intervals, 20);
        assert_eq!(config.solver, interior_point::Config::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(serde_json::from_str::<Config>(r#"{ "mesh": 3 }"#).is_err());
    }
}
