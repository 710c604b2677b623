use thiserror::Error;

use trajopt_core::EvalError;

use super::ConfigError;

/// Errors that can occur during an interior-point solve.
///
/// Running out of iterations or failing to converge is not an error; see
/// [`Status`](super::Status).
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid config: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("{kind} {index} has invalid bounds [{lower}, {upper}]")]
    InvalidBounds {
        kind: &'static str,
        index: usize,
        lower: f64,
        upper: f64,
    },

    #[error("{quantity} has length {actual}, expected {expected}")]
    Dimension {
        quantity: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("solver has not been started")]
    NotStarted,

    /// A problem evaluation failed at an accepted iterate.
    ///
    /// `x` is the iterate at which evaluation failed.
    #[error("evaluation failed at iteration {iter}")]
    Evaluation {
        iter: usize,
        x: Vec<f64>,
        #[source]
        source: EvalError,
    },
}

impl Error {
    pub(super) fn evaluation(iter: usize, x: Vec<f64>, source: EvalError) -> Self {
        Self::Evaluation { iter, x, source }
    }
}
