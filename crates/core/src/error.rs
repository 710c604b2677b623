use thiserror::Error;

/// A boxed error returned by caller-supplied callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A finite-difference Jacobian produced a non-finite entry.
///
/// Raised when a perturbed callback evaluation returns `NaN` or `±∞`, which
/// usually means the perturbation stepped outside the callback's domain.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("non-finite value while perturbing {variable} at t = {time}")]
pub struct JacobianError {
    /// Which input was being perturbed.
    pub variable: Perturbed,

    /// Time at which the callback was evaluated.
    pub time: f64,
}

/// Identifies the input perturbed by a finite-difference step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Perturbed {
    State(usize),
    Control(usize),
    Time,
}

impl std::fmt::Display for Perturbed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::State(i) => write!(f, "state {i}"),
            Self::Control(i) => write!(f, "control {i}"),
            Self::Time => write!(f, "time"),
        }
    }
}

/// Errors raised while evaluating an NLP or one of its callbacks.
#[derive(Debug, Error)]
pub enum EvalError {
    /// A caller-supplied callback returned an error.
    #[error("callback failed")]
    Callback(#[source] BoxError),

    /// A finite-difference Jacobian could not be formed.
    #[error(transparent)]
    Jacobian(#[from] JacobianError),

    /// A callback produced `NaN` or `±∞`.
    #[error("non-finite {quantity}")]
    NonFinite { quantity: &'static str },

    /// A callback produced an output of the wrong length.
    #[error("{quantity} has length {actual}, expected {expected}")]
    Dimension {
        quantity: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl EvalError {
    pub fn callback<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
        Self::Callback(Box::new(err))
    }

    /// Returns `true` if the error reflects a numerical domain problem.
    ///
    /// Solvers may recover from these by shortening a step, whereas callback
    /// failures and dimension errors are always fatal.
    #[must_use]
    pub fn is_numerical(&self) -> bool {
        matches!(self, Self::NonFinite { .. } | Self::Jacobian(_))
    }
}
