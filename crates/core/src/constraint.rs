//! Path constraints: `g_l ≤ g(t, x, u) ≤ g_u` at every mesh point.

use crate::{BoxError, PointJacobian};

/// A vector-valued constraint evaluated along the whole trajectory.
///
/// A phase stores its path constraints behind trait objects, so failures are
/// reported as a [`BoxError`] rather than an associated error type. The same
/// purity rules as [`Dynamics`](crate::Dynamics) apply.
pub trait PathConstraint: Send + Sync {
    /// Number of entries returned by [`evaluate`](Self::evaluate).
    fn num_outputs(&self) -> usize;

    /// Evaluates the constraint function.
    ///
    /// # Errors
    ///
    /// Returns an error if the constraint cannot be computed.
    fn evaluate(&self, time: f64, state: &[f64], control: &[f64]) -> Result<Vec<f64>, BoxError>;

    /// Evaluates the analytic Jacobian, if one is available.
    ///
    /// Returns `None` (the default) to request central finite differences.
    fn jacobian(
        &self,
        _time: f64,
        _state: &[f64],
        _control: &[f64],
    ) -> Option<Result<PointJacobian, BoxError>> {
        None
    }
}

/// A path constraint backed by a closure, created with [`from_fn`].
pub struct FromFn<F> {
    outputs: usize,
    f: F,
}

/// Wraps a closure `|t, x, u| -> g` returning `outputs` values as a
/// [`PathConstraint`].
pub fn from_fn<F>(outputs: usize, f: F) -> FromFn<F>
where
    F: Fn(f64, &[f64], &[f64]) -> Vec<f64> + Send + Sync,
{
    FromFn { outputs, f }
}

impl<F> PathConstraint for FromFn<F>
where
    F: Fn(f64, &[f64], &[f64]) -> Vec<f64> + Send + Sync,
{
    fn num_outputs(&self) -> usize {
        self.outputs
    }

    fn evaluate(&self, time: f64, state: &[f64], control: &[f64]) -> Result<Vec<f64>, BoxError> {
        Ok((self.f)(time, state, control))
    }
}

impl std::fmt::Debug for dyn PathConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathConstraint")
            .field("outputs", &self.num_outputs())
            .finish_non_exhaustive()
    }
}
