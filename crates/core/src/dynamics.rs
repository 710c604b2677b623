//! The dynamics callback: `f(t, x, u) -> dx/dt`.

use std::convert::Infallible;

use nalgebra::{DMatrix, DVector};

/// A dynamical system `dx/dt = f(t, x, u)`.
///
/// Implementations must be deterministic and free of side effects: solvers
/// call them many times per iteration (once per mesh point, plus
/// perturbations for finite differences), possibly from several threads, and
/// rely on identical inputs producing identical outputs.
pub trait Dynamics {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Evaluates the state derivative.
    ///
    /// The returned vector must have one entry per state.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the derivative cannot be computed.
    fn derivative(&self, time: f64, state: &[f64], control: &[f64])
    -> Result<Vec<f64>, Self::Error>;

    /// Evaluates the analytic Jacobian of the derivative, if one is available.
    ///
    /// Returns `None` (the default) to request central finite differences.
    fn jacobian(
        &self,
        _time: f64,
        _state: &[f64],
        _control: &[f64],
    ) -> Option<Result<PointJacobian, Self::Error>> {
        None
    }
}

/// Partial derivatives of a point callback with respect to its inputs.
///
/// Each matrix has one row per callback output.
#[derive(Debug, Clone, PartialEq)]
pub struct PointJacobian {
    /// `∂out/∂x`, one column per state.
    pub state: DMatrix<f64>,

    /// `∂out/∂u`, one column per control.
    pub control: DMatrix<f64>,

    /// `∂out/∂t`.
    pub time: DVector<f64>,
}

impl PointJacobian {
    /// Creates an all-zero Jacobian.
    #[must_use]
    pub fn zeros(outputs: usize, states: usize, controls: usize) -> Self {
        Self {
            state: DMatrix::zeros(outputs, states),
            control: DMatrix::zeros(outputs, controls),
            time: DVector::zeros(outputs),
        }
    }

    /// Number of callback outputs (rows).
    #[must_use]
    pub fn outputs(&self) -> usize {
        self.time.len()
    }
}

/// Dynamics backed by a closure, created with [`from_fn`].
#[derive(Clone, Copy)]
pub struct FromFn<F>(F);

/// Wraps a closure `|t, x, u| -> dx/dt` as [`Dynamics`].
///
/// The closure cannot fail; its Jacobian is formed by finite differences.
pub fn from_fn<F>(f: F) -> FromFn<F>
where
    F: Fn(f64, &[f64], &[f64]) -> Vec<f64>,
{
    FromFn(f)
}

impl<F> Dynamics for FromFn<F>
where
    F: Fn(f64, &[f64], &[f64]) -> Vec<f64>,
{
    type Error = Infallible;

    fn derivative(&self, time: f64, state: &[f64], control: &[f64]) -> Result<Vec<f64>, Infallible> {
        Ok((self.0)(time, state, control))
    }
}

impl<D: Dynamics + ?Sized> Dynamics for &D {
    type Error = D::Error;

    fn derivative(&self, time: f64, state: &[f64], control: &[f64]) -> Result<Vec<f64>, D::Error> {
        (**self).derivative(time, state, control)
    }

    fn jacobian(
        &self,
        time: f64,
        state: &[f64],
        control: &[f64],
    ) -> Option<Result<PointJacobian, D::Error>> {
        (**self).jacobian(time, state, control)
    }
}
