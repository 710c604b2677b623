//! The finite-dimensional problem solved by NLP solvers.

use nalgebra::{DMatrix, DVector};

use crate::EvalError;

/// A smooth nonlinear program.
///
/// ```text
/// minimize    f(x)
/// subject to  g_l <= g(x) <= g_u
///             x_l <= x <= x_u
/// ```
///
/// Equality constraints use `g_l == g_u`; fixed variables use `x_l == x_u`.
/// Unbounded ends are `±∞`. All evaluations must be deterministic for
/// identical `x`, since solvers compare values across trial points.
pub trait NonlinearProgram {
    /// Number of variables `n`.
    fn num_variables(&self) -> usize;

    /// Number of constraint functions `m`.
    fn num_constraints(&self) -> usize;

    /// Lower and upper variable bounds, each of length `n`.
    fn variable_bounds(&self) -> (Vec<f64>, Vec<f64>);

    /// Lower and upper constraint bounds, each of length `m`.
    fn constraint_bounds(&self) -> (Vec<f64>, Vec<f64>);

    /// Evaluates the objective `f(x)`.
    ///
    /// # Errors
    ///
    /// Returns an [`EvalError`] if the objective cannot be computed.
    fn objective(&self, x: &[f64]) -> Result<f64, EvalError>;

    /// Evaluates the objective gradient `∇f(x)`.
    ///
    /// # Errors
    ///
    /// Returns an [`EvalError`] if the gradient cannot be computed.
    fn gradient(&self, x: &[f64]) -> Result<DVector<f64>, EvalError>;

    /// Evaluates the constraint functions `g(x)`.
    ///
    /// # Errors
    ///
    /// Returns an [`EvalError`] if the constraints cannot be computed.
    fn constraints(&self, x: &[f64]) -> Result<DVector<f64>, EvalError>;

    /// Evaluates the `m × n` constraint Jacobian.
    ///
    /// # Errors
    ///
    /// Returns an [`EvalError`] if the Jacobian cannot be computed.
    fn jacobian(&self, x: &[f64]) -> Result<DMatrix<f64>, EvalError>;

    /// Evaluates the `n × n` Hessian of the Lagrangian
    /// `σ ∇²f(x) + Σ λ_i ∇²g_i(x)`.
    ///
    /// # Errors
    ///
    /// Returns an [`EvalError`] if the Hessian cannot be computed.
    fn hessian(
        &self,
        x: &[f64],
        objective_factor: f64,
        multipliers: &[f64],
    ) -> Result<DMatrix<f64>, EvalError>;
}
