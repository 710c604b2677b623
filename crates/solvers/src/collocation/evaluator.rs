//! Checked evaluation of the dynamics and path-constraint callbacks.

use nalgebra::{DMatrix, DVector};
use trajopt_core::{
    Dynamics, EvalError, JacobianError, PathConstraint, Perturbed, Phase, PointJacobian,
};

use crate::finite_difference::{FIRST_ORDER_STEP, step};

/// Evaluates the callbacks of one phase at single points `(t, x, u)`.
///
/// Every output is checked for length and finiteness. Jacobians come from
/// the callback when it supplies one and from central differences otherwise.
pub struct Evaluator<'a, D> {
    dynamics: &'a D,
    phase: &'a Phase,
    num_path_outputs: usize,
}

impl<'a, D: Dynamics> Evaluator<'a, D> {
    pub fn new(dynamics: &'a D, phase: &'a Phase) -> Self {
        let num_path_outputs = phase
            .path_constraints()
            .iter()
            .map(|info| info.constraint().num_outputs())
            .sum();
        Self {
            dynamics,
            phase,
            num_path_outputs,
        }
    }

    /// Total number of path-constraint outputs at one point.
    pub fn num_path_outputs(&self) -> usize {
        self.num_path_outputs
    }

    /// Evaluates `dx/dt`.
    ///
    /// # Errors
    ///
    /// Returns an [`EvalError`] if the callback fails or returns a vector of
    /// the wrong length or with non-finite entries.
    pub fn derivative(&self, time: f64, state: &[f64], control: &[f64]) -> Result<Vec<f64>, EvalError> {
        let dxdt = self
            .dynamics
            .derivative(time, state, control)
            .map_err(EvalError::callback)?;
        check_output(&dxdt, self.phase.num_states(), "dynamics derivative")?;
        Ok(dxdt)
    }

    /// Jacobian of `dx/dt` with respect to state, control, and time.
    ///
    /// # Errors
    ///
    /// Returns an [`EvalError`] if the callback fails, an analytic Jacobian
    /// has the wrong shape, or a perturbed evaluation is not finite.
    pub fn dynamics_jacobian(
        &self,
        time: f64,
        state: &[f64],
        control: &[f64],
    ) -> Result<PointJacobian, EvalError> {
        match self.dynamics.jacobian(time, state, control) {
            Some(result) => {
                let jac = result.map_err(EvalError::callback)?;
                check_jacobian(
                    &jac,
                    self.phase.num_states(),
                    state.len(),
                    control.len(),
                    "dynamics jacobian",
                )?;
                Ok(jac)
            }
            None => central_difference(
                |t, x, u| self.derivative(t, x, u),
                self.phase.num_states(),
                time,
                state,
                control,
            ),
        }
    }

    /// Evaluates every path constraint, concatenated in registration order.
    ///
    /// # Errors
    ///
    /// Returns an [`EvalError`] if any constraint fails or returns a vector of
    /// the wrong length or with non-finite entries.
    pub fn path(&self, time: f64, state: &[f64], control: &[f64]) -> Result<Vec<f64>, EvalError> {
        let mut values = Vec::with_capacity(self.num_path_outputs);
        for info in self.phase.path_constraints() {
            values.extend(evaluate_constraint(info.constraint(), time, state, control)?);
        }
        Ok(values)
    }

    /// Jacobian of [`path`](Self::path), one row block per constraint.
    ///
    /// # Errors
    ///
    /// See [`dynamics_jacobian`](Self::dynamics_jacobian).
    pub fn path_jacobian(
        &self,
        time: f64,
        state: &[f64],
        control: &[f64],
    ) -> Result<PointJacobian, EvalError> {
        let mut stacked = PointJacobian::zeros(self.num_path_outputs, state.len(), control.len());
        let mut row = 0;

        for info in self.phase.path_constraints() {
            let constraint = info.constraint();
            let outputs = constraint.num_outputs();
            let jac = match constraint.jacobian(time, state, control) {
                Some(result) => {
                    let jac = result.map_err(EvalError::Callback)?;
                    check_jacobian(
                        &jac,
                        outputs,
                        state.len(),
                        control.len(),
                        "path constraint jacobian",
                    )?;
                    jac
                }
                None => central_difference(
                    |t, x, u| evaluate_constraint(constraint, t, x, u),
                    outputs,
                    time,
                    state,
                    control,
                )?,
            };

            stacked.state.rows_mut(row, outputs).copy_from(&jac.state);
            stacked.control.rows_mut(row, outputs).copy_from(&jac.control);
            stacked.time.rows_mut(row, outputs).copy_from(&jac.time);
            row += outputs;
        }

        Ok(stacked)
    }
}

fn evaluate_constraint(
    constraint: &dyn PathConstraint,
    time: f64,
    state: &[f64],
    control: &[f64],
) -> Result<Vec<f64>, EvalError> {
    let values = constraint
        .evaluate(time, state, control)
        .map_err(EvalError::Callback)?;
    check_output(&values, constraint.num_outputs(), "path constraint output")?;
    Ok(values)
}

fn check_output(values: &[f64], expected: usize, quantity: &'static str) -> Result<(), EvalError> {
    if values.len() != expected {
        return Err(EvalError::Dimension {
            quantity,
            expected,
            actual: values.len(),
        });
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(EvalError::NonFinite { quantity });
    }
    Ok(())
}

fn check_jacobian(
    jac: &PointJacobian,
    outputs: usize,
    states: usize,
    controls: usize,
    quantity: &'static str,
) -> Result<(), EvalError> {
    let shapes = [
        (jac.state.shape(), (outputs, states)),
        (jac.control.shape(), (outputs, controls)),
        (jac.time.shape(), (outputs, 1)),
    ];
    if let Some(&((rows, cols), (expected_rows, expected_cols))) =
        shapes.iter().find(|(actual, expected)| actual != expected)
    {
        return Err(EvalError::Dimension {
            quantity,
            expected: expected_rows * expected_cols,
            actual: rows * cols,
        });
    }

    let mut entries = jac.state.iter().chain(jac.control.iter()).chain(jac.time.iter());
    if entries.any(|v| !v.is_finite()) {
        return Err(EvalError::NonFinite { quantity });
    }
    Ok(())
}

/// Central-difference Jacobian of a point function over state, control, and
/// time.
///
/// A perturbed evaluation that comes back non-finite is reported as a
/// [`JacobianError`] naming the perturbed input.
fn central_difference<F>(
    f: F,
    outputs: usize,
    time: f64,
    state: &[f64],
    control: &[f64],
) -> Result<PointJacobian, EvalError>
where
    F: Fn(f64, &[f64], &[f64]) -> Result<Vec<f64>, EvalError>,
{
    let perturbed = |variable: Perturbed, result: Result<Vec<f64>, EvalError>| match result {
        Ok(values) => Ok(DVector::from_vec(values)),
        Err(EvalError::NonFinite { .. }) => Err(EvalError::Jacobian(JacobianError { variable, time })),
        Err(err) => Err(err),
    };

    let mut x = state.to_vec();
    let mut state_jac = DMatrix::zeros(outputs, state.len());
    for i in 0..state.len() {
        let h = step(state[i], FIRST_ORDER_STEP);
        x[i] = state[i] + h;
        let plus = perturbed(Perturbed::State(i), f(time, &x, control))?;
        x[i] = state[i] - h;
        let minus = perturbed(Perturbed::State(i), f(time, &x, control))?;
        x[i] = state[i];
        state_jac.set_column(i, &((plus - minus) / (2.0 * h)));
    }

    let mut u = control.to_vec();
    let mut control_jac = DMatrix::zeros(outputs, control.len());
    for j in 0..control.len() {
        let h = step(control[j], FIRST_ORDER_STEP);
        u[j] = control[j] + h;
        let plus = perturbed(Perturbed::Control(j), f(time, state, &u))?;
        u[j] = control[j] - h;
        let minus = perturbed(Perturbed::Control(j), f(time, state, &u))?;
        u[j] = control[j];
        control_jac.set_column(j, &((plus - minus) / (2.0 * h)));
    }

    let h = step(time, FIRST_ORDER_STEP);
    let plus = perturbed(Perturbed::Time, f(time + h, state, control))?;
    let minus = perturbed(Perturbed::Time, f(time - h, state, control))?;
    let time_jac = (plus - minus) / (2.0 * h);

    Ok(PointJacobian {
        state: state_jac,
        control: control_jac,
        time: time_jac,
    })
}
