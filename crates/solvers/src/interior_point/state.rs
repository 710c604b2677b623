use nalgebra::{DMatrix, DVector};
use trajopt_core::{EvalError, NonlinearProgram};

use super::reformulate::Reformulation;

/// Scale threshold for the optimality measures.
const S_MAX: f64 = 100.0;

/// Bound multipliers may not drift further than this factor from `μ / slack`.
const KAPPA_SIGMA: f64 = 1e10;

/// Relative decrease in the best violation or objective that counts as
/// progress.
const STALL_IMPROVEMENT: f64 = 1e-3;

/// A primal-dual point together with the evaluations made there.
#[derive(Debug, Clone)]
pub(super) struct Iterate {
    pub w: DVector<f64>,
    pub lambda: DVector<f64>,
    pub z_lower: DVector<f64>,
    pub z_upper: DVector<f64>,
    pub objective: f64,
    pub gradient: DVector<f64>,
    pub residual: DVector<f64>,
    pub jacobian: DMatrix<f64>,
}

/// Optimality measures of an iterate for a given barrier parameter.
#[derive(Debug, Clone, Copy)]
pub(super) struct Measures {
    pub primal: f64,
    pub dual: f64,
    pub complementarity: f64,
}

impl Measures {
    /// The overall error `E_μ`.
    pub fn error(self) -> f64 {
        self.primal.max(self.dual).max(self.complementarity)
    }
}

/// Counts consecutive infeasible iterations without progress.
///
/// An iteration makes progress if its violation beats the best so far by
/// [`STALL_IMPROVEMENT`], or if the step that reached it was accepted and its
/// objective beats the best so far by the same relative amount.
#[derive(Debug, Clone, Copy)]
pub(super) struct Progress {
    best_violation: f64,
    best_objective: f64,
    stalled: usize,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            best_violation: f64::INFINITY,
            best_objective: f64::INFINITY,
            stalled: 0,
        }
    }
}

impl Progress {
    /// Records an iterate and returns the number of stalled iterations so far.
    pub fn record(&mut self, violation: f64, objective: f64, accepted: bool, tol: f64) -> usize {
        let lowers_objective = self.best_objective.is_infinite()
            || objective < self.best_objective - STALL_IMPROVEMENT * self.best_objective.abs().max(1.0);
        let progress = violation <= tol
            || violation < (1.0 - STALL_IMPROVEMENT) * self.best_violation
            || (accepted && lowers_objective);

        self.stalled = if progress { 0 } else { self.stalled + 1 };
        self.best_violation = self.best_violation.min(violation);
        self.best_objective = self.best_objective.min(objective);
        self.stalled
    }
}

impl Iterate {
    /// Evaluates everything needed to form a Newton step at `w`.
    pub fn evaluate<P: NonlinearProgram + ?Sized>(
        problem: &P,
        reform: &Reformulation,
        w: DVector<f64>,
        lambda: DVector<f64>,
        z_lower: DVector<f64>,
        z_upper: DVector<f64>,
    ) -> Result<Self, EvalError> {
        let objective = reform.objective(problem, &w)?;
        let gradient = reform.gradient(problem, &w)?;
        let residual = reform.constraints(problem, &w)?;
        let jacobian = reform.jacobian(problem, &w)?;

        if gradient.iter().chain(jacobian.iter()).any(|v| !v.is_finite()) {
            return Err(EvalError::NonFinite {
                quantity: "derivatives",
            });
        }

        Ok(Self {
            w,
            lambda,
            z_lower,
            z_upper,
            objective,
            gradient,
            residual,
            jacobian,
        })
    }

    /// Largest absolute constraint residual.
    pub fn violation(&self) -> f64 {
        self.residual.amax()
    }

    /// Gradient of the Lagrangian, `∇f + Jᵀλ - z_L + z_U`.
    pub fn lagrangian_gradient(&self) -> DVector<f64> {
        &self.gradient + self.jacobian.tr_mul(&self.lambda) - &self.z_lower + &self.z_upper
    }

    /// Computes the scaled optimality measures for barrier parameter `mu`.
    pub fn measures(&self, reform: &Reformulation, mu: f64) -> Measures {
        let (lower, upper) = (reform.lower(), reform.upper());
        let bounded = (0..self.w.len())
            .map(|i| usize::from(lower[i].is_finite()) + usize::from(upper[i].is_finite()))
            .sum::<usize>();

        let z_sum = self.z_lower.lp_norm(1) + self.z_upper.lp_norm(1);
        let multiplier_count = self.lambda.len() + bounded;
        let s_d = if multiplier_count == 0 {
            1.0
        } else {
            S_MAX.max((self.lambda.lp_norm(1) + z_sum) / multiplier_count as f64) / S_MAX
        };
        let s_c = if bounded == 0 {
            1.0
        } else {
            S_MAX.max(z_sum / bounded as f64) / S_MAX
        };

        let mut complementarity: f64 = 0.0;
        for i in 0..self.w.len() {
            if lower[i].is_finite() {
                complementarity = complementarity.max(((self.w[i] - lower[i]) * self.z_lower[i] - mu).abs());
            }
            if upper[i].is_finite() {
                complementarity = complementarity.max(((upper[i] - self.w[i]) * self.z_upper[i] - mu).abs());
            }
        }

        Measures {
            primal: self.violation(),
            dual: self.lagrangian_gradient().amax() / s_d,
            complementarity: complementarity / s_c,
        }
    }

    /// Keeps each bound multiplier within a factor of `μ / slack`.
    pub fn safeguard_multipliers(&mut self, reform: &Reformulation, mu: f64) {
        let (lower, upper) = (reform.lower(), reform.upper());
        for i in 0..self.w.len() {
            if lower[i].is_finite() {
                let gap = self.w[i] - lower[i];
                self.z_lower[i] = clamp_multiplier(self.z_lower[i], mu, gap);
            }
            if upper[i].is_finite() {
                let gap = upper[i] - self.w[i];
                self.z_upper[i] = clamp_multiplier(self.z_upper[i], mu, gap);
            }
        }
    }
}

fn clamp_multiplier(z: f64, mu: f64, gap: f64) -> f64 {
    z.min(KAPPA_SIGMA * mu / gap).max(mu / (KAPPA_SIGMA * gap))
}

/// Moves `value` strictly inside `[lower, upper]`.
///
/// Finite ends are kept at least `push · max(1, |end|)` away, but never more
/// than `push` times the width of the interval.
pub(super) fn push_inside(value: f64, lower: f64, upper: f64, push: f64) -> f64 {
    match (lower.is_finite(), upper.is_finite()) {
        (true, true) => {
            let width = upper - lower;
            let p_lower = (push * lower.abs().max(1.0)).min(push * width);
            let p_upper = (push * upper.abs().max(1.0)).min(push * width);
            value.clamp(lower + p_lower, upper - p_upper)
        }
        (true, false) => value.max(lower + push * lower.abs().max(1.0)),
        (false, true) => value.min(upper - push * upper.abs().max(1.0)),
        (false, false) => value,
    }
}

/// Initial bound multipliers: 1 for each finite bound, 0 otherwise.
pub(super) fn initial_multipliers(bounds: &DVector<f64>) -> DVector<f64> {
    bounds.map(|b| if b.is_finite() { 1.0 } else { 0.0 })
}

/// Barrier function `f - μ Σ ln(w - l) - μ Σ ln(u - w)`.
///
/// Returns `NaN` if `w` is not strictly inside its bounds.
pub(super) fn barrier_objective(
    objective: f64,
    w: &DVector<f64>,
    lower: &DVector<f64>,
    upper: &DVector<f64>,
    mu: f64,
) -> f64 {
    let mut phi = objective;
    for i in 0..w.len() {
        if lower[i].is_finite() {
            phi -= mu * (w[i] - lower[i]).ln();
        }
        if upper[i].is_finite() {
            phi -= mu * (upper[i] - w[i]).ln();
        }
    }
    phi
}

/// Gradient of the barrier function.
pub(super) fn barrier_gradient(
    gradient: &DVector<f64>,
    w: &DVector<f64>,
    lower: &DVector<f64>,
    upper: &DVector<f64>,
    mu: f64,
) -> DVector<f64> {
    let mut grad = gradient.clone();
    for i in 0..w.len() {
        if lower[i].is_finite() {
            grad[i] -= mu / (w[i] - lower[i]);
        }
        if upper[i].is_finite() {
            grad[i] += mu / (upper[i] - w[i]);
        }
    }
    grad
}
