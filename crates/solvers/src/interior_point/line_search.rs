//! Filter line search on the barrier objective `φ_μ(w)` and the constraint
//! violation `θ(w) = ‖c(w)‖₁`, with second-order corrections.
//!
//! A trial point must not be dominated by any [`Filter`] entry and must make
//! sufficient progress in either `θ` or `φ_μ` against the current iterate.
//! Near feasibility, when `dw` is a good descent direction for `φ_μ`, the
//! Armijo condition on `φ_μ` alone applies and the filter is left as is.

use nalgebra::DVector;
use trajopt_core::{EvalError, NonlinearProgram};

use super::{
    kkt::Factored,
    reformulate::Reformulation,
    state::{Iterate, barrier_objective},
};

const GAMMA_THETA: f64 = 1e-5;
const GAMMA_PHI: f64 = 1e-8;
const GAMMA_ALPHA: f64 = 0.05;
const ETA_PHI: f64 = 1e-8;
const SWITCH_DELTA: f64 = 1.0;
const SWITCH_S_THETA: f64 = 1.1;
const SWITCH_S_PHI: f64 = 2.3;
const THETA_MAX_FACTOR: f64 = 1e4;
const THETA_MIN_FACTOR: f64 = 1e-4;
const MAX_SOC: usize = 4;
const KAPPA_SOC: f64 = 0.99;
const MAX_BACKTRACKS: usize = 40;

/// Pairs `(θ, φ_μ)` that trial points must improve on.
#[derive(Debug, Clone)]
pub(super) struct Filter {
    entries: Vec<(f64, f64)>,
    theta_max: f64,
    theta_min: f64,
}

impl Filter {
    /// Creates an empty filter sized by the violation at the starting point.
    pub fn new(initial_theta: f64) -> Self {
        let scale = initial_theta.max(1.0);
        Self {
            entries: Vec::new(),
            theta_max: THETA_MAX_FACTOR * scale,
            theta_min: THETA_MIN_FACTOR * scale,
        }
    }

    /// Forgets every entry, keeping the violation envelope.
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    fn rejects(&self, theta: f64, phi: f64) -> bool {
        theta > self.theta_max || self.entries.iter().any(|&(t, p)| theta >= t && phi >= p)
    }

    fn augment(&mut self, theta: f64, phi: f64) {
        self.entries.retain(|&(t, p)| t < theta || p < phi);
        self.entries.push((theta, phi));
    }
}

/// Everything the line search needs from the current iteration.
pub(super) struct Context<'a, P: ?Sized> {
    pub problem: &'a P,
    pub reform: &'a Reformulation,
    pub iterate: &'a Iterate,
    pub factored: &'a Factored,
    pub mu: f64,
    pub tau: f64,

    /// `∇φ_μ(w)`.
    pub barrier_gradient: &'a DVector<f64>,

    /// Top block of the Newton right-hand side, `-(∇φ_μ + Jᵀλ)`.
    pub rhs: &'a DVector<f64>,
}

/// A primal direction and its multiplier step.
#[derive(Debug, Clone)]
pub(super) struct Direction {
    pub dw: DVector<f64>,
    pub dlambda: DVector<f64>,
}

/// Result of a line search.
#[derive(Debug, Clone)]
pub(super) struct Step {
    /// The direction actually taken, which differs from the Newton direction
    /// after a second-order correction.
    pub direction: Direction,

    /// Step length along `direction`.
    pub alpha: f64,

    /// Whether the trial point was acceptable to the filter.
    pub accepted: bool,
}

/// The current iterate as the acceptance tests see it.
#[derive(Debug, Clone, Copy)]
struct Reference {
    theta: f64,
    phi: f64,

    /// `∇φ_μᵀ dw`.
    slope: f64,
}

impl Reference {
    /// Whether `α dw` promises enough decrease in `φ_μ` to ignore `θ`.
    fn switching(&self, alpha: f64) -> bool {
        self.slope < 0.0
            && alpha * (-self.slope).powf(SWITCH_S_PHI) > SWITCH_DELTA * self.theta.powf(SWITCH_S_THETA)
    }

    fn armijo(&self, alpha: f64, phi: f64) -> bool {
        phi <= self.phi + ETA_PHI * alpha * self.slope
    }

    /// Returns `Some(augment)` if the trial is acceptable, where `augment`
    /// says whether the current iterate must enter the filter.
    fn accepts(&self, filter: &Filter, alpha: f64, theta: f64, phi: f64) -> Option<bool> {
        if filter.rejects(theta, phi) {
            return None;
        }

        let switching = self.switching(alpha);
        if switching && self.theta <= filter.theta_min {
            return self.armijo(alpha, phi).then_some(false);
        }

        let progress = theta <= (1.0 - GAMMA_THETA) * self.theta || phi <= self.phi - GAMMA_PHI * self.theta;
        progress.then(|| !(switching && self.armijo(alpha, phi)))
    }

    /// Step length below which no trial can be accepted.
    fn min_step(&self, theta_min: f64) -> f64 {
        let bound = if self.slope < 0.0 {
            let descent = -self.slope;
            let bound = GAMMA_THETA.min(GAMMA_PHI * self.theta / descent);
            if self.theta <= theta_min {
                bound.min(SWITCH_DELTA * self.theta.powf(SWITCH_S_THETA) / descent.powf(SWITCH_S_PHI))
            } else {
                bound
            }
        } else {
            GAMMA_THETA
        };
        GAMMA_ALPHA * bound
    }

    fn margin(&self) -> (f64, f64) {
        (
            (1.0 - GAMMA_THETA) * self.theta,
            self.phi - GAMMA_PHI * self.theta,
        )
    }
}

/// Backtracks along `newton` until a trial point is acceptable.
///
/// Trial points with non-finite values are rejected. When the first trial
/// raises `θ`, up to [`MAX_SOC`] second-order corrections are tried before
/// backtracking. If no trial is acceptable the shortest finite trial is
/// returned with `accepted = false` and `filter` is left unchanged.
pub(super) fn search<P: NonlinearProgram + ?Sized>(
    ctx: &Context<'_, P>,
    newton: Direction,
    filter: &mut Filter,
) -> Result<Step, EvalError> {
    let iterate = ctx.iterate;
    let (lower, upper) = (ctx.reform.lower(), ctx.reform.upper());

    let reference = Reference {
        theta: iterate.residual.lp_norm(1),
        phi: barrier_objective(iterate.objective, &iterate.w, lower, upper, ctx.mu),
        slope: ctx.barrier_gradient.dot(&newton.dw),
    };
    let alpha_max = fraction_to_boundary(&iterate.w, &newton.dw, lower, upper, ctx.tau);

    if is_tiny(&iterate.w, &newton.dw) {
        return Ok(Step {
            direction: newton,
            alpha: alpha_max,
            accepted: true,
        });
    }

    let alpha_min = reference.min_step(filter.theta_min);
    let mut alpha = alpha_max;
    let mut shortest = None;

    for attempt in 0..MAX_BACKTRACKS {
        if alpha < alpha_min {
            break;
        }
        let w_trial = &iterate.w + alpha * &newton.dw;

        if let Some((phi, residual)) = trial_merit(ctx, &w_trial)? {
            let theta = residual.lp_norm(1);
            if let Some(augment) = reference.accepts(filter, alpha, theta, phi) {
                if augment {
                    let (theta, phi) = reference.margin();
                    filter.augment(theta, phi);
                }
                return Ok(Step {
                    direction: newton,
                    alpha,
                    accepted: true,
                });
            }
            shortest = Some(alpha);

            if attempt == 0
                && theta >= reference.theta
                && let Some(step) = second_order_correction(ctx, &reference, filter, alpha, residual)?
            {
                return Ok(step);
            }
        }

        alpha *= 0.5;
    }

    Ok(Step {
        direction: newton,
        alpha: shortest.unwrap_or(0.0),
        accepted: false,
    })
}

/// Tries steps `w + α_soc dw_soc`, where `dw_soc` reuses the factored matrix
/// with an accumulated `-c_soc` in place of `-c`.
///
/// Stops once a correction is acceptable, once `θ` fails to shrink by
/// [`KAPPA_SOC`], or after [`MAX_SOC`] tries.
fn second_order_correction<P: NonlinearProgram + ?Sized>(
    ctx: &Context<'_, P>,
    reference: &Reference,
    filter: &mut Filter,
    alpha: f64,
    trial_residual: DVector<f64>,
) -> Result<Option<Step>, EvalError> {
    let (lower, upper) = (ctx.reform.lower(), ctx.reform.upper());

    let mut theta_old = trial_residual.lp_norm(1);
    let mut correction = &ctx.iterate.residual * alpha + trial_residual;

    for _ in 0..MAX_SOC {
        let Some((dw, dlambda)) = ctx.factored.solve(ctx.rhs, &(-&correction)) else {
            return Ok(None);
        };
        let alpha_soc = fraction_to_boundary(&ctx.iterate.w, &dw, lower, upper, ctx.tau);
        let w_trial = &ctx.iterate.w + alpha_soc * &dw;

        let Some((phi, residual)) = trial_merit(ctx, &w_trial)? else {
            return Ok(None);
        };
        let theta = residual.lp_norm(1);
        if let Some(augment) = reference.accepts(filter, alpha, theta, phi) {
            if augment {
                let (theta, phi) = reference.margin();
                filter.augment(theta, phi);
            }
            return Ok(Some(Step {
                direction: Direction { dw, dlambda },
                alpha: alpha_soc,
                accepted: true,
            }));
        }
        if theta > KAPPA_SOC * theta_old {
            return Ok(None);
        }

        theta_old = theta;
        correction = alpha_soc * correction + residual;
    }
    Ok(None)
}

/// Barrier objective and residuals at a trial point, or `None` if either is
/// not finite.
fn trial_merit<P: NonlinearProgram + ?Sized>(
    ctx: &Context<'_, P>,
    w: &DVector<f64>,
) -> Result<Option<(f64, DVector<f64>)>, EvalError> {
    let objective = match ctx.reform.objective(ctx.problem, w) {
        Ok(f) => f,
        Err(e) if e.is_numerical() => return Ok(None),
        Err(e) => return Err(e),
    };
    let residual = match ctx.reform.constraints(ctx.problem, w) {
        Ok(c) => c,
        Err(e) if e.is_numerical() => return Ok(None),
        Err(e) => return Err(e),
    };

    let phi = barrier_objective(objective, w, ctx.reform.lower(), ctx.reform.upper(), ctx.mu);
    Ok(phi.is_finite().then_some((phi, residual)))
}

/// Largest `α ∈ (0, 1]` keeping `w + α dw` at least a fraction `1 - τ` of
/// its current distance from each finite bound.
pub(super) fn fraction_to_boundary(
    w: &DVector<f64>,
    dw: &DVector<f64>,
    lower: &DVector<f64>,
    upper: &DVector<f64>,
    tau: f64,
) -> f64 {
    let mut alpha: f64 = 1.0;
    for i in 0..w.len() {
        if dw[i] < 0.0 && lower[i].is_finite() {
            alpha = alpha.min(-tau * (w[i] - lower[i]) / dw[i]);
        }
        if dw[i] > 0.0 && upper[i].is_finite() {
            alpha = alpha.min(tau * (upper[i] - w[i]) / dw[i]);
        }
    }
    alpha
}

/// Largest `α ∈ (0, 1]` keeping `z + α dz` at least a fraction `1 - τ` of
/// `z`.
pub(super) fn multiplier_fraction_to_boundary(z: &DVector<f64>, dz: &DVector<f64>, tau: f64) -> f64 {
    z.iter().zip(dz.iter()).fold(1.0_f64, |alpha, (&z, &dz)| {
        if dz < 0.0 && z > 0.0 {
            alpha.min(-tau * z / dz)
        } else {
            alpha
        }
    })
}

fn is_tiny(w: &DVector<f64>, dw: &DVector<f64>) -> bool {
    w.iter()
        .zip(dw.iter())
        .all(|(&w, &dw)| dw.abs() / (1.0 + w.abs()) < 10.0 * f64::EPSILON)
}
