//! Primal-dual interior-point solver for smooth nonlinear programs.
//!
//! # Algorithm
//!
//! The solver minimizes `f(x)` subject to `g_l ≤ g(x) ≤ g_u` and
//! `x_l ≤ x ≤ x_u` by following the central path of the log-barrier problem
//!
//! ```text
//! minimize  f(x) - μ Σ ln(x - x_l) - μ Σ ln(x_u - x)
//! ```
//!
//! as `μ → 0`. Inequality rows are turned into equalities with bounded
//! slacks and fixed variables are removed, so every Newton step solves one
//! dense symmetric system in the primal variables and the constraint
//! multipliers. Each iteration:
//!
//! 1. Decreases `μ` once the current barrier problem is solved well enough.
//! 2. Factors the Newton system, adding `δ_w I` to the Hessian until the
//!    matrix has the inertia of a strictly convex problem on the constraint
//!    null space, and `-δ_c I` to the constraint block when the Jacobian is
//!    rank deficient.
//! 3. Limits the step so variables and bound multipliers stay strictly inside
//!    their bounds.
//! 4. Backtracks until a filter on (constraint violation, barrier objective)
//!    accepts the trial point, trying second-order corrections when the full
//!    step increases infeasibility.
//!
//! # Termination
//!
//! See [`Status`]. Non-convergence is reported as a status; only invalid
//! input and evaluation failures at accepted iterates are errors.
//!
//! # Observer Events
//!
//! The solver emits one [`Event`] per iterate, starting with the initial
//! point. Observers can return [`Action::StopEarly`] to halt immediately.

mod action;
mod config;
mod error;
mod event;
mod kkt;
mod line_search;
mod reformulate;
mod solution;
mod solver;
mod state;


pub use action::Action;
pub use config::{Config, ConfigError};
pub use error::Error;
pub use event::Event;
pub use solution::{Solution, Status};
pub use solver::{Solver, Stage};

use trajopt_core::{NonlinearProgram, Observer};

/// Minimizes a nonlinear program from the starting point `x0`.
///
/// The observer receives an [`Event`] for every iterate.
///
/// # Errors
///
/// Returns an error if the config or problem bounds are invalid, `x0` has
/// the wrong length, or the problem fails to evaluate at an accepted iterate.
pub fn minimize<P, Obs>(problem: &P, x0: &[f64], config: &Config, observer: Obs) -> Result<Solution, Error>
where
    P: NonlinearProgram + ?Sized,
    Obs: for<'a> Observer<Event<'a>, Action>,
{
    let mut solver = Solver::new(problem, *config)?;
    solver.start(x0)?;
    solver.solve(observer)
}

/// Minimizes a nonlinear program without observer support.
///
/// This is a convenience wrapper around [`minimize`] that uses a no-op observer.
///
/// # Errors
///
/// See [`minimize`].
pub fn minimize_unobserved<P>(problem: &P, x0: &[f64], config: &Config) -> Result<Solution, Error>
where
    P: NonlinearProgram + ?Sized,
{
    minimize(problem, x0, config, ())
}
