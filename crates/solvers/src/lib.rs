//! Numerical solvers for trajopt.
//!
//! - [`interior_point`] — a primal-dual interior-point method for any
//!   [`NonlinearProgram`](trajopt_core::NonlinearProgram)
//! - [`collocation`] — transcribes a [`Phase`](trajopt_core::Phase) into a
//!   nonlinear program, solves it with [`interior_point`], and assembles the
//!   optimum into a [`Trajectory`](trajopt_core::Trajectory)
//! - [`finite_difference`] — central-difference gradients and Hessians shared
//!   by both

pub mod collocation;
pub mod finite_difference;
pub mod interior_point;
