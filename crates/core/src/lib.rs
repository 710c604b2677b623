//! Core traits and types for trajopt.
//!
//! This crate defines the shared abstractions that the collocation solver,
//! the NLP solver, and observers build on:
//!
//! - [`Dynamics`] and [`PathConstraint`] — caller-supplied callbacks that
//!   describe the dynamical system as pure functions of `(t, x, u)`
//! - [`Phase`] — a validated, immutable optimal control problem built with
//!   [`PhaseBuilder`]
//! - [`NonlinearProgram`] — the finite-dimensional problem an NLP solver works on
//! - [`Trajectory`] — time-stamped state and control samples, with a
//!   delimited-text [`storage`](trajectory::storage) format
//! - [`Observer`] — receives solver events and optionally returns control actions
//! - [`CancelToken`] — cooperative cancellation shared across threads

mod cancel;
mod error;
mod observer;

pub mod constraint;
pub mod dynamics;
pub mod phase;
pub mod problems;
pub mod trajectory;

pub use cancel::CancelToken;
pub use constraint::PathConstraint;
pub use dynamics::{Dynamics, PointJacobian};
pub use error::{BoxError, EvalError, JacobianError, Perturbed};
pub use observer::Observer;
pub use phase::{Bounds, CostTerm, Phase, PhaseBuilder, ProblemError};
pub use problems::NonlinearProgram;
pub use trajectory::{Sample, Trajectory};
