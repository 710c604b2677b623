//! Capability traits for cross-solver observers.
//!
//! These traits abstract over solver-specific event and action types, so an
//! observer written once works with any solver whose events expose the
//! values it needs.
//!
//! # Event traits
//!
//! - [`HasIteration`] — events numbered by solver iteration
//! - [`HasObjective`] — events that carry an objective value
//! - [`HasConstraintViolation`] — events that carry a constraint violation
//!
//! # Action traits
//!
//! - [`CanStopEarly`] — actions that can signal early termination
//!
//! # Example
//!
//! ```rust
//! use trajopt_core::Observer;
//! use trajopt_observers::traits::{CanStopEarly, HasConstraintViolation};
//!
//! struct FeasibleEnough {
//!     tolerance: f64,
//! }
//!
//! impl<E: HasConstraintViolation, A: CanStopEarly> Observer<E, A> for FeasibleEnough {
//!     fn observe(&mut self, event: &E) -> Option<A> {
//!         (event.constraint_violation() < self.tolerance).then(A::stop_early)
//!     }
//! }
//! ```

use trajopt_solvers::interior_point;

/// An event tied to a solver iteration.
pub trait HasIteration {
    /// Returns the iteration number, starting at 0.
    fn iteration(&self) -> usize;
}

/// An event that carries an objective value.
pub trait HasObjective {
    /// Returns the objective for this event.
    fn objective(&self) -> f64;
}

/// An event that carries a constraint violation.
pub trait HasConstraintViolation {
    /// Returns the largest absolute constraint residual for this event.
    fn constraint_violation(&self) -> f64;
}

/// An action type that can signal early termination.
pub trait CanStopEarly {
    /// Returns the action that stops the solver early.
    fn stop_early() -> Self;
}

// --- interior_point::Event ---

impl HasIteration for interior_point::Event<'_> {
    fn iteration(&self) -> usize {
        self.iter
    }
}

impl HasObjective for interior_point::Event<'_> {
    fn objective(&self) -> f64 {
        self.objective
    }
}

impl HasConstraintViolation for interior_point::Event<'_> {
    fn constraint_violation(&self) -> f64 {
        self.constraint_violation
    }
}

// --- CanStopEarly impls ---

impl CanStopEarly for interior_point::Action {
    fn stop_early() -> Self {
        Self::StopEarly
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interior_point_event_exposes_its_values() {
        let x = [1.0, 2.0];
        let event = interior_point::Event {
            iter: 7,
            objective: 0.25,
            constraint_violation: 1e-3,
            dual_infeasibility: 1e-2,
            barrier: 1e-4,
            step_size: 1.0,
            regularization: 0.0,
            x: &x,
        };

        assert_eq!(event.iteration(), 7);
        assert_eq!(HasObjective::objective(&event), 0.25);
        assert_eq!(HasConstraintViolation::constraint_violation(&event), 1e-3);
        assert_eq!(
            interior_point::Action::stop_early(),
            interior_point::Action::StopEarly
        );
    }
}
