use trajopt_core::Trajectory;

pub use crate::interior_point::Status;

/// The result of a collocation solve.
///
/// Produced for every terminal status. For anything other than
/// [`Status::Converged`] the trajectory is the last accepted iterate.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub status: Status,

    /// Weighted objective at the final iterate.
    pub objective: f64,

    /// Number of solver iterations.
    pub iters: usize,

    /// Largest absolute constraint residual, defects included.
    pub constraint_violation: f64,

    pub trajectory: Trajectory,
}
