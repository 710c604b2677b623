/// How an interior-point solve terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Constraint violation and optimality residual are within tolerance.
    Converged,

    /// Reached `max_iters` without converging.
    IterationLimitExceeded,

    /// Constraint violation stagnated above tolerance.
    Infeasible,

    /// The Newton system could not be regularized, or the line search kept
    /// failing at a feasible point.
    Failed,

    /// The cancellation token was set.
    Cancelled,

    /// Stopped early due to an observer decision.
    StoppedByObserver,
}

impl Status {
    /// Returns `true` only for [`Status::Converged`].
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Converged)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Converged => "converged",
            Self::IterationLimitExceeded => "iteration limit exceeded",
            Self::Infeasible => "infeasible",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::StoppedByObserver => "stopped by observer",
        };
        f.write_str(text)
    }
}

/// The result of an interior-point solve.
///
/// A solution is produced for every terminal status; for anything other than
/// [`Status::Converged`] it describes the last accepted iterate.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Final solver status.
    pub status: Status,

    /// The variable vector, including fixed variables.
    pub x: Vec<f64>,

    /// Objective value at `x`.
    pub objective: f64,

    /// Largest absolute constraint residual at `x`.
    pub constraint_violation: f64,

    /// Largest scaled gradient-of-Lagrangian entry at `x`.
    pub dual_infeasibility: f64,

    /// Constraint multipliers, one per constraint.
    pub multipliers: Vec<f64>,

    /// Number of completed iterations.
    pub iters: usize,
}
