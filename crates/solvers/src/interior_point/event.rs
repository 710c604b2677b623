/// Event emitted once per iterate, starting with the initial point.
///
/// Iteration 0 is the bound-pushed starting point. Later events describe the
/// iterate accepted by the line search.
#[derive(Debug, Clone, Copy)]
pub struct Event<'a> {
    /// Iteration number.
    pub iter: usize,

    /// Objective value.
    pub objective: f64,

    /// Largest absolute constraint residual.
    pub constraint_violation: f64,

    /// Largest scaled gradient-of-Lagrangian entry.
    pub dual_infeasibility: f64,

    /// Barrier parameter in effect for the step that produced this iterate.
    pub barrier: f64,

    /// Primal step size that produced this iterate (0 for the initial point).
    pub step_size: f64,

    /// Hessian regularization used for the step (0 when none was needed).
    pub regularization: f64,

    /// The variable vector, including fixed variables.
    pub x: &'a [f64],
}
