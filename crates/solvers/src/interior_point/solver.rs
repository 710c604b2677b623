use nalgebra::DVector;
use tracing::{debug, warn};
use trajopt_core::{CancelToken, EvalError, NonlinearProgram, Observer};

use super::{
    Action, Config, Error, Event, Solution, Status,
    kkt::{self, Regularization},
    line_search::{self, Context, Direction, Filter},
    reformulate::Reformulation,
    state::{self, Iterate, Progress},
};

/// `E_μ ≤ κ_ε μ` triggers a barrier decrease.
const KAPPA_EPSILON: f64 = 10.0;
const KAPPA_MU: f64 = 0.2;
const THETA_MU: f64 = 1.5;
const TAU_MIN: f64 = 0.99;

/// Consecutive rejected line searches tolerated at a feasible point.
const MAX_FAILED_SEARCHES: usize = 5;

/// Least-squares multiplier estimates larger than this are discarded.
const MAX_INITIAL_MULTIPLIER: f64 = 1e3;

/// Where a [`Solver`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Created, but no starting point has been supplied.
    Uninitialized,

    /// The problem has been reformulated and the starting point evaluated.
    Transcribed,

    /// At least one iteration has run.
    Iterating,

    /// Terminated with the given status.
    Finished(Status),
}

/// A primal-dual interior-point solver over a [`NonlinearProgram`].
///
/// The solver is an explicit state machine: [`start`](Self::start) moves it
/// from [`Stage::Uninitialized`] to [`Stage::Transcribed`], each
/// [`step`](Self::step) performs one iteration, and it ends in
/// [`Stage::Finished`]. Most callers use [`solve`](Self::solve) or the
/// free function [`minimize`](super::minimize).
pub struct Solver<'a, P: ?Sized> {
    problem: &'a P,
    config: Config,
    cancel: Option<CancelToken>,
    stage: Stage,
    run: Option<Run>,
}

/// Iteration state that exists once a starting point is known.
struct Run {
    reform: Reformulation,
    iterate: Iterate,
    mu: f64,
    tau: f64,
    filter: Filter,
    regularization: Regularization,
    iter: usize,
    last_alpha: f64,
    last_delta_w: f64,
    last_accepted: bool,
    progress: Progress,
    failed_searches: usize,
}

impl<'a, P: NonlinearProgram + ?Sized> Solver<'a, P> {
    /// Creates a solver for `problem`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `config` fails validation.
    pub fn new(problem: &'a P, config: Config) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            problem,
            config,
            cancel: None,
            stage: Stage::Uninitialized,
            run: None,
        })
    }

    /// Stops the solve with [`Status::Cancelled`] once `token` is cancelled.
    #[must_use]
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Validates the problem and evaluates the starting point.
    ///
    /// The starting point is pushed strictly inside its bounds before use.
    /// Calling `start` again discards any previous progress.
    ///
    /// # Errors
    ///
    /// Returns an error if the bounds are inconsistent, `x0` has the wrong
    /// length, or the problem cannot be evaluated at the starting point.
    pub fn start(&mut self, x0: &[f64]) -> Result<(), Error> {
        let n = self.problem.num_variables();
        if x0.len() != n {
            return Err(Error::Dimension {
                quantity: "starting point",
                expected: n,
                actual: x0.len(),
            });
        }

        let reform = Reformulation::new(self.problem)?;
        let push = |w: &mut DVector<f64>| {
            for i in 0..w.len() {
                w[i] = state::push_inside(w[i], reform.lower()[i], reform.upper()[i], self.config.bound_push);
            }
        };

        let mut w = reform.restrict(x0);
        push(&mut w);
        let g = reform
            .raw_constraints(self.problem, &w)
            .map_err(|e| Error::evaluation(0, reform.expand(&w), e))?;
        reform.fill_slacks(&mut w, &g);
        push(&mut w);

        let z_lower = state::initial_multipliers(reform.lower());
        let z_upper = state::initial_multipliers(reform.upper());
        let lambda = DVector::zeros(reform.num_rows());

        let mut iterate = Iterate::evaluate(self.problem, &reform, w, lambda, z_lower, z_upper)
            .map_err(|e| Error::evaluation(0, x0.to_vec(), e))?;

        let net_gradient = &iterate.gradient - &iterate.z_lower + &iterate.z_upper;
        if let Some(lambda) = kkt::least_squares_multipliers(&net_gradient, &iterate.jacobian)
            && lambda.amax() <= MAX_INITIAL_MULTIPLIER
        {
            iterate.lambda = lambda;
        }

        let filter = Filter::new(iterate.residual.lp_norm(1));
        self.run = Some(Run {
            reform,
            iterate,
            mu: self.config.mu_init,
            tau: TAU_MIN.max(1.0 - self.config.mu_init),
            filter,
            regularization: Regularization::default(),
            iter: 0,
            last_alpha: 0.0,
            last_delta_w: 0.0,
            last_accepted: true,
            progress: Progress::default(),
            failed_searches: 0,
        });
        self.stage = Stage::Transcribed;
        Ok(())
    }

    /// Performs one iteration and returns the resulting stage.
    ///
    /// The observer sees the current iterate before any termination test, so
    /// it can stop the solve at any iterate including the starting point.
    /// Stepping a finished solver is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotStarted`] before [`start`](Self::start), or
    /// [`Error::Evaluation`] if the problem fails at an accepted iterate.
    pub fn step<Obs>(&mut self, observer: &mut Obs) -> Result<Stage, Error>
    where
        Obs: for<'e> Observer<Event<'e>, Action>,
    {
        if let Stage::Finished(_) = self.stage {
            return Ok(self.stage);
        }
        let Some(run) = self.run.as_mut() else {
            return Err(Error::NotStarted);
        };

        let outcome = run.advance(self.problem, &self.config, self.cancel.as_ref(), observer)?;
        self.stage = match outcome {
            Some(status) => {
                debug!(%status, iters = run.iter, "interior-point solve finished");
                Stage::Finished(status)
            }
            None => Stage::Iterating,
        };
        Ok(self.stage)
    }

    /// Iterates until the solver finishes and returns the solution.
    ///
    /// # Errors
    ///
    /// See [`step`](Self::step).
    pub fn solve<Obs>(&mut self, mut observer: Obs) -> Result<Solution, Error>
    where
        Obs: for<'e> Observer<Event<'e>, Action>,
    {
        loop {
            if let Stage::Finished(_) = self.step(&mut observer)? {
                return self.solution().ok_or(Error::NotStarted);
            }
        }
    }

    /// The solution, once the solver has finished.
    #[must_use]
    pub fn solution(&self) -> Option<Solution> {
        let Stage::Finished(status) = self.stage else {
            return None;
        };
        self.run.as_ref().map(|run| run.solution(status))
    }
}

impl Run {
    /// Runs one iteration, returning a status if the solve is over.
    fn advance<P, Obs>(
        &mut self,
        problem: &P,
        config: &Config,
        cancel: Option<&CancelToken>,
        observer: &mut Obs,
    ) -> Result<Option<Status>, Error>
    where
        P: NonlinearProgram + ?Sized,
        Obs: for<'e> Observer<Event<'e>, Action>,
    {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            return Ok(Some(Status::Cancelled));
        }

        let measures = self.iterate.measures(&self.reform, 0.0);
        let x = self.reform.expand(&self.iterate.w);

        debug!(
            iter = self.iter,
            objective = self.iterate.objective,
            violation = measures.primal,
            dual = measures.dual,
            mu = self.mu,
            alpha = self.last_alpha,
            delta_w = self.last_delta_w,
            "iterate"
        );

        let event = Event {
            iter: self.iter,
            objective: self.iterate.objective,
            constraint_violation: measures.primal,
            dual_infeasibility: measures.dual,
            barrier: self.mu,
            step_size: self.last_alpha,
            regularization: self.last_delta_w,
            x: &x,
        };
        if let Some(Action::StopEarly) = observer.observe(&event) {
            return Ok(Some(Status::StoppedByObserver));
        }

        if measures.primal <= config.constraint_tol
            && measures.dual.max(measures.complementarity) <= config.optimality_tol
        {
            return Ok(Some(Status::Converged));
        }
        let stalled = self.progress.record(
            measures.primal,
            self.iterate.objective,
            self.last_accepted,
            config.constraint_tol,
        );
        if stalled >= config.stall_iters {
            return Ok(Some(Status::Infeasible));
        }
        if self.iter >= config.max_iters {
            return Ok(Some(Status::IterationLimitExceeded));
        }

        self.update_barrier(config.optimality_tol);

        let Some(newton) = self.newton_step(problem, &x)? else {
            return Ok(Some(Status::Failed));
        };
        let (direction, alpha, accepted) = newton;

        self.last_accepted = accepted;
        if accepted {
            self.failed_searches = 0;
        } else {
            self.failed_searches += 1;
            self.filter.reset();
            warn!(iter = self.iter, alpha, "line search found no acceptable trial point");
            if self.failed_searches >= MAX_FAILED_SEARCHES && measures.primal <= config.constraint_tol {
                return Ok(Some(Status::Failed));
            }
        }

        self.take_step(problem, &direction, alpha)?;
        Ok(None)
    }

    /// Decreases `μ` while the barrier subproblem is solved to within
    /// `κ_ε μ`.
    fn update_barrier(&mut self, optimality_tol: f64) {
        let mu_min = optimality_tol / 10.0;
        while self.mu > mu_min && self.iterate.measures(&self.reform, self.mu).error() <= KAPPA_EPSILON * self.mu {
            self.mu = mu_min.max((KAPPA_MU * self.mu).min(self.mu.powf(THETA_MU)));
            self.tau = TAU_MIN.max(1.0 - self.mu);
            self.filter.reset();
            debug!(mu = self.mu, "barrier parameter decreased");
        }
    }

    /// Forms and solves the Newton system, then line-searches along it.
    ///
    /// Returns `None` on numerical breakdown.
    fn newton_step<P: NonlinearProgram + ?Sized>(
        &mut self,
        problem: &P,
        x: &[f64],
    ) -> Result<Option<(Direction, f64, bool)>, Error> {
        let iterate = &self.iterate;
        let (lower, upper) = (self.reform.lower(), self.reform.upper());

        let mut hessian = self
            .reform
            .hessian(problem, &iterate.w, &iterate.lambda)
            .map_err(|e| Error::evaluation(self.iter, x.to_vec(), e))?;
        for i in 0..iterate.w.len() {
            if lower[i].is_finite() {
                hessian[(i, i)] += iterate.z_lower[i] / (iterate.w[i] - lower[i]);
            }
            if upper[i].is_finite() {
                hessian[(i, i)] += iterate.z_upper[i] / (upper[i] - iterate.w[i]);
            }
        }

        let Ok(factored) = self.regularization.factor(&hessian, &iterate.jacobian, self.mu) else {
            return Ok(None);
        };
        self.last_delta_w = factored.delta_w;
        if factored.delta_c > 0.0 {
            debug!(iter = self.iter, delta_c = factored.delta_c, "Jacobian regularized");
        }

        let barrier_gradient = state::barrier_gradient(&iterate.gradient, &iterate.w, lower, upper, self.mu);
        let rhs = -(&barrier_gradient + iterate.jacobian.tr_mul(&iterate.lambda));
        let Some((dw, dlambda)) = factored.solve(&rhs, &(-&iterate.residual)) else {
            return Ok(None);
        };

        let ctx = Context {
            problem,
            reform: &self.reform,
            iterate,
            factored: &factored,
            mu: self.mu,
            tau: self.tau,
            barrier_gradient: &barrier_gradient,
            rhs: &rhs,
        };
        let step = line_search::search(&ctx, Direction { dw, dlambda }, &mut self.filter)
            .map_err(|e| Error::evaluation(self.iter, x.to_vec(), e))?;

        Ok(Some((step.direction, step.alpha, step.accepted)))
    }

    /// Moves to the next iterate along `direction` and re-evaluates there.
    fn take_step<P: NonlinearProgram + ?Sized>(
        &mut self,
        problem: &P,
        direction: &Direction,
        alpha: f64,
    ) -> Result<(), Error> {
        let iterate = &self.iterate;
        let (lower, upper) = (self.reform.lower(), self.reform.upper());
        let dw = &direction.dw;

        let mut dz_lower = DVector::zeros(dw.len());
        let mut dz_upper = DVector::zeros(dw.len());
        for i in 0..dw.len() {
            if lower[i].is_finite() {
                let gap = iterate.w[i] - lower[i];
                dz_lower[i] = self.mu / gap - iterate.z_lower[i] - iterate.z_lower[i] / gap * dw[i];
            }
            if upper[i].is_finite() {
                let gap = upper[i] - iterate.w[i];
                dz_upper[i] = self.mu / gap - iterate.z_upper[i] + iterate.z_upper[i] / gap * dw[i];
            }
        }
        let alpha_z = line_search::multiplier_fraction_to_boundary(&iterate.z_lower, &dz_lower, self.tau)
            .min(line_search::multiplier_fraction_to_boundary(&iterate.z_upper, &dz_upper, self.tau));

        let w = &iterate.w + alpha * dw;
        let lambda = &iterate.lambda + alpha * &direction.dlambda;
        let z_lower = &iterate.z_lower + alpha_z * dz_lower;
        let z_upper = &iterate.z_upper + alpha_z * dz_upper;

        let next_iter = self.iter + 1;
        let x = self.reform.expand(&w);
        let mut next = Iterate::evaluate(problem, &self.reform, w, lambda, z_lower, z_upper)
            .map_err(|e: EvalError| Error::evaluation(next_iter, x, e))?;
        next.safeguard_multipliers(&self.reform, self.mu);

        self.iterate = next;
        self.iter = next_iter;
        self.last_alpha = alpha;
        Ok(())
    }

    fn solution(&self, status: Status) -> Solution {
        let measures = self.iterate.measures(&self.reform, 0.0);
        Solution {
            status,
            x: self.reform.expand(&self.iterate.w),
            objective: self.iterate.objective,
            constraint_violation: measures.primal,
            dual_infeasibility: measures.dual,
            multipliers: self.iterate.lambda.iter().copied().collect(),
            iters: self.iter,
        }
    }
}
