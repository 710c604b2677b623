//! Direct-collocation solver for single-phase optimal control problems.
//!
//! # Transcription
//!
//! A [`Phase`] is discretized on a uniform mesh of `N + 1` points over
//! normalized time `τ ∈ [0, 1]`, with `t = t0 + τ (tf - t0)`. The NLP
//! variables are the states and controls at every mesh point plus any free
//! initial or final time. Each mesh interval contributes a defect that ties
//! consecutive points together through the dynamics under the chosen
//! [`Scheme`]. Path constraints are enforced at every mesh point and integral
//! costs use trapezoidal quadrature.
//!
//! # Solving
//!
//! The transcribed program is handed to the
//! [`interior_point`](crate::interior_point) solver and the final iterate is
//! assembled into a [`Trajectory`] with one sample per mesh point.
//!
//! ```
//! use trajopt_core::{CostTerm, Phase, dynamics};
//! use trajopt_solvers::collocation::{self, Config};
//!
//! let mut builder = Phase::builder("sliding_mass");
//! builder
//!     .set_time_bounds(0.0, [0.0, 5.0])?
//!     .add_state("position", [-5.0, 5.0], 0.0, 1.0)?
//!     .add_state("speed", [-50.0, 50.0], 0.0, 0.0)?
//!     .add_control("force", [-50.0, 50.0])?
//!     .add_cost(CostTerm::final_time("final_time"))?;
//! let phase = builder.build()?;
//!
//! let sliding_mass = dynamics::from_fn(|_t, x: &[f64], u: &[f64]| vec![x[1], u[0]]);
//! let config = Config { mesh_intervals: 10, ..Config::default() };
//!
//! let solution = collocation::solve_unobserved(&sliding_mass, &phase, &config)?;
//!
//! assert_eq!(solution.trajectory.len(), 11);
//! assert_eq!(solution.trajectory.state("position").unwrap()[10], 1.0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Observer Events
//!
//! Observers receive the interior-point [`Event`] for every iterate; `x` in
//! the event is the NLP vector laid out as described by [`Layout`].

mod assemble;
mod config;
mod error;
mod evaluator;
mod guess;
mod layout;
mod mesh;
mod scheme;
mod solution;
mod transcription;

#[cfg(test)]
mod tests;

pub use config::Config;
pub use error::{AssemblyError, Error, TranscriptionError};
pub use evaluator::Evaluator;
pub use layout::{Layout, TimeSlot};
pub use mesh::Mesh;
pub use scheme::Scheme;
pub use solution::{Solution, Status};
pub use transcription::Transcription;

pub use crate::interior_point::{Action, Event};

use tracing::{info, info_span};
use trajopt_core::{CancelToken, Dynamics, Observer, Phase, Trajectory};

use crate::interior_point::{self, Solver};

/// A configured collocation solve of one phase.
///
/// `Study` gathers the optional inputs of a solve (config, initial guess,
/// cancellation token) before running it. It borrows the dynamics and the
/// phase, so the same study can be solved repeatedly.
pub struct Study<'a, D> {
    dynamics: &'a D,
    phase: &'a Phase,
    config: Config,
    guess: Option<&'a Trajectory>,
    cancel: Option<CancelToken>,
}

impl<'a, D: Dynamics + Sync> Study<'a, D> {
    /// Creates a study with the default [`Config`] and a guess built from
    /// the phase bounds.
    pub fn new(dynamics: &'a D, phase: &'a Phase) -> Self {
        Self {
            dynamics,
            phase,
            config: Config::default(),
            guess: None,
            cancel: None,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Starts from `guess`, such as a previous solution, instead of the
    /// phase bounds.
    #[must_use]
    pub fn with_guess(mut self, guess: &'a Trajectory) -> Self {
        self.guess = Some(guess);
        self
    }

    /// Stops the solve with [`Status::Cancelled`] once `token` is cancelled.
    #[must_use]
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Transcribes the phase without solving it.
    ///
    /// # Errors
    ///
    /// Returns [`TranscriptionError::DegenerateMesh`] for a mesh with no
    /// intervals.
    pub fn transcribe(&self) -> Result<Transcription<'a, D>, TranscriptionError> {
        Transcription::new(self.dynamics, self.phase, &self.config)
    }

    /// Solves the study, reporting every iterate to `observer`.
    ///
    /// # Errors
    ///
    /// Returns an error if transcription fails, the solver rejects the
    /// config, or a callback fails at an accepted iterate. Failing to
    /// converge is reported through [`Solution::status`].
    pub fn solve<Obs>(&self, observer: Obs) -> Result<Solution, Error>
    where
        Obs: for<'e> Observer<Event<'e>, Action>,
    {
        let span = info_span!(
            "collocation_solve",
            phase = self.phase.name(),
            intervals = self.config.mesh_intervals,
            scheme = ?self.config.scheme
        );
        let _guard = span.enter();

        let transcription = self.transcribe()?;
        let x0 = transcription.initial_guess(self.guess)?;

        let mut solver = Solver::new(&transcription, self.config.solver)?;
        if let Some(token) = &self.cancel {
            solver = solver.with_cancel_token(token.clone());
        }
        solver.start(&x0).map_err(|err| lift(&transcription, err))?;
        let nlp = solver
            .solve(observer)
            .map_err(|err| lift(&transcription, err))?;

        let trajectory = transcription.assemble(&nlp.x)?;
        info!(
            status = %nlp.status,
            iters = nlp.iters,
            objective = nlp.objective,
            constraint_violation = nlp.constraint_violation,
            "collocation solve finished"
        );

        Ok(Solution {
            status: nlp.status,
            objective: nlp.objective,
            iters: nlp.iters,
            constraint_violation: nlp.constraint_violation,
            trajectory,
        })
    }

    /// Solves the study without observer support.
    ///
    /// # Errors
    ///
    /// See [`solve`](Self::solve).
    pub fn solve_unobserved(&self) -> Result<Solution, Error> {
        self.solve(())
    }
}

/// Maps a solver error onto the mesh, turning the failed NLP iterate into a
/// trajectory.
fn lift<D: Dynamics + Sync>(transcription: &Transcription<'_, D>, err: interior_point::Error) -> Error {
    match err {
        interior_point::Error::Evaluation { iter, x, source } => match transcription.assemble(&x) {
            Ok(trajectory) => Error::Evaluation {
                iter,
                trajectory: Box::new(trajectory),
                source,
            },
            Err(assembly) => Error::Assembly(assembly),
        },
        other => Error::Solver(other),
    }
}

/// Solves `phase` under `dynamics`, reporting every iterate to `observer`.
///
/// # Errors
///
/// See [`Study::solve`].
pub fn solve<D, Obs>(dynamics: &D, phase: &Phase, config: &Config, observer: Obs) -> Result<Solution, Error>
where
    D: Dynamics + Sync,
    Obs: for<'e> Observer<Event<'e>, Action>,
{
    Study::new(dynamics, phase)
        .with_config(*config)
        .solve(observer)
}

/// Solves `phase` under `dynamics` without observer support.
///
/// This is a convenience wrapper around [`solve`] that uses a no-op observer.
///
/// # Errors
///
/// See [`Study::solve`].
pub fn solve_unobserved<D>(dynamics: &D, phase: &Phase, config: &Config) -> Result<Solution, Error>
where
    D: Dynamics + Sync,
{
    solve(dynamics, phase, config, ())
}
