use thiserror::Error;

use trajopt_core::{EvalError, Trajectory};

use crate::interior_point;

/// Errors detected while transcribing a phase into a nonlinear program.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TranscriptionError {
    #[error("mesh must have at least one interval")]
    DegenerateMesh,

    #[error("initial guess does not match the phase: {reason}")]
    GuessMismatch { reason: String },
}

/// Errors detected while mapping an NLP vector back to a trajectory.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssemblyError {
    #[error("NLP vector has length {actual}, expected {expected}")]
    Length { expected: usize, actual: usize },

    #[error("inconsistent trajectory: {0}")]
    Trajectory(String),
}

/// Errors that can occur during a collocation solve.
///
/// Non-convergence is not an error; see [`Status`](super::Status).
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Transcription(#[from] TranscriptionError),

    /// The NLP solver rejected its input before iterating.
    #[error(transparent)]
    Solver(#[from] interior_point::Error),

    /// A callback failed at an accepted iterate.
    ///
    /// `trajectory` holds that iterate mapped back onto the mesh.
    #[error("evaluation failed at iteration {iter}")]
    Evaluation {
        iter: usize,
        trajectory: Box<Trajectory>,
        #[source]
        source: EvalError,
    },

    #[error(transparent)]
    Assembly(#[from] AssemblyError),
}
