use thiserror::Error;

/// Errors detected while defining a [`Phase`](super::Phase).
///
/// These are reported eagerly, before any transcription or solve.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProblemError {
    #[error("invalid bounds for `{name}`: {reason}")]
    InvalidBounds { name: String, reason: String },

    #[error("duplicate {kind} name `{name}`")]
    DuplicateName { kind: &'static str, name: String },

    #[error("`{referenced_by}` refers to unknown state `{name}`")]
    UnknownVariable { name: String, referenced_by: String },

    #[error("cost `{name}` has non-finite weight {weight}")]
    InvalidWeight { name: String, weight: f64 },

    #[error("phase has no state variables")]
    NoStates,

    #[error("compact bounds take 0, 1, or 2 values, got {len}")]
    CompactBounds { len: usize },
}

impl ProblemError {
    pub(super) fn invalid_bounds(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidBounds {
            name: name.to_owned(),
            reason: reason.into(),
        }
    }
}
