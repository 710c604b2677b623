//! Problem definition: a single phase of an optimal control problem.
//!
//! A [`Phase`] is assembled declaratively with a [`PhaseBuilder`]. Each
//! `add_*` call validates its own arguments immediately, and
//! [`PhaseBuilder::build`] runs one finalize pass over the cross references
//! before producing an immutable phase. A half-built phase can never reach a
//! solver.
//!
//! ```
//! use trajopt_core::{Bounds, CostTerm, Phase};
//!
//! let mut builder = Phase::builder("sliding_mass");
//! builder
//!     .set_time_bounds(0.0, [0.0, 5.0])?
//!     .add_state("position", [-5.0, 5.0], 0.0, 1.0)?
//!     .add_state("speed", [-50.0, 50.0], [0.0], [0.0])?
//!     .add_control("force", Bounds::new(-50.0, 50.0))?
//!     .add_cost(CostTerm::final_time("final_time"))?;
//! let phase = builder.build()?;
//!
//! assert_eq!(phase.num_states(), 2);
//! # Ok::<(), trajopt_core::ProblemError>(())
//! ```

mod bounds;
mod builder;
mod cost;
mod error;

use std::sync::Arc;

use serde::Serialize;

use crate::PathConstraint;

pub use bounds::Bounds;
pub use builder::PhaseBuilder;
pub use cost::{CostKind, CostTerm, Integrand, Reference};
pub use error::ProblemError;

/// A named state or control with its admissible values.
///
/// `initial` and `final_` hold the effective endpoint bounds: any unbounded
/// end supplied by the caller has already been replaced by the corresponding
/// end of `range`, so both are always subsets of `range`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableInfo {
    name: String,
    range: Bounds,
    initial: Bounds,
    #[serde(rename = "final")]
    final_: Bounds,
}

impl VariableInfo {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bounds that apply at every mesh point.
    #[must_use]
    pub fn range(&self) -> Bounds {
        self.range
    }

    /// Bounds that apply at the first mesh point.
    #[must_use]
    pub fn initial(&self) -> Bounds {
        self.initial
    }

    /// Bounds that apply at the last mesh point.
    #[must_use]
    pub fn final_bounds(&self) -> Bounds {
        self.final_
    }
}

/// A path constraint registered on a phase, with one bound per output.
#[derive(Debug, Clone)]
pub struct PathConstraintInfo {
    name: String,
    constraint: Arc<dyn PathConstraint>,
    bounds: Vec<Bounds>,
}

impl PathConstraintInfo {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn constraint(&self) -> &dyn PathConstraint {
        self.constraint.as_ref()
    }

    #[must_use]
    pub fn bounds(&self) -> &[Bounds] {
        &self.bounds
    }
}

/// A validated single-phase optimal control problem.
///
/// Owns the time bounds, states, controls, cost terms, and path constraints.
/// Names are unique within each kind. A phase is immutable once built.
#[derive(Debug, Clone)]
pub struct Phase {
    name: String,
    initial_time: Bounds,
    final_time: Bounds,
    states: Vec<VariableInfo>,
    controls: Vec<VariableInfo>,
    costs: Vec<CostTerm>,
    path_constraints: Vec<PathConstraintInfo>,
}

impl Phase {
    /// Starts building a phase.
    pub fn builder(name: impl Into<String>) -> PhaseBuilder {
        PhaseBuilder::new(name)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bounds on the initial time `t0`.
    #[must_use]
    pub fn initial_time(&self) -> Bounds {
        self.initial_time
    }

    /// Bounds on the final time `tf`.
    #[must_use]
    pub fn final_time(&self) -> Bounds {
        self.final_time
    }

    #[must_use]
    pub fn states(&self) -> &[VariableInfo] {
        &self.states
    }

    #[must_use]
    pub fn controls(&self) -> &[VariableInfo] {
        &self.controls
    }

    #[must_use]
    pub fn costs(&self) -> &[CostTerm] {
        &self.costs
    }

    #[must_use]
    pub fn path_constraints(&self) -> &[PathConstraintInfo] {
        &self.path_constraints
    }

    #[must_use]
    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn num_controls(&self) -> usize {
        self.controls.len()
    }

    /// Returns the index of the named state.
    #[must_use]
    pub fn state_index(&self, name: &str) -> Option<usize> {
        self.states.iter().position(|s| s.name == name)
    }

    /// Returns the index of the named control.
    #[must_use]
    pub fn control_index(&self, name: &str) -> Option<usize> {
        self.controls.iter().position(|c| c.name == name)
    }

    pub fn state_names(&self) -> impl Iterator<Item = &str> {
        self.states.iter().map(VariableInfo::name)
    }

    pub fn control_names(&self) -> impl Iterator<Item = &str> {
        self.controls.iter().map(VariableInfo::name)
    }
}
