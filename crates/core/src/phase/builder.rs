use std::sync::Arc;

use crate::PathConstraint;

use super::{Bounds, CostKind, CostTerm, PathConstraintInfo, Phase, ProblemError, VariableInfo};

/// Accumulates the pieces of a [`Phase`].
///
/// Every `add_*`/`set_*` method validates its arguments and either records
/// them or returns an error without touching what was already added; a name
/// that is already taken is rejected, never overwritten.
///
/// Time bounds default to a fixed interval `[0, 1]`.
#[derive(Debug, Clone)]
pub struct PhaseBuilder {
    name: String,
    initial_time: Bounds,
    final_time: Bounds,
    states: Vec<VariableInfo>,
    controls: Vec<VariableInfo>,
    costs: Vec<CostTerm>,
    path_constraints: Vec<PathConstraintInfo>,
}

impl PhaseBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            initial_time: Bounds::fixed(0.0),
            final_time: Bounds::fixed(1.0),
            states: Vec::new(),
            controls: Vec::new(),
            costs: Vec::new(),
            path_constraints: Vec::new(),
        }
    }

    /// Sets the bounds on the initial and final times.
    ///
    /// The two intervals may overlap, but some `t0 < tf` must be admissible.
    ///
    /// # Errors
    ///
    /// Returns [`ProblemError::InvalidBounds`] if either interval is invalid
    /// or if every admissible `t0` is at or after every admissible `tf`.
    pub fn set_time_bounds(
        &mut self,
        initial: impl Into<Bounds>,
        final_: impl Into<Bounds>,
    ) -> Result<&mut Self, ProblemError> {
        let initial = initial.into();
        let final_ = final_.into();

        check(&initial, "initial time")?;
        check(&final_, "final time")?;
        if initial.lower() >= final_.upper() {
            return Err(ProblemError::invalid_bounds(
                "time",
                format!("no initial time in {initial} precedes a final time in {final_}"),
            ));
        }

        self.initial_time = initial;
        self.final_time = final_;
        Ok(self)
    }

    /// Adds a state variable.
    ///
    /// `initial` and `final_` constrain the first and last mesh points. An
    /// unbounded end inherits the corresponding end of `range`; pass
    /// [`Bounds::unbounded`] to leave an endpoint free within the range.
    ///
    /// # Errors
    ///
    /// Returns [`ProblemError::DuplicateName`] if a state with this name
    /// exists, or [`ProblemError::InvalidBounds`] if any bound is invalid or a
    /// finite endpoint bound lies outside `range`.
    pub fn add_state(
        &mut self,
        name: impl Into<String>,
        range: impl Into<Bounds>,
        initial: impl Into<Bounds>,
        final_: impl Into<Bounds>,
    ) -> Result<&mut Self, ProblemError> {
        let name = name.into();
        if self.states.iter().any(|s| s.name == name) {
            return Err(ProblemError::DuplicateName {
                kind: "state",
                name,
            });
        }

        let info = variable(name, range.into(), initial.into(), final_.into())?;
        self.states.push(info);
        Ok(self)
    }

    /// Adds a control variable bounded by `range` at every mesh point.
    ///
    /// # Errors
    ///
    /// Returns [`ProblemError::DuplicateName`] if a control with this name
    /// exists, or [`ProblemError::InvalidBounds`] if `range` is invalid.
    pub fn add_control(
        &mut self,
        name: impl Into<String>,
        range: impl Into<Bounds>,
    ) -> Result<&mut Self, ProblemError> {
        self.add_control_with_endpoints(name, range, Bounds::unbounded(), Bounds::unbounded())
    }

    /// Adds a control variable with additional bounds at the first and last
    /// mesh points, following the same rules as [`add_state`](Self::add_state).
    ///
    /// # Errors
    ///
    /// See [`add_state`](Self::add_state).
    pub fn add_control_with_endpoints(
        &mut self,
        name: impl Into<String>,
        range: impl Into<Bounds>,
        initial: impl Into<Bounds>,
        final_: impl Into<Bounds>,
    ) -> Result<&mut Self, ProblemError> {
        let name = name.into();
        if self.controls.iter().any(|c| c.name == name) {
            return Err(ProblemError::DuplicateName {
                kind: "control",
                name,
            });
        }

        let info = variable(name, range.into(), initial.into(), final_.into())?;
        self.controls.push(info);
        Ok(self)
    }

    /// Adds a term to the objective.
    ///
    /// # Errors
    ///
    /// Returns [`ProblemError::DuplicateName`] if a cost with this name
    /// exists, or [`ProblemError::InvalidWeight`] if the weight is not finite.
    pub fn add_cost(&mut self, term: CostTerm) -> Result<&mut Self, ProblemError> {
        if self.costs.iter().any(|c| c.name() == term.name()) {
            return Err(ProblemError::DuplicateName {
                kind: "cost",
                name: term.name().to_owned(),
            });
        }
        if !term.weight().is_finite() {
            return Err(ProblemError::InvalidWeight {
                name: term.name().to_owned(),
                weight: term.weight(),
            });
        }

        self.costs.push(term);
        Ok(self)
    }

    /// Adds a path constraint with one bound per constraint output.
    ///
    /// # Errors
    ///
    /// Returns [`ProblemError::DuplicateName`] if a path constraint with this
    /// name exists, or [`ProblemError::InvalidBounds`] if the number of bounds
    /// does not match [`PathConstraint::num_outputs`] or any bound is invalid.
    pub fn add_path_constraint<C>(
        &mut self,
        name: impl Into<String>,
        constraint: C,
        bounds: Vec<Bounds>,
    ) -> Result<&mut Self, ProblemError>
    where
        C: PathConstraint + 'static,
    {
        let name = name.into();
        if self.path_constraints.iter().any(|p| p.name == name) {
            return Err(ProblemError::DuplicateName {
                kind: "path constraint",
                name,
            });
        }
        if bounds.len() != constraint.num_outputs() {
            return Err(ProblemError::invalid_bounds(
                &name,
                format!(
                    "{} bounds given for {} outputs",
                    bounds.len(),
                    constraint.num_outputs()
                ),
            ));
        }
        for bound in &bounds {
            check(bound, &name)?;
        }

        self.path_constraints.push(PathConstraintInfo {
            name,
            constraint: Arc::new(constraint),
            bounds,
        });
        Ok(self)
    }

    /// Runs the finalize pass and produces an immutable [`Phase`].
    ///
    /// # Errors
    ///
    /// Returns [`ProblemError::NoStates`] if no state was added, or
    /// [`ProblemError::UnknownVariable`] if a tracking cost names a state that
    /// does not exist.
    pub fn build(self) -> Result<Phase, ProblemError> {
        if self.states.is_empty() {
            return Err(ProblemError::NoStates);
        }

        for cost in &self.costs {
            if let CostKind::StateTracking { state, .. } = cost.kind() {
                if !self.states.iter().any(|s| &s.name == state) {
                    return Err(ProblemError::UnknownVariable {
                        name: state.clone(),
                        referenced_by: cost.name().to_owned(),
                    });
                }
            }
        }

        Ok(Phase {
            name: self.name,
            initial_time: self.initial_time,
            final_time: self.final_time,
            states: self.states,
            controls: self.controls,
            costs: self.costs,
            path_constraints: self.path_constraints,
        })
    }
}

fn check(bounds: &Bounds, name: &str) -> Result<(), ProblemError> {
    bounds
        .validate()
        .map_err(|reason| ProblemError::invalid_bounds(name, reason))
}

fn variable(
    name: String,
    range: Bounds,
    initial: Bounds,
    final_: Bounds,
) -> Result<VariableInfo, ProblemError> {
    check(&range, &name)?;
    check(&initial, &name)?;
    check(&final_, &name)?;

    let initial = initial.inherit(&range);
    let final_ = final_.inherit(&range);

    for (label, endpoint) in [("initial", initial), ("final", final_)] {
        if !endpoint.is_within(&range) {
            return Err(ProblemError::invalid_bounds(
                &name,
                format!("{label} bounds {endpoint} fall outside valid range {range}"),
            ));
        }
        // A finite end beyond the opposite end of the range inherits into an
        // empty interval.
        endpoint
            .validate()
            .map_err(|reason| ProblemError::invalid_bounds(&name, reason))?;
    }

    Ok(VariableInfo {
        name,
        range,
        initial,
        final_,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sliding_mass() -> PhaseBuilder {
        let mut builder = PhaseBuilder::new("sliding_mass");
        builder
            .set_time_bounds(0.0, [0.0, 5.0])
            .unwrap()
            .add_state("position", [-5.0, 5.0], 0.0, 1.0)
            .unwrap()
            .add_state("speed", [-50.0, 50.0], [0.0], [0.0])
            .unwrap()
            .add_control("force", [-50.0, 50.0])
            .unwrap();
        builder
    }

    #[test]
    fn builds_sliding_mass_phase() {
        let mut builder = sliding_mass();
        builder.add_cost(CostTerm::final_time("tf")).unwrap();
        let phase = builder.build().expect("valid phase");

        assert_eq!(phase.name(), "sliding_mass");
        assert_eq!(phase.num_states(), 2);
        assert_eq!(phase.num_controls(), 1);
        assert_eq!(phase.initial_time(), Bounds::fixed(0.0));
        assert_eq!(phase.final_time(), Bounds::new(0.0, 5.0));
        assert_eq!(phase.states()[0].final_bounds(), Bounds::fixed(1.0));
        assert_eq!(phase.state_index("speed"), Some(1));
        assert_eq!(phase.control_index("force"), Some(0));
    }

    #[test]
    fn control_endpoints_inherit_the_range() {
        let phase = sliding_mass().build().unwrap();
        let force = &phase.controls()[0];

        assert_eq!(force.initial(), force.range());
        assert_eq!(force.final_bounds(), force.range());
    }

    #[test]
    fn final_bound_outside_range_is_rejected() {
        let mut builder = PhaseBuilder::new("p");
        let err = builder
            .add_state("x", [-1.0, 1.0], 0.0, 2.0)
            .unwrap_err();

        assert!(matches!(err, ProblemError::InvalidBounds { ref name, .. } if name == "x"));
        assert!(builder.clone().build().is_err(), "nothing was recorded");
    }

    #[test]
    fn reversed_range_is_rejected() {
        let mut builder = PhaseBuilder::new("p");
        let err = builder
            .add_control("u", [1.0, -1.0])
            .unwrap_err();

        assert!(matches!(err, ProblemError::InvalidBounds { .. }));
    }

    #[test]
    fn duplicate_names_are_rejected_not_overwritten() {
        let mut builder = sliding_mass();
        let err = builder
            .add_state("position", [-1.0, 1.0], Bounds::unbounded(), Bounds::unbounded())
            .unwrap_err();
        assert_eq!(
            err,
            ProblemError::DuplicateName {
                kind: "state",
                name: "position".into()
            }
        );

        builder.add_cost(CostTerm::final_time("tf")).unwrap();
        assert!(builder.add_cost(CostTerm::control_effort("tf")).is_err());

        let phase = builder.build().unwrap();
        assert_eq!(phase.states()[0].range(), Bounds::new(-5.0, 5.0));
        assert_eq!(phase.costs().len(), 1);
    }

    #[test]
    fn time_bounds_must_admit_positive_duration() {
        let mut builder = PhaseBuilder::new("p");

        assert!(builder.set_time_bounds(1.0, 1.0).is_err());
        assert!(builder.set_time_bounds([0.0, 2.0], [1.0, 3.0]).is_ok());
    }

    #[test]
    fn tracking_unknown_state_fails_at_build() {
        let mut builder = sliding_mass();
        builder
            .add_cost(CostTerm::state_tracking("track", "angle", |_t| 0.0))
            .unwrap();

        assert!(matches!(
            builder.build(),
            Err(ProblemError::UnknownVariable { .. })
        ));
    }

    #[test]
    fn path_constraint_bounds_must_match_outputs() {
        let mut builder = sliding_mass();
        let power = crate::constraint::from_fn(1, |_t, x: &[f64], u: &[f64]| vec![x[1] * u[0]]);

        let err = builder
            .add_path_constraint("power", power, vec![Bounds::at_most(10.0); 2])
            .unwrap_err();

        assert!(matches!(err, ProblemError::InvalidBounds { .. }));
    }

    #[test]
    fn non_finite_weight_is_rejected() {
        let mut builder = sliding_mass();
        let term = CostTerm::control_effort("effort").with_weight(f64::NAN);

        assert!(matches!(
            builder.add_cost(term),
            Err(ProblemError::InvalidWeight { .. })
        ));
    }

    #[test]
    fn requires_at_least_one_state() {
        assert_eq!(
            PhaseBuilder::new("empty").build().unwrap_err(),
            ProblemError::NoStates
        );
    }
}
