use std::sync::Arc;

/// A reference signal `r(t)` used by tracking costs.
pub type Reference = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// An integrand `L(t, x, u)` used by integral costs.
pub type Integrand = Arc<dyn Fn(f64, &[f64], &[f64]) -> f64 + Send + Sync>;

/// A named, weighted contribution to the objective.
///
/// The objective of a phase is the sum of `weight * value` over its terms.
#[derive(Clone)]
pub struct CostTerm {
    name: String,
    weight: f64,
    kind: CostKind,
}

/// The quantity a [`CostTerm`] measures.
#[derive(Clone)]
pub enum CostKind {
    /// The final time `tf`.
    FinalTime,

    /// `∫ Σ u_i² dt` over all controls.
    ControlEffort,

    /// `∫ (x_state - r(t))² dt` for one named state.
    StateTracking { state: String, reference: Reference },

    /// `∫ L(t, x, u) dt` for a caller-supplied integrand.
    Integral(Integrand),
}

impl CostTerm {
    /// Minimizes the final time.
    pub fn final_time(name: impl Into<String>) -> Self {
        Self::new(name, CostKind::FinalTime)
    }

    /// Minimizes the integral of squared controls.
    pub fn control_effort(name: impl Into<String>) -> Self {
        Self::new(name, CostKind::ControlEffort)
    }

    /// Minimizes the integrated squared error between a state and `reference`.
    pub fn state_tracking<R>(name: impl Into<String>, state: impl Into<String>, reference: R) -> Self
    where
        R: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        Self::new(
            name,
            CostKind::StateTracking {
                state: state.into(),
                reference: Arc::new(reference),
            },
        )
    }

    /// Minimizes the integral of `integrand(t, x, u)`.
    pub fn integral<L>(name: impl Into<String>, integrand: L) -> Self
    where
        L: Fn(f64, &[f64], &[f64]) -> f64 + Send + Sync + 'static,
    {
        Self::new(name, CostKind::Integral(Arc::new(integrand)))
    }

    fn new(name: impl Into<String>, kind: CostKind) -> Self {
        Self {
            name: name.into(),
            weight: 1.0,
            kind,
        }
    }

    /// Sets the weight applied to this term.
    #[must_use]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    #[must_use]
    pub fn kind(&self) -> &CostKind {
        &self.kind
    }
}

impl std::fmt::Debug for CostTerm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CostTerm")
            .field("name", &self.name)
            .field("weight", &self.weight)
            .field("kind", &self.kind)
            .finish()
    }
}

impl std::fmt::Debug for CostKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FinalTime => f.write_str("FinalTime"),
            Self::ControlEffort => f.write_str("ControlEffort"),
            Self::StateTracking { state, .. } => f
                .debug_struct("StateTracking")
                .field("state", state)
                .finish_non_exhaustive(),
            Self::Integral(_) => f.write_str("Integral(..)"),
        }
    }
}
