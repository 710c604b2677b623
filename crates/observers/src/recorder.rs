use trajopt_core::Observer;

use crate::traits::{HasConstraintViolation, HasIteration, HasObjective};

/// One recorded iterate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Record {
    pub iter: usize,
    pub objective: f64,
    pub constraint_violation: f64,
}

/// An observer that keeps the convergence history of a solve.
///
/// Pass `&mut recorder` to the solver so the history is still available
/// after the solve returns.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    records: Vec<Record>,
}

impl Recorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Returns the most recent record, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Record> {
        self.records.last()
    }

    /// Consumes the recorder and returns its history.
    #[must_use]
    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    /// Records the values carried by `event`.
    pub fn record<E>(&mut self, event: &E)
    where
        E: HasIteration + HasObjective + HasConstraintViolation,
    {
        self.records.push(Record {
            iter: event.iteration(),
            objective: event.objective(),
            constraint_violation: event.constraint_violation(),
        });
    }
}

impl<E, A> Observer<E, A> for Recorder
where
    E: HasIteration + HasObjective + HasConstraintViolation,
{
    fn observe(&mut self, event: &E) -> Option<A> {
        self.record(event);
        None
    }
}

/// Allows `&mut Recorder` to be passed to solvers that take an observer by
/// value.
impl<E, A> Observer<E, A> for &mut Recorder
where
    E: HasIteration + HasObjective + HasConstraintViolation,
{
    fn observe(&mut self, event: &E) -> Option<A> {
        (**self).observe(event)
    }
}
