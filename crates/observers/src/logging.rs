//! Logs solver progress through `tracing`.

use tracing::{Level, debug, info};
use trajopt_core::Observer;

use crate::traits::{HasConstraintViolation, HasIteration, HasObjective};

/// An observer that logs every `every`-th iterate as a `tracing` event.
///
/// Iteration 0 is always logged. It never returns an action, so it does not
/// change how the solve proceeds.
///
/// ```
/// use trajopt_observers::TracingObserver;
///
/// let observer = TracingObserver::new().every(10);
/// assert_eq!(observer.cadence(), 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TracingObserver {
    every: usize,
    level: Level,
}

impl TracingObserver {
    /// Logs every iterate at `INFO`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            every: 1,
            level: Level::INFO,
        }
    }

    /// Logs only iterations that are a multiple of `every`.
    ///
    /// A cadence of zero is treated as one.
    #[must_use]
    pub fn every(mut self, every: usize) -> Self {
        self.every = every.max(1);
        self
    }

    /// Logs at `DEBUG` instead of `INFO`.
    #[must_use]
    pub fn debug(mut self) -> Self {
        self.level = Level::DEBUG;
        self
    }

    #[must_use]
    pub fn cadence(&self) -> usize {
        self.every
    }

    /// Returns `true` if the given iteration would be logged.
    #[must_use]
    pub fn logs(&self, iteration: usize) -> bool {
        iteration % self.every == 0
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl<E, A> Observer<E, A> for TracingObserver
where
    E: HasIteration + HasObjective + HasConstraintViolation,
{
    fn observe(&mut self, event: &E) -> Option<A> {
        let iter = event.iteration();
        if !self.logs(iter) {
            return None;
        }

        let objective = event.objective();
        let constraint_violation = event.constraint_violation();
        if self.level == Level::DEBUG {
            debug!(iter, objective, constraint_violation, "solver iterate");
        } else {
            info!(iter, objective, constraint_violation, "solver iterate");
        }
        None
    }
}

/// Allows `&mut TracingObserver` to be passed to solvers that take an
/// observer by value.
impl<E, A> Observer<E, A> for &mut TracingObserver
where
    E: HasIteration + HasObjective + HasConstraintViolation,
{
    fn observe(&mut self, event: &E) -> Option<A> {
        (**self).observe(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Event(usize);

    impl HasIteration for Event {
        fn iteration(&self) -> usize {
            self.0
        }
    }

    impl HasObjective for Event {
        fn objective(&self) -> f64 {
            1.0
        }
    }

    impl HasConstraintViolation for Event {
        fn constraint_violation(&self) -> f64 {
            0.0
        }
    }

    #[test]
    fn cadence_selects_iterations() {
        let observer = TracingObserver::new().every(5);

        assert!(observer.logs(0));
        assert!(!observer.logs(3));
        assert!(observer.logs(10));
        assert_eq!(TracingObserver::new().every(0).cadence(), 1);
    }

    #[test]
    fn never_returns_an_action() {
        let mut observer = TracingObserver::new().debug();

        for i in 0..3 {
            let action: Option<()> = observer.observe(&Event(i));
            assert!(action.is_none());
        }
    }
}
