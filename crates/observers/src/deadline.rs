use std::time::{Duration, Instant};

use tracing::warn;
use trajopt_core::{CancelToken, Observer};

/// An observer that cancels a solve once a wall-clock deadline has passed.
///
/// The deadline trips the shared [`CancelToken`], so the solver stops at the
/// top of its next iteration with a cancelled status. Give the solver a
/// clone of [`token`](Self::token) before solving.
///
/// ```
/// use std::time::Duration;
/// use trajopt_core::Observer;
/// use trajopt_observers::Deadline;
///
/// let mut deadline = Deadline::after(Duration::ZERO);
/// let token = deadline.token();
///
/// let action: Option<()> = deadline.observe(&0);
/// assert!(action.is_none());
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct Deadline {
    token: CancelToken,
    at: Instant,
}

impl Deadline {
    /// Creates a deadline `budget` from now with a fresh token.
    #[must_use]
    pub fn after(budget: Duration) -> Self {
        Self::with_token(CancelToken::new(), budget)
    }

    /// Creates a deadline `budget` from now that trips an existing token.
    #[must_use]
    pub fn with_token(token: CancelToken, budget: Duration) -> Self {
        Self {
            token,
            at: Instant::now() + budget,
        }
    }

    /// Returns a clone of the token this deadline trips.
    #[must_use]
    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    #[must_use]
    pub fn has_passed(&self) -> bool {
        Instant::now() >= self.at
    }
}

impl<E, A> Observer<E, A> for Deadline {
    fn observe(&mut self, _event: &E) -> Option<A> {
        if !self.token.is_cancelled() && self.has_passed() {
            warn!("deadline passed, cancelling solve");
            self.token.cancel();
        }
        None
    }
}

/// Allows `&mut Deadline` to be passed to solvers that take an observer by
/// value.
impl<E, A> Observer<E, A> for &mut Deadline {
    fn observe(&mut self, event: &E) -> Option<A> {
        (**self).observe(event)
    }
}
