use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// A cloneable flag for cooperative cancellation of a running solve.
///
/// Clones share the same flag, so one clone can be handed to a solver while
/// another is cancelled from a different thread (or from an observer).
/// Solvers check the flag at the top of each iteration and stop with a
/// dedicated cancelled status.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called on any clone.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let token = CancelToken::new();
        let handle = token.clone();
        assert!(!token.is_cancelled());

        std::thread::spawn(move || handle.cancel())
            .join()
            .expect("thread should not panic");

        assert!(token.is_cancelled());
    }
}
