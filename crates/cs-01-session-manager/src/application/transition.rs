//! RAII holder for the transition lock.

use std::sync::Arc;

use crate::ports::SessionApi;

/// Holds the suppress-redirect flag for its lifetime.
///
/// Dropping the guard clears the flag, so every exit path (success, `?`,
/// panic unwinding, task cancellation) releases it.
#[must_use = "the transition lock is released as soon as the guard is dropped"]
pub struct TransitionGuard {
    session: Arc<dyn SessionApi>,
}

impl TransitionGuard {
    /// Set the transition lock and return its guard.
    pub fn acquire(session: Arc<dyn SessionApi>) -> Self {
        session.mark_transition_start();
        Self { session }
    }
}

impl Drop for TransitionGuard {
    fn drop(&mut self) {
        self.session.mark_transition_end();
    }
}
