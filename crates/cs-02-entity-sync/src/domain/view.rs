//! What the UI reads from a synchronizer.

use shared_bus::SyncHealth;
use shared_types::SyncError;

use super::phase::SyncPhase;

/// Observable synchronizer state, published through a `watch` channel.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityView<E> {
    pub value: Option<E>,
    pub phase: SyncPhase,
    /// Last surfaced error; cleared by the next successful operation.
    pub error: Option<SyncError>,
    pub sync_health: SyncHealth,
}

impl<E> Default for EntityView<E> {
    fn default() -> Self {
        Self {
            value: None,
            phase: SyncPhase::Uninitialized,
            error: None,
            sync_health: SyncHealth::Healthy,
        }
    }
}

impl<E> EntityView<E> {
    #[must_use]
    pub fn loading(&self) -> bool {
        self.phase.is_loading()
    }

    #[must_use]
    pub fn updating(&self) -> bool {
        self.phase.is_mutating()
    }

    /// Human-readable message for the last error.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(SyncError::user_message)
    }
}
