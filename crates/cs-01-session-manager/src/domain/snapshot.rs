//! Observable session state.

use serde::{Deserialize, Serialize};
use shared_bus::SyncHealth;
use shared_types::OwnerId;

use super::identity::{Existence, ExistenceReport, Identity};

/// Everything the UI and the onboarding gate read from the session manager.
///
/// Published through a `watch` channel; every change is a new snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub identity: Option<Identity>,
    /// `true` until the first identity determination has been committed,
    /// and again while an identity change is being resolved.
    pub loading: bool,
    pub existence: ExistenceReport,
    /// Transition lock: redirects are suppressed while set.
    pub transitioning: bool,
    /// Health of the owned-entity change channel.
    pub sync_health: SyncHealth,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            identity: None,
            loading: true,
            existence: ExistenceReport::unknown(),
            transitioning: false,
            sync_health: SyncHealth::Healthy,
        }
    }
}

impl SessionSnapshot {
    #[must_use]
    pub fn has_session(&self) -> bool {
        self.identity.is_some()
    }

    #[must_use]
    pub fn owner_id(&self) -> Option<OwnerId> {
        self.identity.as_ref().map(|i| i.id)
    }

    #[must_use]
    pub fn has_profile(&self) -> Existence {
        self.existence.has_profile
    }

    #[must_use]
    pub fn has_pet(&self) -> Existence {
        self.existence.has_pet
    }
}
