//! Sync health signal surfaced to the UI.

use serde::{Deserialize, Serialize};

/// Whether live change delivery is currently working.
///
/// `Degraded` is informational: local state keeps working, remote changes
/// may arrive late until the channel is re-established.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SyncHealth {
    #[default]
    Healthy,
    Degraded {
        reason: String,
    },
}

impl SyncHealth {
    pub fn degraded(reason: impl Into<String>) -> Self {
        SyncHealth::Degraded {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn is_degraded(&self) -> bool {
        matches!(self, SyncHealth::Degraded { .. })
    }
}
