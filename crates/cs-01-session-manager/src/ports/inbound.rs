//! # Inbound Ports
//!
//! API exposed by the session manager to the runtime, the synchronizers and
//! the UI hooks.

use async_trait::async_trait;
use tokio::sync::watch;

use crate::domain::{ExistenceReport, Identity, SessionSnapshot};
use crate::ports::outbound::AuthError;
use shared_types::OwnerId;

/// Session Manager API - inbound port.
#[async_trait]
pub trait SessionApi: Send + Sync {
    /// Latest snapshot.
    fn snapshot(&self) -> SessionSnapshot;

    /// Watch snapshot changes.
    fn watch(&self) -> watch::Receiver<SessionSnapshot>;

    /// Current identity, if signed in.
    fn current_identity(&self) -> Option<Identity> {
        self.snapshot().identity
    }

    /// Point lookups for the owner's Profile and Pet rows.
    async fn check_entity_existence(&self, owner: OwnerId) -> ExistenceReport;

    /// Re-run the existence check for the current identity.
    ///
    /// Returns `true` only when both lookups completed.
    async fn refresh(&self) -> bool;

    /// Set the suppress-redirect flag.
    fn mark_transition_start(&self);

    /// Clear the suppress-redirect flag.
    fn mark_transition_end(&self);

    /// Sign out through the auth provider.
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// A store call was rejected as unauthorized: sign out upstream.
    async fn handle_unauthorized(&self, operation: &str);
}
