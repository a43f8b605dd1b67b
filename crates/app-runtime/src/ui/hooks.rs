//! Handles the UI layer renders from.
//!
//! Each hook owns a `watch` receiver: `changed()` resolves when the view
//! should re-render, and every accessor reads the latest published value.

use std::sync::Arc;

use cs_01_session_manager::{AuthError, Identity, SessionApi, SessionManager, SessionSnapshot};
use cs_02_entity_sync::{EntitySyncApi, EntitySynchronizer, EntityView};
use shared_bus::SyncHealth;
use shared_types::{Entity, Ledger, Pet, Preferences, Profile, SyncError};
use tokio::sync::watch;

use crate::wiring::Synchronizers;

/// Maps an entity type to its synchronizer in a [`Synchronizers`] set.
pub trait SyncedEntity: Entity {
    fn synchronizer(syncs: &Synchronizers) -> Arc<EntitySynchronizer<Self>>;
}

impl SyncedEntity for Profile {
    fn synchronizer(syncs: &Synchronizers) -> Arc<EntitySynchronizer<Self>> {
        Arc::clone(&syncs.profile)
    }
}

impl SyncedEntity for Pet {
    fn synchronizer(syncs: &Synchronizers) -> Arc<EntitySynchronizer<Self>> {
        Arc::clone(&syncs.pet)
    }
}

impl SyncedEntity for Ledger {
    fn synchronizer(syncs: &Synchronizers) -> Arc<EntitySynchronizer<Self>> {
        Arc::clone(&syncs.ledger)
    }
}

impl SyncedEntity for Preferences {
    fn synchronizer(syncs: &Synchronizers) -> Arc<EntitySynchronizer<Self>> {
        Arc::clone(&syncs.preferences)
    }
}

/// `use_identity()`.
pub struct IdentityHook {
    session: Arc<SessionManager>,
    rx: watch::Receiver<SessionSnapshot>,
}

impl IdentityHook {
    pub(crate) fn new(session: Arc<SessionManager>) -> Self {
        let rx = session.watch();
        Self { session, rx }
    }

    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.rx.borrow().identity.clone()
    }

    #[must_use]
    pub fn loading(&self) -> bool {
        self.rx.borrow().loading
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.rx.borrow().clone()
    }

    /// Wait for the next snapshot. `false` once the session is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.session.sign_out().await
    }
}

/// `use_entity(kind)`.
pub struct EntityHook<E: Entity> {
    sync: Arc<EntitySynchronizer<E>>,
    rx: watch::Receiver<EntityView<E>>,
}

impl<E: Entity> EntityHook<E> {
    pub(crate) fn new(sync: Arc<EntitySynchronizer<E>>) -> Self {
        let rx = sync.watch();
        Self { sync, rx }
    }

    #[must_use]
    pub fn view(&self) -> EntityView<E> {
        self.rx.borrow().clone()
    }

    #[must_use]
    pub fn value(&self) -> Option<E> {
        self.rx.borrow().value.clone()
    }

    #[must_use]
    pub fn loading(&self) -> bool {
        self.rx.borrow().loading()
    }

    #[must_use]
    pub fn updating(&self) -> bool {
        self.rx.borrow().updating()
    }

    /// Human-readable message of the last failure.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.rx.borrow().error_message()
    }

    #[must_use]
    pub fn sync_health(&self) -> SyncHealth {
        self.rx.borrow().sync_health.clone()
    }

    /// Screen-driven edit (rename, settings). Collaborators write through
    /// [`CollaboratorGateway`](crate::CollaboratorGateway) instead. Patches
    /// still pass record validation, so stats are clamped and a ledger
    /// patch cannot break `balance == Σ amount` or go negative.
    pub async fn mutate(&self, patch: E::Patch) -> Result<E, SyncError> {
        self.sync.mutate(patch).await
    }

    pub async fn refresh(&self) -> Result<Option<E>, SyncError> {
        self.sync.refresh().await
    }

    /// Wait for the next view. `false` once the synchronizer is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}
