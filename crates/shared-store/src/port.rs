//! Outbound port for the remote persistent store.

use async_trait::async_trait;
use shared_bus::{ChangeFilter, ChangeSource, Subscription, SubscriptionError};
use shared_types::{EntityKind, EntityPatch, EntityRecord, OwnerId, StoreError};
use std::sync::Arc;

/// Remote persistent store with row-level authorization.
///
/// One row per (kind, owner). Rows returned from writes carry the server
/// stamp and are the authoritative value to reconcile against.
#[async_trait]
pub trait PersistentStore: Send + Sync {
    /// Point lookup. Absence is `Ok(None)`, never `NotFound`.
    async fn get(&self, kind: EntityKind, owner: OwnerId)
        -> Result<Option<EntityRecord>, StoreError>;

    /// Insert a new row. A row already present for (kind, owner) is a
    /// `Conflict`.
    async fn insert(&self, record: EntityRecord) -> Result<EntityRecord, StoreError>;

    /// Apply a partial update to an existing row.
    async fn update(
        &self,
        kind: EntityKind,
        owner: OwnerId,
        patch: EntityPatch,
    ) -> Result<EntityRecord, StoreError>;

    /// Open a change subscription for rows matching `filter`.
    async fn subscribe(&self, filter: ChangeFilter) -> Result<Subscription, SubscriptionError>;
}

/// Exposes a store's change feed as a [`ChangeSource`] for the channel
/// supervisor.
pub struct StoreChanges(pub Arc<dyn PersistentStore>);

impl StoreChanges {
    #[must_use]
    pub fn source(store: Arc<dyn PersistentStore>) -> Arc<dyn ChangeSource> {
        Arc::new(Self(store))
    }
}

#[async_trait]
impl ChangeSource for StoreChanges {
    async fn subscribe(&self, filter: ChangeFilter) -> Result<Subscription, SubscriptionError> {
        self.0.subscribe(filter).await
    }
}
