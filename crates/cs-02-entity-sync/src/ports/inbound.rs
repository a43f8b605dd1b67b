//! # Inbound Ports
//!
//! Object-safe API of one synchronizer, as consumed by UI hooks.

use async_trait::async_trait;
use shared_types::{Entity, OwnerId, SyncError};
use tokio::sync::watch;

use crate::domain::EntityView;

/// Entity Synchronizer API - inbound port.
#[async_trait]
pub trait EntitySyncApi<E: Entity>: Send + Sync {
    /// Latest view.
    fn view(&self) -> EntityView<E>;

    /// Watch view changes.
    fn watch(&self) -> watch::Receiver<EntityView<E>>;

    /// Owner the synchronizer is attached to.
    fn owner(&self) -> Option<OwnerId>;

    /// Load the owner's row and follow its changes.
    async fn load(&self, owner: OwnerId) -> Result<Option<E>, SyncError>;

    /// Reload the current owner's row.
    async fn refresh(&self) -> Result<Option<E>, SyncError>;

    /// Optimistically apply and persist a patch.
    async fn mutate(&self, patch: E::Patch) -> Result<E, SyncError>;

    /// Drop state, pending work and the change channel.
    fn detach(&self);
}
