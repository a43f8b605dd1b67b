//! # Collaborator Gateway
//!
//! The only write surface handed to shop, minigame and coaching modules.
//! Collaborators never see a store handle or a raw patch: coins move through
//! `earn`/`spend`, stats through `apply_stat_delta`, and everything else is
//! read-only.

use std::sync::Arc;

use cs_02_entity_sync::{EntitySyncApi, LedgerSynchronizer, PetSynchronizer};
use shared_types::{Ledger, Mood, Pet, StatDeltas, SyncError};
use tracing::debug;

#[derive(Clone)]
pub struct CollaboratorGateway {
    pet: Arc<PetSynchronizer>,
    ledger: Arc<LedgerSynchronizer>,
}

impl CollaboratorGateway {
    pub fn new(pet: Arc<PetSynchronizer>, ledger: Arc<LedgerSynchronizer>) -> Self {
        Self { pet, ledger }
    }

    pub async fn earn(&self, amount: i64, reason: &str) -> Result<Ledger, SyncError> {
        debug!(amount, reason, "[runtime] Collaborator earn");
        self.ledger.earn(amount, reason).await
    }

    /// Fails with a validation error when the balance does not cover
    /// `amount`; nothing reaches the store in that case.
    pub async fn spend(&self, amount: i64, reason: &str) -> Result<Ledger, SyncError> {
        debug!(amount, reason, "[runtime] Collaborator spend");
        self.ledger.spend(amount, reason).await
    }

    pub async fn apply_stat_delta(&self, deltas: StatDeltas) -> Result<Pet, SyncError> {
        self.pet.apply_stat_delta(deltas).await
    }

    #[must_use]
    pub fn balance(&self) -> Option<i64> {
        self.ledger.balance()
    }

    #[must_use]
    pub fn ledger(&self) -> Option<Ledger> {
        self.ledger.view().value
    }

    #[must_use]
    pub fn pet(&self) -> Option<Pet> {
        self.pet.view().value
    }

    #[must_use]
    pub fn mood(&self) -> Option<Mood> {
        self.pet.mood()
    }
}
