//! # In-Memory Store Adapter
//!
//! Authoritative rows keyed by (kind, owner), stamped by a [`ServerClock`]
//! and published on an [`InMemoryChangeBus`] after every write.
//!
//! ## Fault Plan
//!
//! Tests and the demo can inject the failure modes a hosted store exhibits:
//!
//! | Fault | Effect |
//! |-------|--------|
//! | `fail_next(op, n, err)` | next `n` calls of `op` return `err` |
//! | `set_latency(d)` | every call sleeps `d` first |
//! | `set_read_lag(n)` | `get` reports absence for `n` reads after each insert |
//! | `deny_owner(owner)` | every call for `owner` is `Unauthorized` |

use crate::clock::ServerClock;
use crate::port::PersistentStore;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_bus::{
    ChangeEvent, ChangeFilter, ChangeOp, ChangePublisher, ChangeSource, InMemoryChangeBus,
    Subscription, SubscriptionError,
};
use shared_types::{EntityKind, EntityPatch, EntityRecord, OwnerId, StoreError};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

type RowKey = (EntityKind, OwnerId);

/// Store operations that faults can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Get,
    Insert,
    Update,
}

impl StoreOp {
    fn as_str(self) -> &'static str {
        match self {
            StoreOp::Get => "get",
            StoreOp::Insert => "insert",
            StoreOp::Update => "update",
        }
    }
}

#[derive(Default)]
struct FaultPlan {
    queued: HashMap<StoreOp, VecDeque<StoreError>>,
    latency: Duration,
    read_lag: u32,
    stale_reads: HashMap<RowKey, u32>,
    denied: HashSet<OwnerId>,
}

/// In-memory implementation of [`PersistentStore`].
pub struct InMemoryStore {
    rows: RwLock<HashMap<RowKey, EntityRecord>>,
    bus: Arc<InMemoryChangeBus>,
    clock: ServerClock,
    faults: Mutex<FaultPlan>,
    calls: Mutex<HashMap<StoreOp, u64>>,
}

impl InMemoryStore {
    /// Create a store with its own bus and the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_parts(Arc::new(InMemoryChangeBus::new()), ServerClock::system())
    }

    #[must_use]
    pub fn with_parts(bus: Arc<InMemoryChangeBus>, clock: ServerClock) -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            bus,
            clock,
            faults: Mutex::new(FaultPlan::default()),
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// The bus this store publishes on.
    #[must_use]
    pub fn bus(&self) -> &Arc<InMemoryChangeBus> {
        &self.bus
    }

    // =========================================================================
    // FAULT INJECTION
    // =========================================================================

    /// Fail the next `count` calls of `op` with `error`.
    pub fn fail_next(&self, op: StoreOp, count: usize, error: StoreError) {
        let mut faults = self.faults.lock();
        let queue = faults.queued.entry(op).or_default();
        queue.extend(std::iter::repeat(error).take(count));
    }

    /// Sleep this long before every call.
    pub fn set_latency(&self, latency: Duration) {
        self.faults.lock().latency = latency;
    }

    /// After each insert, report the row absent for the next `reads` gets.
    pub fn set_read_lag(&self, reads: u32) {
        self.faults.lock().read_lag = reads;
    }

    /// Reject every call touching `owner` with `Unauthorized`.
    pub fn deny_owner(&self, owner: OwnerId) {
        self.faults.lock().denied.insert(owner);
    }

    pub fn allow_owner(&self, owner: OwnerId) {
        self.faults.lock().denied.remove(&owner);
    }

    /// Drop all pending faults and lag.
    pub fn clear_faults(&self) {
        *self.faults.lock() = FaultPlan::default();
    }

    // =========================================================================
    // INSPECTION
    // =========================================================================

    /// Number of calls made for `op` (including failed ones).
    #[must_use]
    pub fn calls(&self, op: StoreOp) -> u64 {
        self.calls.lock().get(&op).copied().unwrap_or(0)
    }

    /// Read a row bypassing faults.
    #[must_use]
    pub fn row(&self, kind: EntityKind, owner: OwnerId) -> Option<EntityRecord> {
        self.rows.read().get(&(kind, owner)).cloned()
    }

    /// Number of rows held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Delete a row out of band (administrative reset) and publish the
    /// `Delete` event.
    pub async fn remove(&self, kind: EntityKind, owner: OwnerId) -> Option<EntityRecord> {
        let removed = self.rows.write().remove(&(kind, owner));
        if let Some(row) = &removed {
            let at = self.clock.next();
            info!(kind = %kind, owner = %owner, "[store] Row removed");
            self.bus
                .publish(ChangeEvent::new(ChangeOp::Delete, row.clone(), at))
                .await;
        }
        removed
    }

    // =========================================================================
    // INTERNAL
    // =========================================================================

    async fn enter(&self, op: StoreOp, owner: OwnerId) -> Result<(), StoreError> {
        *self.calls.lock().entry(op).or_insert(0) += 1;

        let latency = self.faults.lock().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut faults = self.faults.lock();
        if faults.denied.contains(&owner) {
            return Err(StoreError::Unauthorized(format!(
                "row-level policy denies {} for {owner}",
                op.as_str()
            )));
        }
        if let Some(err) = faults.queued.get_mut(&op).and_then(VecDeque::pop_front) {
            debug!(op = op.as_str(), owner = %owner, error = %err, "[store] Injected fault");
            return Err(err);
        }
        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PersistentStore for InMemoryStore {
    async fn get(
        &self,
        kind: EntityKind,
        owner: OwnerId,
    ) -> Result<Option<EntityRecord>, StoreError> {
        self.enter(StoreOp::Get, owner).await?;

        {
            let mut faults = self.faults.lock();
            if let Some(remaining) = faults.stale_reads.get_mut(&(kind, owner)) {
                if *remaining > 0 {
                    *remaining -= 1;
                    debug!(kind = %kind, owner = %owner, "[store] Lagging read reports absence");
                    return Ok(None);
                }
            }
        }

        Ok(self.rows.read().get(&(kind, owner)).cloned())
    }

    async fn insert(&self, record: EntityRecord) -> Result<EntityRecord, StoreError> {
        let kind = record.kind();
        let owner = record.owner_id();
        self.enter(StoreOp::Insert, owner).await?;

        record
            .validate()
            .map_err(|e| StoreError::Conflict(format!("check constraint: {e}")))?;

        let stored = {
            let mut rows = self.rows.write();
            if rows.contains_key(&(kind, owner)) {
                return Err(StoreError::Conflict(format!(
                    "duplicate key: {kind} for {owner}"
                )));
            }
            let mut stored = record;
            let at = self.clock.next();
            stored.stamp_insert(at);
            rows.insert((kind, owner), stored.clone());
            stored
        };

        {
            let mut faults = self.faults.lock();
            if faults.read_lag > 0 {
                let lag = faults.read_lag;
                faults.stale_reads.insert((kind, owner), lag);
            }
        }

        let at = stored.updated_at();
        debug!(kind = %kind, owner = %owner, at, "[store] Row inserted");
        self.bus
            .publish(ChangeEvent::new(ChangeOp::Insert, stored.clone(), at))
            .await;
        Ok(stored)
    }

    async fn update(
        &self,
        kind: EntityKind,
        owner: OwnerId,
        patch: EntityPatch,
    ) -> Result<EntityRecord, StoreError> {
        self.enter(StoreOp::Update, owner).await?;

        let stored = {
            let mut rows = self.rows.write();
            let current = rows
                .get(&(kind, owner))
                .ok_or(StoreError::NotFound { kind, owner })?;

            let at = self.clock.next();
            let mut next = current.clone();
            next.apply_patch(&patch, at)
                .map_err(|e| StoreError::Conflict(e.to_string()))?;
            next.validate()
                .map_err(|e| StoreError::Conflict(format!("check constraint: {e}")))?;
            next.stamp_update(at);
            rows.insert((kind, owner), next.clone());
            next
        };

        let at = stored.updated_at();
        debug!(kind = %kind, owner = %owner, at, "[store] Row updated");
        self.bus
            .publish(ChangeEvent::new(ChangeOp::Update, stored.clone(), at))
            .await;
        Ok(stored)
    }

    async fn subscribe(&self, filter: ChangeFilter) -> Result<Subscription, SubscriptionError> {
        if self.faults.lock().denied.contains(&filter.owner_id) {
            return Err(SubscriptionError::Rejected(format!(
                "row-level policy denies subscribe for {}",
                filter.owner_id
            )));
        }
        ChangeSource::subscribe(self.bus.as_ref(), filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{
        Entity, Ledger, LedgerPatch, Pet, PetPatch, PetStats, Profile, STAT_MAX,
    };

    #[tokio::test]
    async fn test_get_absent_is_none() {
        let store = InMemoryStore::new();
        let got = store.get(EntityKind::Pet, OwnerId::random()).await;
        assert_eq!(got, Ok(None));
    }

    #[tokio::test]
    async fn test_insert_stamps_and_rejects_duplicate() {
        let store = InMemoryStore::new();
        let owner = OwnerId::random();

        let first = store
            .insert(Profile::new(owner, "river").into_record())
            .await
            .unwrap();
        assert!(first.updated_at() > 0);
        let EntityRecord::Profile(profile) = &first else {
            panic!("expected profile");
        };
        assert_eq!(profile.created_at, profile.updated_at);

        let second = store.insert(Profile::new(owner, "lake").into_record()).await;
        assert!(matches!(second, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_update_advances_timestamp() {
        let store = InMemoryStore::new();
        let owner = OwnerId::random();
        let inserted = store
            .insert(Pet::hatch(owner, "cat", "tabby", "Miso").into_record())
            .await
            .unwrap();

        let patch = PetPatch {
            stats: Some(PetStats::new(100, 100, 80, 100, 100)),
            ..PetPatch::default()
        };
        let updated = store
            .update(EntityKind::Pet, owner, Pet::wrap_patch(patch))
            .await
            .unwrap();

        assert!(updated.updated_at() > inserted.updated_at());
        let pet = Pet::from_record(updated).unwrap();
        assert_eq!(pet.stats.happiness, 80);
        assert!(pet.stats.health <= STAT_MAX);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = InMemoryStore::new();
        let owner = OwnerId::random();
        let result = store
            .update(
                EntityKind::Ledger,
                owner,
                Ledger::wrap_patch(LedgerPatch::single(5, "quest")),
            )
            .await;
        assert_eq!(
            result,
            Err(StoreError::NotFound {
                kind: EntityKind::Ledger,
                owner
            })
        );
    }

    #[tokio::test]
    async fn test_overdraft_rejected_by_check_constraint() {
        let store = InMemoryStore::new();
        let owner = OwnerId::random();
        store
            .insert(Ledger::opening(owner, 10, "welcome").into_record())
            .await
            .unwrap();

        let result = store
            .update(
                EntityKind::Ledger,
                owner,
                Ledger::wrap_patch(LedgerPatch::single(-50, "shop")),
            )
            .await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed_in_order() {
        let store = InMemoryStore::new();
        let owner = OwnerId::random();
        store.fail_next(StoreOp::Get, 2, StoreError::TransientNetwork("reset".into()));

        assert!(store.get(EntityKind::Pet, owner).await.is_err());
        assert!(store.get(EntityKind::Pet, owner).await.is_err());
        assert_eq!(store.get(EntityKind::Pet, owner).await, Ok(None));
        assert_eq!(store.calls(StoreOp::Get), 3);
    }

    #[tokio::test]
    async fn test_read_lag_hides_fresh_insert() {
        let store = InMemoryStore::new();
        let owner = OwnerId::random();
        store.set_read_lag(1);
        store
            .insert(Profile::new(owner, "river").into_record())
            .await
            .unwrap();

        assert_eq!(store.get(EntityKind::Profile, owner).await, Ok(None));
        assert!(store.get(EntityKind::Profile, owner).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_denied_owner_is_unauthorized() {
        let store = InMemoryStore::new();
        let owner = OwnerId::random();
        store.deny_owner(owner);

        let result = store.get(EntityKind::Profile, owner).await;
        assert!(matches!(result, Err(StoreError::Unauthorized(_))));
        let sub = store
            .subscribe(ChangeFilter::single(EntityKind::Profile, owner))
            .await;
        assert!(sub.is_err());

        store.allow_owner(owner);
        assert_eq!(store.get(EntityKind::Profile, owner).await, Ok(None));
    }

    #[tokio::test]
    async fn test_writes_publish_change_events() {
        let store = InMemoryStore::new();
        let owner = OwnerId::random();
        let mut sub = store
            .subscribe(ChangeFilter::single(EntityKind::Pet, owner))
            .await
            .unwrap();

        let inserted = store
            .insert(Pet::hatch(owner, "cat", "tabby", "Miso").into_record())
            .await
            .unwrap();

        let event = sub.recv().await.unwrap();
        assert_eq!(event.op, ChangeOp::Insert);
        assert_eq!(event.server_ts, inserted.updated_at());

        store.remove(EntityKind::Pet, owner).await;
        let event = sub.recv().await.unwrap();
        assert_eq!(event.op, ChangeOp::Delete);
        assert!(store.is_empty());
    }
}
