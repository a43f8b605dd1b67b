//! # Entity Synchronizer
//!
//! Local cache of one owner's row of kind `E::KIND`, kept consistent with
//! the store through optimistic writes and a change channel.
//!
//! ## Write path
//!
//! ```text
//! mutate(patch)
//!   ├── wait for the mutation lock (FIFO: issuance order)
//!   ├── apply to a clone, validate          → Validation error, store untouched
//!   ├── publish optimistic value (Mutating)
//!   ├── store.update
//!   │     ├── Ok(row)  → echo recorded, value = row, Present
//!   │     └── Err(e)   → value = snapshot, prior phase, error surfaced
//!   └── drain events buffered while Mutating (last-write-wins)
//! ```
//!
//! Every state write checks the generation taken when the operation
//! started. `detach()` or an owner change bumps it, so results for a
//! previous owner are dropped instead of written.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use companion_telemetry::{CHANGE_EVENTS, CHANNEL_DEGRADED, LOADS, MUTATIONS, ROLLBACKS};
use shared_bus::{
    open_channel, ChangeEvent, ChangeFilter, ChangeHandler, ChangeOp, ChannelHandle, EchoCache,
    HandlerError, SyncHealth,
};
use shared_store::{call_with_timeout, retry_transient, PersistentStore, StoreChanges};
use shared_types::{
    Entity, EntityRecord, ErrorKind, OwnerId, StoreError, SyncError, ValidationError,
};

use crate::config::SyncConfig;
use crate::domain::{decide, EntityView, MergeDecision, Settled, SyncPhase};
use crate::ports::{EntitySyncApi, SessionLink};

/// Result of a successful [`EntitySynchronizer::create`].
#[derive(Debug, Clone, PartialEq)]
pub struct CreateOutcome<E> {
    /// The row as persisted.
    pub entity: E,
    /// Whether the follow-up session refresh completed.
    pub session_refreshed: bool,
}

struct Inner {
    owner: Option<OwnerId>,
    generation: u64,
    mutating: bool,
    /// Remote events that arrived while a write was in flight.
    buffered: Vec<ChangeEvent>,
    echoes: EchoCache,
}

struct OwnedChannel {
    owner: OwnerId,
    _handle: ChannelHandle,
    health_task: JoinHandle<()>,
}

impl Drop for OwnedChannel {
    fn drop(&mut self) {
        self.health_task.abort();
    }
}

/// Synchronizer for one entity kind.
pub struct EntitySynchronizer<E: Entity> {
    me: Weak<Self>,
    config: SyncConfig,
    store: Arc<dyn PersistentStore>,
    session: Arc<dyn SessionLink>,
    state: watch::Sender<EntityView<E>>,
    inner: Mutex<Inner>,
    mutations: tokio::sync::Mutex<()>,
    channel: Mutex<Option<OwnedChannel>>,
}

impl<E: Entity> EntitySynchronizer<E> {
    pub fn new(
        config: SyncConfig,
        store: Arc<dyn PersistentStore>,
        session: Arc<dyn SessionLink>,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(EntityView::default());
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            config,
            store,
            session,
            state,
            inner: Mutex::new(Inner {
                owner: None,
                generation: 0,
                mutating: false,
                buffered: Vec::new(),
                echoes: EchoCache::new(),
            }),
            mutations: tokio::sync::Mutex::new(()),
            channel: Mutex::new(None),
        })
    }

    /// Whether a change channel is open.
    #[must_use]
    pub fn has_channel(&self) -> bool {
        self.channel.lock().is_some()
    }

    /// Health of the change channel (`Healthy` when none is open).
    #[must_use]
    pub fn sync_health(&self) -> SyncHealth {
        self.state.borrow().sync_health.clone()
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    /// Compute a patch from the latest value under the mutation lock, then
    /// apply it optimistically and persist it.
    ///
    /// `build` sees every earlier mutation's result, so read-modify-write
    /// updates (stat deltas, ledger appends) never lose an increment.
    pub async fn mutate_with<F>(&self, operation: &'static str, build: F) -> Result<E, SyncError>
    where
        F: FnOnce(&E) -> Result<E::Patch, SyncError> + Send,
    {
        let _serial = self.mutations.lock().await;

        let (generation, owner, snapshot, candidate, patch) = match self.prepare(build) {
            Ok(prepared) => prepared,
            Err(err) => {
                MUTATIONS.with_label_values(&[E::KIND.as_str(), "rejected"]).inc();
                debug!(kind = %E::KIND, operation, error = %err, "[cs-02] Mutation rejected locally");
                return Err(err);
            }
        };

        self.begin_write(generation, Some(candidate))?;
        let pending = PendingWrite::new(self, generation, owner, Some(snapshot));

        let result = call_with_timeout(
            self.config.store_call_timeout,
            operation,
            self.store.update(E::KIND, owner, E::wrap_patch(patch)),
        )
        .await
        .map_err(|e| SyncError::from_store(operation, e))
        .and_then(|row| decode::<E>(row));

        match result {
            Ok(row) => pending.commit(row),
            Err(err) => {
                pending.fail(operation, err.clone());
                if err.kind() == ErrorKind::Unauthorized {
                    self.session.signal_unauthorized(operation).await;
                }
                Err(err)
            }
        }
    }

    /// Insert the owner's row, then refresh the session.
    ///
    /// Not optimistic: the local value changes only once the store accepts
    /// the row. The caller should hold the session's transition guard until
    /// this returns so the refreshed flags cannot trigger a redirect first.
    pub async fn create(&self, values: E) -> Result<CreateOutcome<E>, SyncError> {
        let serial = self.mutations.lock().await;

        let (generation, owner, prior, values) = match self.prepare_create(values) {
            Ok(prepared) => prepared,
            Err(err) => {
                MUTATIONS.with_label_values(&[E::KIND.as_str(), "rejected"]).inc();
                debug!(kind = %E::KIND, error = %err, "[cs-02] Create rejected locally");
                return Err(err);
            }
        };

        self.begin_write(generation, None)?;
        let pending = PendingWrite::new(self, generation, owner, prior);

        let result = call_with_timeout(
            self.config.store_call_timeout,
            "create",
            self.store.insert(values.into_record()),
        )
        .await
        .map_err(|e| SyncError::from_store("create", e))
        .and_then(|row| decode::<E>(row));

        match result {
            Ok(row) => {
                let entity = pending.commit(row)?;
                drop(serial);
                info!(kind = %E::KIND, owner = %owner, "[cs-02] Created");
                let session_refreshed = self.session.refresh().await;
                if !session_refreshed {
                    warn!(kind = %E::KIND, owner = %owner, "[cs-02] Session refresh after create did not complete");
                }
                Ok(CreateOutcome {
                    entity,
                    session_refreshed,
                })
            }
            Err(err) => {
                pending.fail("create", err.clone());
                drop(serial);
                if err.kind() == ErrorKind::Unauthorized {
                    self.session.signal_unauthorized("create").await;
                }
                Err(err)
            }
        }
    }

    #[allow(clippy::type_complexity)]
    fn prepare<F>(&self, build: F) -> Result<(u64, OwnerId, E, E, E::Patch), SyncError>
    where
        F: FnOnce(&E) -> Result<E::Patch, SyncError>,
    {
        let (generation, owner, snapshot) = {
            let inner = self.inner.lock();
            let owner = inner.owner.ok_or(ValidationError::NothingLoaded(E::KIND))?;
            let view = self.state.borrow();
            let snapshot = match (&view.value, view.phase.settled()) {
                (Some(value), Some(_)) => value.clone(),
                _ => return Err(ValidationError::NothingLoaded(E::KIND).into()),
            };
            (inner.generation, owner, snapshot)
        };

        let patch = build(&snapshot)?;
        let mut candidate = snapshot.clone();
        candidate.apply_patch(&patch, snapshot.updated_at());
        candidate.normalize();
        candidate.validate()?;
        Ok((generation, owner, snapshot, candidate, patch))
    }

    fn prepare_create(&self, mut values: E) -> Result<(u64, OwnerId, Option<E>, E), SyncError> {
        let inner = self.inner.lock();
        let owner = inner.owner.ok_or(ValidationError::NothingLoaded(E::KIND))?;
        if values.owner_id() != owner {
            return Err(ValidationError::OwnerMismatch {
                record: values.owner_id(),
                session: owner,
            }
            .into());
        }
        let view = self.state.borrow();
        if view.phase.settled().is_none() {
            return Err(ValidationError::NothingLoaded(E::KIND).into());
        }
        values.normalize();
        values.validate()?;
        Ok((inner.generation, owner, view.value.clone(), values))
    }

    /// Enter `Mutating`, publishing `optimistic` when given.
    fn begin_write(&self, generation: u64, optimistic: Option<E>) -> Result<(), SyncError> {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            return Err(SyncError::cancelled("mutate"));
        }
        inner.mutating = true;
        self.state.send_modify(|view| {
            if let Some(next) = view.phase.begin_mutation() {
                view.phase = next;
            }
            if let Some(value) = optimistic {
                view.value = Some(value);
            }
            view.error = None;
        });
        Ok(())
    }

    fn finish_commit(&self, generation: u64, owner: OwnerId, row: E) -> Result<E, SyncError> {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            MUTATIONS.with_label_values(&[E::KIND.as_str(), "cancelled"]).inc();
            return Err(SyncError::cancelled("mutate"));
        }
        inner.echoes.record_own_write(E::KIND, owner, row.updated_at());
        inner.mutating = false;
        let buffered = std::mem::take(&mut inner.buffered);

        let committed = row.clone();
        self.state.send_modify(|view| {
            view.value = Some(row);
            view.phase = view.phase.commit();
            view.error = None;
        });
        self.drain(&mut inner, buffered);

        MUTATIONS.with_label_values(&[E::KIND.as_str(), "committed"]).inc();
        debug!(kind = %E::KIND, owner = %owner, at = committed.updated_at(), "[cs-02] Write committed");
        Ok(committed)
    }

    /// Restore the pre-write value. No-op if the generation moved on.
    fn finish_rollback(&self, generation: u64, prior: Option<E>, error: Option<SyncError>) {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            return;
        }
        inner.mutating = false;
        let buffered = std::mem::take(&mut inner.buffered);

        let label = error.as_ref().map_or("abandoned", |e| e.kind().as_str());
        self.state.send_modify(|view| {
            view.value = prior;
            view.phase = view.phase.rollback();
            view.error = error;
        });
        self.drain(&mut inner, buffered);

        ROLLBACKS.with_label_values(&[E::KIND.as_str(), label]).inc();
        MUTATIONS.with_label_values(&[E::KIND.as_str(), "rolled_back"]).inc();
    }

    // =========================================================================
    // READS
    // =========================================================================

    fn attach(&self, owner: OwnerId) -> u64 {
        let mut inner = self.inner.lock();
        if inner.owner == Some(owner) {
            self.state.send_if_modified(|view| {
                if view.value.is_none() && view.phase.settled().is_none() {
                    view.phase = SyncPhase::Loading;
                    return true;
                }
                false
            });
            return inner.generation;
        }

        inner.owner = Some(owner);
        inner.generation += 1;
        inner.mutating = false;
        inner.buffered.clear();
        inner.echoes.clear();
        self.state.send_replace(EntityView {
            phase: SyncPhase::Loading,
            ..EntityView::default()
        });
        self.channel.lock().take();
        inner.generation
    }

    async fn fetch(&self, owner: OwnerId) -> Result<Option<E>, SyncError> {
        let found = retry_transient(
            &self.config.load_retry,
            self.config.store_call_timeout,
            "load",
            || self.store.get(E::KIND, owner),
        )
        .await
        .map_err(|e| SyncError::from_store("load", e))?;

        match found {
            Some(row) => decode::<E>(row).map(Some),
            None => match E::default_for(owner) {
                Some(defaults) => self.insert_defaults(owner, defaults).await.map(Some),
                None => Ok(None),
            },
        }
    }

    /// First read found nothing for a kind with defaults: create the row.
    /// A duplicate means another instance won the race; read theirs.
    async fn insert_defaults(&self, owner: OwnerId, mut defaults: E) -> Result<E, SyncError> {
        defaults.normalize();
        let inserted = call_with_timeout(
            self.config.store_call_timeout,
            "load_defaults",
            self.store.insert(defaults.into_record()),
        )
        .await;

        match inserted {
            Ok(row) => {
                let row = decode::<E>(row)?;
                self.inner
                    .lock()
                    .echoes
                    .record_own_write(E::KIND, owner, row.updated_at());
                info!(kind = %E::KIND, owner = %owner, "[cs-02] Default row created");
                Ok(row)
            }
            Err(StoreError::Conflict(detail)) => {
                debug!(kind = %E::KIND, owner = %owner, detail = %detail, "[cs-02] Default row exists, re-reading");
                let found = retry_transient(
                    &self.config.load_retry,
                    self.config.store_call_timeout,
                    "load_defaults",
                    || self.store.get(E::KIND, owner),
                )
                .await
                .map_err(|e| SyncError::from_store("load_defaults", e))?;
                match found {
                    Some(row) => decode::<E>(row),
                    None => Err(SyncError::Conflict {
                        operation: "load_defaults".into(),
                        detail: format!("{} for {owner} reported as duplicate but not readable", E::KIND),
                    }),
                }
            }
            Err(e) => Err(SyncError::from_store("load_defaults", e)),
        }
    }

    fn settle_load(
        &self,
        generation: u64,
        owner: OwnerId,
        outcome: Result<Option<E>, SyncError>,
    ) -> Result<Option<E>, SyncError> {
        let mut inner = self.inner.lock();
        if inner.generation != generation || inner.owner != Some(owner) {
            LOADS.with_label_values(&[E::KIND.as_str(), "cancelled"]).inc();
            return Err(SyncError::cancelled("load"));
        }

        let loaded = match outcome {
            Ok(loaded) => loaded,
            Err(err) => {
                self.state.send_modify(|view| {
                    if view.phase.is_loading() {
                        view.phase = if view.value.is_some() {
                            Settled::Present.into()
                        } else {
                            Default::default()
                        };
                    }
                    view.error = Some(err.clone());
                });
                LOADS.with_label_values(&[E::KIND.as_str(), "failed"]).inc();
                warn!(operation = "load", kind = %E::KIND, owner = %owner, error = %err, "[cs-02] Load failed");
                return Err(err);
            }
        };

        if inner.mutating {
            // The in-flight write decides the value; merge afterwards
            if let Some(row) = loaded.clone() {
                let at = row.updated_at();
                inner
                    .buffered
                    .push(ChangeEvent::new(ChangeOp::Update, row.into_record(), at));
            }
            return Ok(loaded);
        }

        let mut current = None;
        self.state.send_modify(|view| {
            match loaded {
                Some(row) => {
                    let local = view.value.as_ref().map(Entity::updated_at);
                    if decide(local, ChangeOp::Update, row.updated_at()) == MergeDecision::Apply {
                        view.value = Some(row);
                    }
                }
                // An insert event may have landed while the read was lagging
                None if view.phase.is_loading() => {}
                None => view.value = None,
            }
            view.phase = Settled::from_found(view.value.is_some()).into();
            view.error = None;
            current = view.value.clone();
        });

        let outcome = if current.is_some() { "present" } else { "absent" };
        LOADS.with_label_values(&[E::KIND.as_str(), outcome]).inc();
        debug!(kind = %E::KIND, owner = %owner, outcome, "[cs-02] Loaded");
        Ok(current)
    }

    /// Re-read after missed events. Merged like a remote update.
    async fn resync(&self) {
        let Some(owner) = self.inner.lock().owner else {
            return;
        };
        match retry_transient(
            &self.config.load_retry,
            self.config.store_call_timeout,
            "resync",
            || self.store.get(E::KIND, owner),
        )
        .await
        {
            Ok(Some(row)) => {
                let at = row.updated_at();
                if let Err(e) = self.apply_change(ChangeEvent::new(ChangeOp::Update, row, at)) {
                    debug!(kind = %E::KIND, error = %e, "[cs-02] Resync row not applied");
                }
            }
            Ok(None) => debug!(kind = %E::KIND, owner = %owner, "[cs-02] Resync found no row"),
            Err(e) => {
                warn!(operation = "resync", kind = %E::KIND, owner = %owner, error = %e, "[cs-02] Resync failed");
            }
        }
    }

    // =========================================================================
    // CHANGE EVENTS
    // =========================================================================

    /// Merge one remote change. Idempotent: a replayed event is stale.
    pub fn apply_change(&self, event: ChangeEvent) -> Result<MergeDecision, HandlerError> {
        if event.kind() != E::KIND {
            return Err(HandlerError::Rejected(format!(
                "{} event on {} channel",
                event.kind(),
                E::KIND
            )));
        }
        let mut inner = self.inner.lock();
        if inner.owner != Some(event.owner_id()) {
            return Err(HandlerError::Rejected(format!(
                "event for {} while attached to {:?}",
                event.owner_id(),
                inner.owner
            )));
        }
        if inner.echoes.is_echo(&event) {
            CHANGE_EVENTS.with_label_values(&[E::KIND.as_str(), "echo"]).inc();
            debug!(kind = %E::KIND, at = event.server_ts, "[cs-02] Echo of own write ignored");
            return Ok(MergeDecision::Stale);
        }
        if inner.mutating {
            CHANGE_EVENTS.with_label_values(&[E::KIND.as_str(), "buffered"]).inc();
            inner.buffered.push(event);
            return Ok(MergeDecision::Stale);
        }

        let decision = self.merge(event)?;
        CHANGE_EVENTS
            .with_label_values(&[E::KIND.as_str(), decision.as_str()])
            .inc();
        Ok(decision)
    }

    /// Caller holds `inner`.
    fn merge(&self, event: ChangeEvent) -> Result<MergeDecision, HandlerError> {
        let op = event.op;
        let at = event.server_ts;
        let incoming = match op {
            ChangeOp::Delete => None,
            ChangeOp::Insert | ChangeOp::Update => Some(
                E::from_record(event.row)
                    .ok_or_else(|| HandlerError::Malformed(format!("row is not a {}", E::KIND)))?,
            ),
        };

        let mut decision = MergeDecision::Stale;
        self.state.send_if_modified(|view| {
            decision = decide(view.value.as_ref().map(Entity::updated_at), op, at);
            match decision {
                MergeDecision::Apply => view.value = incoming,
                MergeDecision::Remove => view.value = None,
                MergeDecision::Stale => return false,
            }
            if view.phase.settled().is_some() {
                view.phase = Settled::from_found(view.value.is_some()).into();
            }
            true
        });
        if decision != MergeDecision::Stale {
            debug!(kind = %E::KIND, op = ?op, at, "[cs-02] Remote change merged");
        }
        Ok(decision)
    }

    fn drain(&self, inner: &mut Inner, events: Vec<ChangeEvent>) {
        for event in events {
            if inner.echoes.is_echo(&event) {
                CHANGE_EVENTS.with_label_values(&[E::KIND.as_str(), "echo"]).inc();
                continue;
            }
            match self.merge(event) {
                Ok(decision) => CHANGE_EVENTS
                    .with_label_values(&[E::KIND.as_str(), decision.as_str()])
                    .inc(),
                Err(e) => warn!(kind = %E::KIND, error = %e, "[cs-02] Buffered event dropped"),
            }
        }
    }

    async fn ensure_channel(&self, owner: OwnerId) {
        if self.channel.lock().as_ref().is_some_and(|c| c.owner == owner) {
            return;
        }

        let handler = Arc::new(EntityChangeHandler {
            sync: self.me.clone(),
        });
        let handle = open_channel(
            StoreChanges::source(Arc::clone(&self.store)),
            ChangeFilter::single(E::KIND, owner),
            handler,
            self.config.resubscribe.clone(),
            E::KIND.as_str(),
        )
        .await;

        if self.inner.lock().owner != Some(owner) {
            return;
        }
        let mut slot = self.channel.lock();
        if slot.as_ref().is_some_and(|c| c.owner == owner) {
            return;
        }
        let health_task = tokio::spawn(forward_health(self.me.clone(), handle.health_watch()));
        *slot = Some(OwnedChannel {
            owner,
            _handle: handle,
            health_task,
        });
    }
}

fn decode<E: Entity>(record: EntityRecord) -> Result<E, SyncError> {
    let actual = record.kind();
    E::from_record(record).ok_or_else(|| {
        ValidationError::KindMismatch {
            expected: E::KIND,
            actual,
        }
        .into()
    })
}

/// In-flight write. Dropping it unresolved (the caller's future was
/// cancelled) restores the pre-write value.
struct PendingWrite<'a, E: Entity> {
    sync: &'a EntitySynchronizer<E>,
    generation: u64,
    owner: OwnerId,
    prior: Option<E>,
    resolved: bool,
}

impl<'a, E: Entity> PendingWrite<'a, E> {
    fn new(sync: &'a EntitySynchronizer<E>, generation: u64, owner: OwnerId, prior: Option<E>) -> Self {
        Self {
            sync,
            generation,
            owner,
            prior,
            resolved: false,
        }
    }

    fn commit(mut self, row: E) -> Result<E, SyncError> {
        self.resolved = true;
        self.sync.finish_commit(self.generation, self.owner, row)
    }

    fn fail(mut self, operation: &str, error: SyncError) {
        self.resolved = true;
        warn!(
            operation,
            kind = %E::KIND,
            owner = %self.owner,
            error = %error,
            "[cs-02] Write failed, local copy restored"
        );
        self.sync
            .finish_rollback(self.generation, self.prior.take(), Some(error));
    }
}

impl<E: Entity> Drop for PendingWrite<'_, E> {
    fn drop(&mut self) {
        if !self.resolved {
            warn!(kind = %E::KIND, owner = %self.owner, "[cs-02] Write abandoned, local copy restored");
            self.sync
                .finish_rollback(self.generation, self.prior.take(), None);
        }
    }
}

async fn forward_health<E: Entity>(
    sync: Weak<EntitySynchronizer<E>>,
    mut health: watch::Receiver<SyncHealth>,
) {
    loop {
        let current = health.borrow_and_update().clone();
        let Some(sync) = sync.upgrade() else {
            return;
        };
        CHANNEL_DEGRADED
            .with_label_values(&[E::KIND.as_str()])
            .set(if current.is_degraded() { 1.0 } else { 0.0 });
        sync.state.send_if_modified(|view| {
            if view.sync_health == current {
                return false;
            }
            view.sync_health = current;
            true
        });
        drop(sync);

        if health.changed().await.is_err() {
            return;
        }
    }
}

struct EntityChangeHandler<E: Entity> {
    sync: Weak<EntitySynchronizer<E>>,
}

#[async_trait]
impl<E: Entity> ChangeHandler for EntityChangeHandler<E> {
    async fn on_change(&self, event: ChangeEvent) -> Result<(), HandlerError> {
        match self.sync.upgrade() {
            Some(sync) => sync.apply_change(event).map(|_| ()),
            None => Ok(()),
        }
    }

    async fn on_resync(&self) {
        if let Some(sync) = self.sync.upgrade() {
            sync.resync().await;
        }
    }
}

#[async_trait]
impl<E: Entity> EntitySyncApi<E> for EntitySynchronizer<E> {
    fn view(&self) -> EntityView<E> {
        self.state.borrow().clone()
    }

    fn watch(&self) -> watch::Receiver<EntityView<E>> {
        self.state.subscribe()
    }

    fn owner(&self) -> Option<OwnerId> {
        self.inner.lock().owner
    }

    async fn load(&self, owner: OwnerId) -> Result<Option<E>, SyncError> {
        let generation = self.attach(owner);
        // Subscribe before reading so no write between the two is missed
        self.ensure_channel(owner).await;
        let outcome = self.fetch(owner).await;
        let unauthorized = matches!(&outcome, Err(e) if e.kind() == ErrorKind::Unauthorized);
        let settled = self.settle_load(generation, owner, outcome);
        if unauthorized {
            self.session.signal_unauthorized("load").await;
        }
        settled
    }

    async fn refresh(&self) -> Result<Option<E>, SyncError> {
        let owner = self
            .inner
            .lock()
            .owner
            .ok_or(ValidationError::NothingLoaded(E::KIND))?;
        self.load(owner).await
    }

    async fn mutate(&self, patch: E::Patch) -> Result<E, SyncError> {
        self.mutate_with("mutate", move |_| Ok(patch)).await
    }

    fn detach(&self) {
        {
            let mut inner = self.inner.lock();
            inner.owner = None;
            inner.generation += 1;
            inner.mutating = false;
            inner.buffered.clear();
            inner.echoes.clear();
            self.state.send_replace(EntityView::default());
        }
        self.channel.lock().take();
        CHANNEL_DEGRADED.with_label_values(&[E::KIND.as_str()]).set(0.0);
        debug!(kind = %E::KIND, "[cs-02] Detached");
    }
}
