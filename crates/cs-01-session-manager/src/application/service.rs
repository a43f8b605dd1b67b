//! # Session Manager Service
//!
//! Resolves the identity once at cold start, follows the auth provider's
//! session events afterwards, and keeps the onboarding flags current.
//!
//! ## Ordering
//!
//! Every identity change takes a new generation number before any await.
//! Results computed for an older generation are discarded, so a slow
//! existence check for a signed-out user never overwrites the newer state.
//! Existence results are additionally sequenced, so overlapping refreshes
//! apply in issue order.

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use companion_telemetry::{
    HistogramTimer, CHANNEL_DEGRADED, EXISTENCE_ATTEMPTS, SESSION_INIT, SESSION_INIT_DURATION,
};
use shared_bus::{
    open_channel, ChangeEvent, ChangeFilter, ChangeHandler, ChannelHandle, HandlerError, SyncHealth,
};
use shared_store::{call_with_timeout, PersistentStore, StoreChanges};
use shared_types::{EntityKind, OwnerId, StoreError};

use crate::application::TransitionGuard;
use crate::config::SessionConfig;
use crate::domain::{
    Existence, ExistenceReport, GateVerdict, InitGate, InitSource, SessionSnapshot,
};
use crate::ports::{AuthError, AuthProvider, AuthSession, SessionApi, SessionEvent, SessionStream};

const CONSUMER: &str = "session-manager";

/// Live subscription to the identity's Profile and Pet rows.
struct OwnedChannel {
    owner: OwnerId,
    _handle: ChannelHandle,
    health_task: JoinHandle<()>,
}

impl Drop for OwnedChannel {
    fn drop(&mut self) {
        self.health_task.abort();
        CHANNEL_DEGRADED.with_label_values(&[CONSUMER]).set(0.0);
    }
}

/// The session manager.
///
/// Create with [`SessionManager::new`], then call
/// [`initialize`](SessionManager::initialize) once.
pub struct SessionManager {
    config: SessionConfig,
    store: Arc<dyn PersistentStore>,
    auth: Arc<dyn AuthProvider>,
    state: watch::Sender<SessionSnapshot>,
    gate: Mutex<InitGate>,
    started: AtomicBool,
    /// Owner targeted by the latest generation.
    target: Mutex<Option<OwnerId>>,
    generation: AtomicU64,
    transitions: AtomicUsize,
    check_seq: AtomicU64,
    applied_check: AtomicU64,
    channel: Mutex<Option<OwnedChannel>>,
    event_loop: Mutex<Option<JoinHandle<()>>>,
}

impl SessionManager {
    pub fn new(
        config: SessionConfig,
        store: Arc<dyn PersistentStore>,
        auth: Arc<dyn AuthProvider>,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(SessionSnapshot::default());
        Arc::new(Self {
            config,
            store,
            auth,
            state,
            gate: Mutex::new(InitGate::new()),
            started: AtomicBool::new(false),
            target: Mutex::new(None),
            generation: AtomicU64::new(0),
            transitions: AtomicUsize::new(0),
            check_seq: AtomicU64::new(0),
            applied_check: AtomicU64::new(0),
            channel: Mutex::new(None),
            event_loop: Mutex::new(None),
        })
    }

    // =========================================================================
    // COLD START
    // =========================================================================

    /// Resolve the initial identity.
    ///
    /// Subscribes to session events first, then races the current-session
    /// fetch, live events and the init timeout. The replay event is never
    /// committed. The same deadline bounds the first existence check; on
    /// expiry the manager continues signed out. Returns once `loading` is
    /// false. Later calls are no-ops.
    pub async fn initialize(self: &Arc<Self>) {
        if self.started.swap(true, Ordering::SeqCst) {
            debug!("[cs-01] initialize() already called");
            return;
        }
        let _timer = HistogramTimer::new(&SESSION_INIT_DURATION);

        let mut events = self.auth.on_session_change().await;
        let fetch = self.auth.get_current_session();
        tokio::pin!(fetch);
        let deadline = tokio::time::sleep(self.config.init_timeout);
        tokio::pin!(deadline);
        let mut fetch_pending = true;
        let mut stream_open = true;

        let (source, session) = loop {
            tokio::select! {
                result = &mut fetch, if fetch_pending => {
                    fetch_pending = false;
                    match result {
                        Ok(session) => {
                            if self.gate.lock().offer_fetch() == GateVerdict::Commit {
                                break (InitSource::Fetch, session);
                            }
                        }
                        Err(e) => {
                            warn!(operation = "get_current_session", error = %e, "[cs-01] Session fetch failed, waiting for session events");
                            SESSION_INIT.with_label_values(&["error"]).inc();
                        }
                    }
                }
                event = events.next(), if stream_open => match event {
                    Some(event) if event.is_replay() => {
                        self.gate.lock().offer_replay();
                        debug!(signed_in = event.session.is_some(), "[cs-01] Replay event discarded");
                    }
                    Some(event) => {
                        self.gate.lock().offer_live_event();
                        break (InitSource::LiveEvent, event.session);
                    }
                    None => stream_open = false,
                },
                () = &mut deadline => {
                    if self.gate.lock().offer_timeout() == GateVerdict::Commit {
                        warn!(
                            timeout_ms = self.config.init_timeout.as_millis() as u64,
                            "[cs-01] Session initialization timed out, continuing without identity"
                        );
                        break (InitSource::TimedOut, None);
                    }
                }
            }
        };

        let outcome = match (source, session.is_some()) {
            (InitSource::TimedOut, _) => "timeout",
            (_, false) => "no_session",
            (InitSource::Fetch, true) => "fetched",
            (InitSource::LiveEvent, true) => "live_event",
        };
        SESSION_INIT.with_label_values(&[outcome]).inc();
        info!(source = ?source, signed_in = session.is_some(), "[cs-01] Initial identity resolved");

        // Generation is taken before the event loop starts so a later event
        // always supersedes the initial commit.
        let generation = self.begin_commit(session.as_ref().map(|s| s.user_id));
        let handle = tokio::spawn(Self::run_event_loop(Arc::downgrade(self), events));
        *self.event_loop.lock() = Some(handle);

        let committed = tokio::select! {
            biased;
            owner = self.commit_identity(generation, session) => owner,
            () = &mut deadline => {
                if self.is_current(generation) {
                    warn!(
                        timeout_ms = self.config.init_timeout.as_millis() as u64,
                        "[cs-01] Existence check outlived initialization, continuing without identity"
                    );
                    SESSION_INIT.with_label_values(&["timeout"]).inc();
                    let fallback = self.begin_commit(None);
                    self.commit_signed_out(fallback);
                }
                None
            }
        };
        if let Some(owner) = committed {
            self.subscribe_to_owned_entity_changes(owner).await;
        }
    }

    async fn run_event_loop(manager: Weak<Self>, mut events: SessionStream) {
        while let Some(event) = events.next().await {
            let Some(manager) = manager.upgrade() else {
                return;
            };
            manager.handle_session_event(event);
        }
        debug!("[cs-01] Session event stream ended");
    }

    fn handle_session_event(self: &Arc<Self>, event: SessionEvent) {
        if event.is_replay() {
            self.gate.lock().offer_replay();
            return;
        }
        self.gate.lock().offer_live_event();

        let incoming = event.session.as_ref().map(|s| s.user_id);
        let target = *self.target.lock();
        match (event.session, target) {
            (Some(session), Some(owner)) if session.user_id == owner => {
                debug!(kind = ?event.kind, "[cs-01] Session metadata updated");
                self.state.send_if_modified(|s| match s.identity.as_mut() {
                    Some(identity) if identity.id == owner => {
                        let changed = identity.email != session.email
                            || identity.display_name != session.display_name;
                        identity.email = session.email;
                        identity.display_name = session.display_name;
                        changed
                    }
                    _ => false,
                });
            }
            (None, None) => {}
            (session, _) => {
                info!(kind = ?event.kind, signed_in = incoming.is_some(), "[cs-01] Identity changed");
                let generation = self.begin_commit(incoming);
                let manager = Arc::clone(self);
                tokio::spawn(async move {
                    if let Some(owner) = manager.commit_identity(generation, session).await {
                        manager.subscribe_to_owned_entity_changes(owner).await;
                    }
                });
            }
        }
    }

    // =========================================================================
    // IDENTITY COMMITS
    // =========================================================================

    fn begin_commit(&self, target: Option<OwnerId>) -> u64 {
        let mut current = self.target.lock();
        *current = target;
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Commit `session` for `generation`. Returns the owner whose entity
    /// channel should be opened.
    async fn commit_identity(
        self: &Arc<Self>,
        generation: u64,
        session: Option<AuthSession>,
    ) -> Option<OwnerId> {
        match session {
            None => {
                self.commit_signed_out(generation);
                None
            }
            Some(session) => self.commit_signed_in(generation, session).await,
        }
    }

    fn commit_signed_out(&self, generation: u64) {
        let committed = self.state.send_if_modified(|s| {
            if !self.is_current(generation) {
                return false;
            }
            s.identity = None;
            s.loading = false;
            s.existence = ExistenceReport::unknown();
            s.sync_health = SyncHealth::Healthy;
            true
        });
        if committed {
            self.channel.lock().take();
            info!("[cs-01] No identity");
        }
    }

    async fn commit_signed_in(self: &Arc<Self>, generation: u64, session: AuthSession) -> Option<OwnerId> {
        let owner = session.user_id;
        let mut identity = session.to_identity();
        let switched = self.state.send_if_modified(|s| {
            if !self.is_current(generation) {
                return false;
            }
            s.identity = Some(identity.clone());
            s.loading = true;
            s.existence = ExistenceReport::unknown();
            true
        });
        if !switched {
            return None;
        }
        if self.channel.lock().as_ref().is_some_and(|c| c.owner != owner) {
            self.channel.lock().take();
        }

        let seq = self.next_check_seq();
        let report = self.check_entity_existence(owner).await;
        identity.apply_report(&report);
        let applied = self.state.send_if_modified(|s| {
            if !self.is_current(generation) || !self.claim_check(seq) {
                return false;
            }
            s.identity = Some(identity);
            s.existence = report;
            s.loading = false;
            true
        });
        if !applied {
            debug!(owner = %owner, "[cs-01] Existence result superseded, discarded");
            // A newer check for the same generation may already have applied
            self.state.send_if_modified(|s| {
                if self.is_current(generation) && s.loading {
                    s.loading = false;
                    return true;
                }
                false
            });
            if !self.is_current(generation) {
                return None;
            }
        }

        info!(
            owner = %owner,
            has_profile = ?report.has_profile,
            has_pet = ?report.has_pet,
            "[cs-01] Identity committed"
        );
        Some(owner)
    }

    fn next_check_seq(&self) -> u64 {
        self.check_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Must run inside a `send_if_modified` closure so claims are serialized.
    fn claim_check(&self, seq: u64) -> bool {
        if seq < self.applied_check.load(Ordering::SeqCst) {
            return false;
        }
        self.applied_check.store(seq, Ordering::SeqCst);
        true
    }

    // =========================================================================
    // EXISTENCE CHECKS
    // =========================================================================

    /// Point lookup with retries. `Err` only for `Unauthorized`, which is
    /// never retried.
    async fn lookup(&self, kind: EntityKind, owner: OwnerId) -> Result<Existence, StoreError> {
        let policy = &self.config.existence_retry;
        let attempts = policy.max_attempts.max(1);
        let mut outcome = Existence::Unknown;

        for attempt in 1..=attempts {
            let result = call_with_timeout(
                self.config.store_call_timeout,
                "check_entity_existence",
                self.store.get(kind, owner),
            )
            .await;

            match result {
                Ok(Some(_)) => {
                    EXISTENCE_ATTEMPTS.with_label_values(&[kind.as_str(), "present"]).inc();
                    return Ok(Existence::Present);
                }
                Ok(None) => {
                    EXISTENCE_ATTEMPTS.with_label_values(&[kind.as_str(), "absent"]).inc();
                    debug!(kind = %kind, owner = %owner, attempt, "[cs-01] Row not found");
                    outcome = Existence::Absent;
                }
                Err(e @ StoreError::Unauthorized(_)) => {
                    EXISTENCE_ATTEMPTS.with_label_values(&[kind.as_str(), "error"]).inc();
                    warn!(
                        operation = "check_entity_existence",
                        kind = %kind,
                        owner = %owner,
                        error = %e,
                        "[cs-01] Store rejected session"
                    );
                    return Err(e);
                }
                Err(e) => {
                    EXISTENCE_ATTEMPTS.with_label_values(&[kind.as_str(), "error"]).inc();
                    warn!(
                        operation = "check_entity_existence",
                        kind = %kind,
                        owner = %owner,
                        attempt,
                        error = %e,
                        "[cs-01] Existence lookup failed"
                    );
                    outcome = Existence::Unknown;
                }
            }

            if attempt < attempts {
                tokio::time::sleep(policy.backoff(attempt)).await;
            }
        }
        Ok(outcome)
    }

    // =========================================================================
    // OWNED-ENTITY CHANNEL
    // =========================================================================

    /// Open the Profile+Pet channel for `owner`; any event re-runs the
    /// existence check. Idempotent for the same owner.
    pub async fn subscribe_to_owned_entity_changes(self: &Arc<Self>, owner: OwnerId) {
        if self.channel.lock().as_ref().is_some_and(|c| c.owner == owner) {
            return;
        }

        let handler = Arc::new(OwnedEntityHandler {
            manager: Arc::downgrade(self),
            owner,
        });
        let handle = open_channel(
            StoreChanges::source(Arc::clone(&self.store)),
            ChangeFilter::kinds(vec![EntityKind::Profile, EntityKind::Pet], owner),
            handler,
            self.config.resubscribe.clone(),
            CONSUMER,
        )
        .await;

        if self.state.borrow().owner_id() != Some(owner) {
            debug!(owner = %owner, "[cs-01] Identity changed while subscribing, channel dropped");
            return;
        }

        let health_task = tokio::spawn(forward_health(Arc::downgrade(self), handle.health_watch()));
        *self.channel.lock() = Some(OwnedChannel {
            owner,
            _handle: handle,
            health_task,
        });
    }

    /// Whether an owned-entity channel is open.
    #[must_use]
    pub fn has_owned_channel(&self) -> bool {
        self.channel.lock().is_some()
    }

    // =========================================================================
    // TRANSITIONS / TEARDOWN
    // =========================================================================

    /// Set the transition lock until the returned guard drops.
    pub fn begin_transition(self: &Arc<Self>) -> TransitionGuard {
        TransitionGuard::acquire(Arc::clone(self) as Arc<dyn SessionApi>)
    }

    /// Stop following session events and drop the owned channel.
    pub fn shutdown(&self) {
        if let Some(handle) = self.event_loop.lock().take() {
            handle.abort();
        }
        self.channel.lock().take();
        // Cancels in-flight commits
        self.generation.fetch_add(1, Ordering::SeqCst);
        info!("[cs-01] Session manager stopped");
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if let Some(handle) = self.event_loop.get_mut().take() {
            handle.abort();
        }
    }
}

async fn forward_health(manager: Weak<SessionManager>, mut health: watch::Receiver<SyncHealth>) {
    loop {
        let current = health.borrow_and_update().clone();
        let Some(manager) = manager.upgrade() else {
            return;
        };
        CHANNEL_DEGRADED
            .with_label_values(&[CONSUMER])
            .set(if current.is_degraded() { 1.0 } else { 0.0 });
        manager.state.send_if_modified(|s| {
            if s.sync_health == current {
                return false;
            }
            s.sync_health = current;
            true
        });
        drop(manager);

        if health.changed().await.is_err() {
            return;
        }
    }
}

struct OwnedEntityHandler {
    manager: Weak<SessionManager>,
    owner: OwnerId,
}

#[async_trait]
impl ChangeHandler for OwnedEntityHandler {
    async fn on_change(&self, event: ChangeEvent) -> Result<(), HandlerError> {
        if event.owner_id() != self.owner {
            return Err(HandlerError::Rejected(format!(
                "event for {} on channel of {}",
                event.owner_id(),
                self.owner
            )));
        }
        let Some(manager) = self.manager.upgrade() else {
            return Ok(());
        };
        debug!(kind = %event.kind(), op = ?event.op, "[cs-01] Owned entity changed");
        manager.refresh().await;
        Ok(())
    }

    async fn on_resync(&self) {
        if let Some(manager) = self.manager.upgrade() {
            manager.refresh().await;
        }
    }
}

#[async_trait]
impl SessionApi for SessionManager {
    fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    async fn check_entity_existence(&self, owner: OwnerId) -> ExistenceReport {
        let (has_profile, has_pet) = tokio::join!(
            self.lookup(EntityKind::Profile, owner),
            self.lookup(EntityKind::Pet, owner)
        );
        if has_profile.is_err() || has_pet.is_err() {
            self.handle_unauthorized("check_entity_existence").await;
        }
        ExistenceReport::new(
            has_profile.unwrap_or(Existence::Unknown),
            has_pet.unwrap_or(Existence::Unknown),
        )
    }

    async fn refresh(&self) -> bool {
        let (generation, owner) = {
            let target = self.target.lock();
            (self.generation.load(Ordering::SeqCst), *target)
        };
        let Some(owner) = owner else {
            return false;
        };

        let seq = self.next_check_seq();
        let report = self.check_entity_existence(owner).await;

        let mut applied = false;
        self.state.send_if_modified(|s| {
            if !self.is_current(generation) || s.owner_id() != Some(owner) || !self.claim_check(seq) {
                return false;
            }
            applied = true;
            let before = s.clone();
            if let Some(identity) = s.identity.as_mut() {
                identity.apply_report(&report);
            }
            s.existence = report;
            *s != before
        });

        if !applied {
            debug!(owner = %owner, "[cs-01] Refresh superseded");
            return false;
        }
        debug!(owner = %owner, has_profile = ?report.has_profile, has_pet = ?report.has_pet, "[cs-01] Existence refreshed");
        report.is_complete()
    }

    fn mark_transition_start(&self) {
        self.state.send_if_modified(|s| {
            self.transitions.fetch_add(1, Ordering::SeqCst);
            let changed = !s.transitioning;
            s.transitioning = true;
            changed
        });
    }

    fn mark_transition_end(&self) {
        self.state.send_if_modified(|s| {
            let remaining = match self
                .transitions
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            {
                Ok(previous) => previous - 1,
                Err(_) => 0,
            };
            let transitioning = remaining > 0;
            let changed = s.transitioning != transitioning;
            s.transitioning = transitioning;
            changed
        });
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let generation = self.begin_commit(None);
        self.commit_signed_out(generation);
        self.auth.sign_out().await
    }

    async fn handle_unauthorized(&self, operation: &str) {
        warn!(operation, "[cs-01] Unauthorized store response, signing out");
        if let Err(e) = self.sign_out().await {
            warn!(operation, error = %e, "[cs-01] Upstream sign-out failed");
        }
    }
}
