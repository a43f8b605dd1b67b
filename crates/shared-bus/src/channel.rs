//! # Channel Supervisor
//!
//! Owns one live subscription on behalf of a consumer and keeps it alive.
//!
//! ## Behaviour
//!
//! - Each event is handed to the [`ChangeHandler`]; a handler error or panic
//!   is logged and the next event is processed.
//! - A lag means events were missed: the handler is asked to re-read
//!   authoritative state via [`ChangeHandler::on_resync`].
//! - A closed or rejected channel flips health to `Degraded` and the
//!   supervisor re-subscribes with exponential backoff. After recovery the
//!   handler resyncs and health returns to `Healthy`.
//!
//! Dropping the [`ChannelHandle`] aborts the supervisor and releases the
//! subscription.

use crate::events::{ChangeEvent, ChangeFilter};
use crate::health::SyncHealth;
use crate::subscriber::{ChangeSource, Subscription, SubscriptionError};
use async_trait::async_trait;
use futures::FutureExt;
use rand::Rng;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Reasons a handler may refuse an event.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// The payload could not be interpreted.
    #[error("Malformed change event: {0}")]
    Malformed(String),

    /// The event was understood but not applicable.
    #[error("Change event rejected: {0}")]
    Rejected(String),
}

/// Consumer side of a supervised channel.
#[async_trait]
pub trait ChangeHandler: Send + Sync + 'static {
    /// Handle one event that matched the channel filter.
    async fn on_change(&self, event: ChangeEvent) -> Result<(), HandlerError>;

    /// Events may have been missed; re-read authoritative state.
    async fn on_resync(&self) {}
}

/// Backoff schedule for re-subscribing after a channel failure.
#[derive(Debug, Clone)]
pub struct ResubscribePolicy {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Give up after this many consecutive failures (`None` = never).
    pub max_attempts: Option<u32>,
    /// Add up to 25% random jitter to each delay.
    pub jitter: bool,
}

impl Default for ResubscribePolicy {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            max_attempts: None,
            jitter: true,
        }
    }
}

impl ResubscribePolicy {
    /// Short, deterministic delays for tests.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            initial_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_millis(40),
            max_attempts: Some(20),
            jitter: false,
        }
    }

    /// Delay before re-subscribe attempt `attempt` (0-based).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16));
        let base = self.initial_backoff.saturating_mul(factor).min(self.max_backoff);
        if !self.jitter {
            return base;
        }
        let spread = u64::try_from(base.as_millis() / 4).unwrap_or(u64::MAX);
        let extra = rand::thread_rng().gen_range(0..=spread);
        base + Duration::from_millis(extra)
    }

    fn exhausted(&self, failures: u32) -> bool {
        self.max_attempts.is_some_and(|max| failures >= max)
    }
}

/// Handle to a supervised channel. Dropping it unsubscribes.
pub struct ChannelHandle {
    key: String,
    health: watch::Receiver<SyncHealth>,
    task: JoinHandle<()>,
}

impl ChannelHandle {
    /// Channel key (`kinds:owner`).
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current health of the channel.
    #[must_use]
    pub fn health(&self) -> SyncHealth {
        self.health.borrow().clone()
    }

    /// Watch health transitions.
    #[must_use]
    pub fn health_watch(&self) -> watch::Receiver<SyncHealth> {
        self.health.clone()
    }

    /// Whether the supervisor has stopped (gave up re-subscribing).
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        self.task.abort();
        debug!(channel = %self.key, "[bus] Channel handle released");
    }
}

/// Open a supervised channel for `filter`.
///
/// The first subscribe happens before this returns, so events published
/// after `open_channel` completes are delivered. If it fails the channel
/// starts `Degraded` and the supervisor keeps retrying in the background.
pub async fn open_channel(
    source: Arc<dyn ChangeSource>,
    filter: ChangeFilter,
    handler: Arc<dyn ChangeHandler>,
    policy: ResubscribePolicy,
    label: &'static str,
) -> ChannelHandle {
    let key = filter.channel_key();

    let (initial, health) = match source.subscribe(filter.clone()).await {
        Ok(subscription) => {
            info!(channel = %key, consumer = label, "[bus] Channel open");
            (Some(subscription), SyncHealth::Healthy)
        }
        Err(e) => {
            warn!(channel = %key, consumer = label, error = %e, "[bus] Initial subscribe failed");
            (None, SyncHealth::degraded(e.to_string()))
        }
    };

    let (health_tx, health_rx) = watch::channel(health);
    let supervisor = Supervisor {
        source,
        filter,
        handler,
        policy,
        label,
        health: health_tx,
    };
    let task = tokio::spawn(supervisor.run(initial));

    ChannelHandle {
        key,
        health: health_rx,
        task,
    }
}

struct Supervisor {
    source: Arc<dyn ChangeSource>,
    filter: ChangeFilter,
    handler: Arc<dyn ChangeHandler>,
    policy: ResubscribePolicy,
    label: &'static str,
    health: watch::Sender<SyncHealth>,
}

impl Supervisor {
    async fn run(self, initial: Option<Subscription>) {
        let mut pending = initial;
        loop {
            let mut subscription = match pending.take() {
                Some(subscription) => subscription,
                None => match self.resubscribe().await {
                    Some(subscription) => {
                        self.handler.on_resync().await;
                        self.health.send_replace(SyncHealth::Healthy);
                        info!(channel = %self.filter.channel_key(), consumer = self.label, "[bus] Channel recovered");
                        subscription
                    }
                    None => return,
                },
            };

            loop {
                match subscription.recv().await {
                    Ok(event) => self.dispatch(event).await,
                    Err(SubscriptionError::Lagged(missed)) => {
                        warn!(consumer = self.label, missed, "[bus] Missed events, resyncing");
                        self.handler.on_resync().await;
                    }
                    Err(e) => {
                        warn!(consumer = self.label, error = %e, "[bus] Channel lost");
                        self.health.send_replace(SyncHealth::degraded(e.to_string()));
                        break;
                    }
                }
            }
        }
    }

    async fn dispatch(&self, event: ChangeEvent) {
        let kind = event.kind();
        let ts = event.server_ts;
        match AssertUnwindSafe(self.handler.on_change(event)).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(consumer = self.label, kind = %kind, server_ts = ts, error = %e, "[bus] Handler rejected event");
            }
            Err(_) => {
                error!(consumer = self.label, kind = %kind, server_ts = ts, "[bus] Handler panicked, event skipped");
            }
        }
    }

    async fn resubscribe(&self) -> Option<Subscription> {
        let mut failures = 0u32;
        loop {
            tokio::time::sleep(self.policy.delay(failures)).await;
            match self.source.subscribe(self.filter.clone()).await {
                Ok(subscription) => return Some(subscription),
                Err(e) => {
                    failures += 1;
                    self.health.send_replace(SyncHealth::degraded(e.to_string()));
                    if self.policy.exhausted(failures) {
                        error!(
                            consumer = self.label,
                            failures,
                            "[bus] Giving up on channel; live updates stay disabled"
                        );
                        return None;
                    }
                    debug!(consumer = self.label, failures, "[bus] Re-subscribe failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ChangeOp;
    use crate::publisher::{ChangePublisher, InMemoryChangeBus};
    use parking_lot::Mutex;
    use shared_types::{Entity, EntityKind, OwnerId, Pet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::timeout;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<u64>>,
        resyncs: AtomicUsize,
    }

    #[async_trait]
    impl ChangeHandler for Recorder {
        async fn on_change(&self, event: ChangeEvent) -> Result<(), HandlerError> {
            if event.server_ts == 13 {
                panic!("unlucky event");
            }
            if event.server_ts == 7 {
                return Err(HandlerError::Malformed("bad row".into()));
            }
            self.seen.lock().push(event.server_ts);
            Ok(())
        }

        async fn on_resync(&self) {
            self.resyncs.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn pet_event(owner: OwnerId, ts: u64) -> ChangeEvent {
        ChangeEvent::new(
            ChangeOp::Update,
            Pet::hatch(owner, "cat", "tabby", "Miso").into_record(),
            ts,
        )
    }

    async fn wait_until(mut check: impl FnMut() -> bool) {
        timeout(Duration::from_secs(2), async {
            while !check() {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("condition not reached");
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = ResubscribePolicy::for_testing();
        assert_eq!(policy.delay(0), Duration::from_millis(5));
        assert_eq!(policy.delay(1), Duration::from_millis(10));
        assert_eq!(policy.delay(10), Duration::from_millis(40));
    }

    #[test]
    fn test_jitter_stays_within_quarter() {
        let policy = ResubscribePolicy::default();
        for _ in 0..50 {
            let d = policy.delay(0);
            assert!(d >= Duration::from_millis(500) && d <= Duration::from_millis(625));
        }
    }

    #[tokio::test]
    async fn test_events_delivered_and_failures_isolated() {
        let bus = Arc::new(InMemoryChangeBus::new());
        let owner = OwnerId::random();
        let recorder = Arc::new(Recorder::default());

        let handle = open_channel(
            bus.clone(),
            ChangeFilter::single(EntityKind::Pet, owner),
            recorder.clone(),
            ResubscribePolicy::for_testing(),
            "test",
        )
        .await;

        for ts in [1, 7, 13, 21] {
            bus.publish(pet_event(owner, ts)).await;
        }

        wait_until(|| recorder.seen.lock().len() == 2).await;
        assert_eq!(*recorder.seen.lock(), vec![1, 21]);
        assert_eq!(handle.health(), SyncHealth::Healthy);
    }

    #[tokio::test]
    async fn test_severed_channel_recovers_and_resyncs() {
        let bus = Arc::new(InMemoryChangeBus::new());
        let owner = OwnerId::random();
        let recorder = Arc::new(Recorder::default());

        let handle = open_channel(
            bus.clone(),
            ChangeFilter::single(EntityKind::Pet, owner),
            recorder.clone(),
            ResubscribePolicy::for_testing(),
            "test",
        )
        .await;

        bus.fail_next_subscribes(2);
        bus.sever();

        wait_until(|| recorder.resyncs.load(Ordering::SeqCst) == 1).await;
        wait_until(|| handle.health() == SyncHealth::Healthy).await;

        bus.publish(pet_event(owner, 30)).await;
        wait_until(|| recorder.seen.lock().contains(&30)).await;
    }

    #[tokio::test]
    async fn test_initial_failure_starts_degraded() {
        let bus = Arc::new(InMemoryChangeBus::new());
        bus.fail_next_subscribes(1);
        let recorder = Arc::new(Recorder::default());

        let handle = open_channel(
            bus.clone(),
            ChangeFilter::single(EntityKind::Pet, OwnerId::random()),
            recorder.clone(),
            ResubscribePolicy::for_testing(),
            "test",
        )
        .await;

        assert!(handle.health().is_degraded());
        wait_until(|| handle.health() == SyncHealth::Healthy).await;
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let bus = Arc::new(InMemoryChangeBus::new());
        bus.fail_next_subscribes(100);
        let policy = ResubscribePolicy {
            max_attempts: Some(3),
            ..ResubscribePolicy::for_testing()
        };

        let handle = open_channel(
            bus.clone(),
            ChangeFilter::single(EntityKind::Pet, OwnerId::random()),
            Arc::new(Recorder::default()),
            policy,
            "test",
        )
        .await;

        wait_until(|| handle.is_finished()).await;
        assert!(handle.health().is_degraded());
    }

    #[tokio::test]
    async fn test_drop_handle_unsubscribes() {
        let bus = Arc::new(InMemoryChangeBus::new());
        let handle = open_channel(
            bus.clone(),
            ChangeFilter::single(EntityKind::Pet, OwnerId::random()),
            Arc::new(Recorder::default()),
            ResubscribePolicy::for_testing(),
            "test",
        )
        .await;
        assert_eq!(bus.subscriber_count(), 1);

        drop(handle);
        wait_until(|| bus.subscriber_count() == 0).await;
    }
}
