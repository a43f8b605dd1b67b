//! # Change Publisher
//!
//! Defines the publishing side of the change bus and the in-memory bus used
//! by the in-memory store and the test suite.

use crate::events::{ChangeEvent, ChangeFilter};
use crate::subscriber::{ChangeSource, Subscription, SubscriptionError};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Trait for publishing change events to the bus.
#[async_trait]
pub trait ChangePublisher: Send + Sync {
    /// Publish an event to the bus.
    ///
    /// # Returns
    ///
    /// The number of live receivers (before per-channel filtering).
    async fn publish(&self, event: ChangeEvent) -> usize;

    /// Get the total number of events published.
    fn events_published(&self) -> u64;
}

/// In-memory implementation of the change bus.
///
/// Uses `tokio::sync::broadcast` for multi-producer, multi-consumer semantics;
/// owner/kind filtering happens in each [`Subscription`], standing in for the
/// server-side filter of a hosted store.
pub struct InMemoryChangeBus {
    /// Broadcast sender for events. Swapped out by [`Self::sever`].
    sender: RwLock<broadcast::Sender<ChangeEvent>>,

    /// Active subscription count by channel key.
    subscriptions: Arc<RwLock<HashMap<String, usize>>>,

    /// Total events published.
    events_published: AtomicU64,

    /// Subscribe attempts still to reject (fault injection).
    reject_subscribes: AtomicU32,

    /// Channel capacity.
    capacity: usize,
}

impl InMemoryChangeBus {
    /// Create a new in-memory bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new in-memory bus with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: RwLock::new(sender),
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            events_published: AtomicU64::new(0),
            reject_subscribes: AtomicU32::new(0),
            capacity,
        }
    }

    /// Subscribe to events matching a filter.
    #[must_use]
    pub fn subscribe_now(&self, filter: ChangeFilter) -> Subscription {
        let receiver = self.sender.read().subscribe();
        let key = filter.channel_key();

        *self.subscriptions.write().entry(key.clone()).or_insert(0) += 1;

        debug!(channel = %key, "[bus] New subscription created");

        Subscription::new(receiver, filter, self.subscriptions.clone(), key)
    }

    /// Close every live subscription, simulating a dropped realtime socket.
    ///
    /// Receivers observe `Closed` once the old sender is gone; new
    /// subscriptions attach to a fresh sender.
    pub fn sever(&self) {
        let (fresh, _) = broadcast::channel(self.capacity);
        let old = std::mem::replace(&mut *self.sender.write(), fresh);
        warn!(
            receivers = old.receiver_count(),
            "[bus] Severing all live subscriptions"
        );
        drop(old);
    }

    /// Reject the next `count` subscribe attempts.
    pub fn fail_next_subscribes(&self, count: u32) {
        self.reject_subscribes.store(count, Ordering::SeqCst);
    }

    /// Get the number of active receivers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.read().receiver_count()
    }

    /// Number of live subscriptions for a channel key.
    #[must_use]
    pub fn channel_subscriptions(&self, key: &str) -> usize {
        self.subscriptions.read().get(key).copied().unwrap_or(0)
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryChangeBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChangePublisher for InMemoryChangeBus {
    async fn publish(&self, event: ChangeEvent) -> usize {
        let kind = event.kind();
        let owner = event.owner_id();

        // Always increment counter (event was attempted)
        self.events_published.fetch_add(1, Ordering::Relaxed);

        match self.sender.read().send(event) {
            Ok(receiver_count) => {
                debug!(
                    kind = %kind,
                    owner = %owner,
                    receivers = receiver_count,
                    "[bus] Change published"
                );
                receiver_count
            }
            Err(_) => {
                // No receivers - nobody is watching this owner right now
                debug!(kind = %kind, owner = %owner, "[bus] Change dropped (no receivers)");
                0
            }
        }
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ChangeSource for InMemoryChangeBus {
    async fn subscribe(&self, filter: ChangeFilter) -> Result<Subscription, SubscriptionError> {
        let rejected = self
            .reject_subscribes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if rejected {
            warn!(channel = %filter.channel_key(), "[bus] Subscribe rejected (injected fault)");
            return Err(SubscriptionError::Rejected(
                "realtime endpoint unavailable".to_string(),
            ));
        }
        Ok(self.subscribe_now(filter))
    }
}
