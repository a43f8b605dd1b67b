//! # Change Subscriber
//!
//! Defines the subscription side of the change bus.

use crate::events::{ChangeEvent, ChangeFilter};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The channel was closed (bus dropped or socket severed).
    #[error("Change channel closed")]
    Closed,

    /// The subscriber fell behind and missed events.
    #[error("Subscriber lagged, {0} events dropped")]
    Lagged(u64),

    /// The source refused the subscription.
    #[error("Subscription rejected: {0}")]
    Rejected(String),
}

/// Anything that can hand out filtered change subscriptions.
#[async_trait]
pub trait ChangeSource: Send + Sync {
    /// Open a subscription for events matching `filter`.
    async fn subscribe(&self, filter: ChangeFilter) -> Result<Subscription, SubscriptionError>;
}

/// A subscription handle for receiving change events.
///
/// When dropped, the subscription is automatically cleaned up.
pub struct Subscription {
    /// The broadcast receiver.
    receiver: broadcast::Receiver<ChangeEvent>,

    /// Filter for this subscription.
    filter: ChangeFilter,

    /// Reference to subscription tracking (for cleanup).
    subscriptions: Arc<RwLock<HashMap<String, usize>>>,

    /// Channel key for this subscription.
    channel_key: String,
}

impl Subscription {
    pub(crate) fn new(
        receiver: broadcast::Receiver<ChangeEvent>,
        filter: ChangeFilter,
        subscriptions: Arc<RwLock<HashMap<String, usize>>>,
        channel_key: String,
    ) -> Self {
        Self {
            receiver,
            filter,
            subscriptions,
            channel_key,
        }
    }

    /// Receive the next event that matches the filter.
    ///
    /// Unlike a plain broadcast receiver, a lag is surfaced to the caller:
    /// missed events mean the consumer must re-read authoritative state.
    ///
    /// # Errors
    ///
    /// - `Lagged(n)` - `n` events were dropped; the subscription stays usable
    /// - `Closed` - the channel is gone; re-subscribe
    pub async fn recv(&mut self) -> Result<ChangeEvent, SubscriptionError> {
        loop {
            let event = match self.receiver.recv().await {
                Ok(e) => e,
                Err(broadcast::error::RecvError::Closed) => return Err(SubscriptionError::Closed),
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(channel = %self.channel_key, lagged = count, "[bus] Subscriber lagged");
                    return Err(SubscriptionError::Lagged(count));
                }
            };

            if self.filter.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Try to receive the next event without blocking.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(event))` - An event was available and matched
    /// - `Ok(None)` - No event available (would block)
    /// - `Err(_)` - The channel was closed or lagged
    pub fn try_recv(&mut self) -> Result<Option<ChangeEvent>, SubscriptionError> {
        loop {
            let event = match self.receiver.try_recv() {
                Ok(e) => e,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    return Err(SubscriptionError::Lagged(count))
                }
            };

            if self.filter.matches(&event) {
                return Ok(Some(event));
            }
        }
    }

    /// Get the filter for this subscription.
    #[must_use]
    pub fn filter(&self) -> &ChangeFilter {
        &self.filter
    }

    /// Channel key this subscription is tracked under.
    #[must_use]
    pub fn channel_key(&self) -> &str {
        &self.channel_key
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut subs = self.subscriptions.write();
        if let Some(count) = subs.get_mut(&self.channel_key) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                subs.remove(&self.channel_key);
            }
        }
        debug!(channel = %self.channel_key, "[bus] Subscription dropped");
    }
}
