//! # Synchronizer Configuration

use shared_bus::ResubscribePolicy;
use shared_store::RetryPolicy;
use std::time::Duration;

/// Entity synchronizer configuration, shared by every entity kind.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// Attempts and backoff for loads. Mutations are never retried.
    pub load_retry: RetryPolicy,

    /// Bound for each store call.
    pub store_call_timeout: Duration,

    /// Backoff for re-subscribing the change channel.
    pub resubscribe: ResubscribePolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            load_retry: RetryPolicy::default(),
            store_call_timeout: Duration::from_secs(12),
            resubscribe: ResubscribePolicy::default(),
        }
    }
}

impl SyncConfig {
    /// Create a config for testing (short timings).
    pub fn for_testing() -> Self {
        Self {
            load_retry: RetryPolicy {
                max_attempts: 3,
                initial_backoff: Duration::from_millis(5),
                multiplier: 2,
            },
            store_call_timeout: Duration::from_millis(500),
            resubscribe: ResubscribePolicy::for_testing(),
        }
    }
}
