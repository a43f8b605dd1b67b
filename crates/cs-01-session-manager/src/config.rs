//! # Session Manager Configuration

use shared_bus::ResubscribePolicy;
use shared_store::RetryPolicy;
use std::time::Duration;

/// Session manager configuration.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Hard fallback for `initialize()`: after this long with no session
    /// source resolved, commit "no identity" and clear `loading`.
    pub init_timeout: Duration,

    /// Bound for each store call made by existence checks.
    pub store_call_timeout: Duration,

    /// Attempts and backoff for each existence lookup.
    pub existence_retry: RetryPolicy,

    /// Backoff for re-subscribing the owned-entity channel.
    pub resubscribe: ResubscribePolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            init_timeout: Duration::from_secs(10),
            store_call_timeout: Duration::from_secs(12),
            existence_retry: RetryPolicy::default(),
            resubscribe: ResubscribePolicy::default(),
        }
    }
}

impl SessionConfig {
    /// Create a config for testing (short timings).
    pub fn for_testing() -> Self {
        Self {
            init_timeout: Duration::from_millis(500),
            store_call_timeout: Duration::from_millis(500),
            existence_retry: RetryPolicy {
                max_attempts: 3,
                initial_backoff: Duration::from_millis(5),
                multiplier: 2,
            },
            resubscribe: ResubscribePolicy::for_testing(),
        }
    }
}
