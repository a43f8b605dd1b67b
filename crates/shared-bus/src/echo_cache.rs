//! # Echo Cache
//!
//! Remembers this instance's own recent writes so the change events they
//! produce can be recognised and skipped.
//!
//! Keys are `(kind, owner, server timestamp)`: the store stamps every write
//! with a strictly increasing timestamp, so a matching event is exactly the
//! echo of our write and never a foreign change.

use crate::events::ChangeEvent;
use lru::LruCache;
use shared_types::{EntityKind, OwnerId, ServerTimestamp};
use std::num::NonZeroUsize;
use std::time::Duration;
use tokio::time::Instant;

type EchoKey = (EntityKind, OwnerId, ServerTimestamp);

/// Bounded, time-windowed record of own writes.
pub struct EchoCache {
    entries: LruCache<EchoKey, Instant>,
    window: Duration,
}

impl EchoCache {
    /// Default number of remembered writes.
    pub const DEFAULT_CAPACITY: usize = 256;

    /// Default time an own write is remembered.
    pub const DEFAULT_WINDOW: Duration = Duration::from_secs(30);

    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Self::DEFAULT_CAPACITY, Self::DEFAULT_WINDOW)
    }

    #[must_use]
    pub fn with_config(capacity: usize, window: Duration) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(cap),
            window,
        }
    }

    /// Record a write this instance just committed.
    pub fn record_own_write(&mut self, kind: EntityKind, owner: OwnerId, at: ServerTimestamp) {
        self.entries.put((kind, owner, at), Instant::now());
    }

    /// Returns `true` (and forgets the entry) when `event` echoes an own write.
    pub fn is_echo(&mut self, event: &ChangeEvent) -> bool {
        let key = (event.kind(), event.owner_id(), event.server_ts);
        match self.entries.pop(&key) {
            Some(recorded) => recorded.elapsed() <= self.window,
            None => false,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for EchoCache {
    fn default() -> Self {
        Self::new()
    }
}
