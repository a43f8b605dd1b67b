//! Server-side clock used to stamp `updated_at`.

use parking_lot::Mutex;
use shared_types::ServerTimestamp;

/// Time source for consistent timestamp handling.
///
/// Abstracted to allow testing with deterministic time.
pub trait TimeSource: Send + Sync {
    /// Returns the current timestamp in milliseconds.
    fn now(&self) -> ServerTimestamp;
}

/// Wall-clock time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> ServerTimestamp {
        u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
    }
}

/// Strictly monotonic stamp generator.
///
/// Two writes within the same millisecond still get distinct, ordered
/// stamps: `next = max(now, last + 1)`.
pub struct ServerClock {
    source: Box<dyn TimeSource>,
    last: Mutex<ServerTimestamp>,
}

impl ServerClock {
    #[must_use]
    pub fn new(source: Box<dyn TimeSource>) -> Self {
        Self {
            source,
            last: Mutex::new(0),
        }
    }

    #[must_use]
    pub fn system() -> Self {
        Self::new(Box::new(SystemTimeSource))
    }

    /// Issue the next stamp.
    pub fn next(&self) -> ServerTimestamp {
        let mut last = self.last.lock();
        let stamp = self.source.now().max(last.saturating_add(1));
        *last = stamp;
        stamp
    }

    /// Last stamp issued (0 before the first write).
    #[must_use]
    pub fn last(&self) -> ServerTimestamp {
        *self.last.lock()
    }
}

impl Default for ServerClock {
    fn default() -> Self {
        Self::system()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FrozenTime(ServerTimestamp);

    impl TimeSource for FrozenTime {
        fn now(&self) -> ServerTimestamp {
            self.0
        }
    }

    #[test]
    fn test_stamps_strictly_increase_under_frozen_time() {
        let clock = ServerClock::new(Box::new(FrozenTime(1_000)));
        let a = clock.next();
        let b = clock.next();
        let c = clock.next();
        assert_eq!((a, b, c), (1_000, 1_001, 1_002));
        assert_eq!(clock.last(), 1_002);
    }

    #[test]
    fn test_system_clock_is_wall_time() {
        let clock = ServerClock::system();
        let stamp = clock.next();
        // 2020-01-01 in ms
        assert!(stamp > 1_577_836_800_000);
    }
}
