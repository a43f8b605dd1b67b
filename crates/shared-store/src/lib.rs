//! # Shared Store - Persistent Store Client
//!
//! The port every synchronizer and the session manager talk to, plus the
//! in-memory adapter used by the demo runtime and the test suite.
//!
//! ## Contract
//!
//! | Operation | Success | Errors |
//! |-----------|---------|--------|
//! | `get(kind, owner)` | `Some(row)` / `None` | `Unauthorized`, `TransientNetwork` |
//! | `insert(row)` | stamped row | `Conflict` (duplicate), `Unauthorized`, `TransientNetwork` |
//! | `update(kind, owner, patch)` | stamped row | `NotFound`, `Conflict`, `Unauthorized`, `TransientNetwork` |
//! | `subscribe(filter)` | live subscription | `SubscriptionError` |
//!
//! Every successful write is stamped with a strictly increasing server
//! timestamp and published on the change bus.

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod clock;
pub mod memory;
pub mod port;
pub mod retry;

pub use clock::{ServerClock, SystemTimeSource, TimeSource};
pub use memory::{InMemoryStore, StoreOp};
pub use port::{PersistentStore, StoreChanges};
pub use retry::{call_with_timeout, retry_transient, RetryPolicy};
