//! # Shared Bus - Change Notification Bus
//!
//! Delivers row-level insert/update/delete events, filtered per owner and
//! entity kind, from the persistent store to every interested component.
//!
//! ## Channel Rules
//!
//! - **One channel per (kind-set, owner)** per consumer instance; opening a
//!   new one replaces the old handle, dropping a handle unsubscribes.
//! - **No ordering assumptions**: consumers merge last-write-wins by server
//!   timestamp and treat echoes of their own writes as no-ops.
//! - **Non-fatal failures**: a dropped channel is re-subscribed by the
//!   supervisor; meanwhile the consumer reports `SyncHealth::Degraded`.
//!
//! ```text
//! ┌──────────────┐  write   ┌──────────────┐ publish ┌──────────────┐
//! │ Synchronizer │ ───────→ │    Store     │ ──────→ │  Change Bus  │
//! └──────────────┘          └──────────────┘         └──────┬───────┘
//!        ↑                                                  │ filtered by
//!        └──────────── ChannelSupervisor ←──────────────────┘ (kind, owner)
//! ```

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod channel;
pub mod echo_cache;
pub mod events;
pub mod health;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use channel::{open_channel, ChangeHandler, ChannelHandle, HandlerError, ResubscribePolicy};
pub use echo_cache::EchoCache;
pub use events::{ChangeEvent, ChangeFilter, ChangeOp};
pub use health::SyncHealth;
pub use publisher::{ChangePublisher, InMemoryChangeBus};
pub use subscriber::{ChangeSource, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before it lags.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
