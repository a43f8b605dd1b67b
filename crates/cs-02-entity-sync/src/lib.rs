//! # CS-02 Entity Synchronizers
//!
//! One synchronizer per entity kind (Profile, Pet, Ledger, Preferences),
//! all instances of the generic [`EntitySynchronizer`].
//!
//! **Subsystem ID:** cs-02
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Guarantees
//!
//! | Concern | Mechanism |
//! |---------|-----------|
//! | Read-your-writes | optimistic apply before the store call |
//! | Rollback | pre-write snapshot restored synchronously on any failure |
//! | Ordering | FIFO mutation lock per synchronizer |
//! | Cross-instance convergence | change channel + last-write-wins by server timestamp |
//! | Idempotency | echo cache of own writes; equal timestamps are stale |
//! | Cancellation | generation counter; detach or owner change drops late results |
//!
//! ## Module Structure
//!
//! ```text
//! cs-02-entity-sync/
//! ├── domain/          # SyncPhase, EntityView, last-write-wins rule
//! ├── ports/           # EntitySyncApi (inbound), SessionLink (outbound)
//! ├── application/     # EntitySynchronizer, pet and ledger entry points
//! └── config.rs        # SyncConfig
//! ```

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use application::{
    CreateOutcome, EntitySynchronizer, LedgerSynchronizer, PetSynchronizer,
    PreferencesSynchronizer, ProfileSynchronizer,
};
pub use config::SyncConfig;
pub use domain::{decide, EntityView, MergeDecision, Settled, SyncPhase};
pub use ports::{EntitySyncApi, SessionLink};
