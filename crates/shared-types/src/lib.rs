//! # Shared Types Crate
//!
//! Entity records, patches and the error taxonomy shared by every crate in
//! the workspace.
//!
//! ## Design Principles
//!
//! - **Tagged records**: each entity kind has one fixed schema; cross-kind
//!   plumbing (store, bus) moves `EntityRecord` / `EntityPatch` variants.
//! - **Store is authoritative**: `updated_at` is always a server timestamp and
//!   is the only ordering key used for last-write-wins merges.
//! - **Derived, never stored**: pet mood and identity onboarding flags are
//!   computed from other fields.

pub mod entities;
pub mod errors;
pub mod ledger;
pub mod pet;
pub mod preferences;
pub mod profile;

pub use entities::*;
pub use errors::*;
pub use ledger::{Ledger, LedgerPatch, LedgerTransaction, NewTransaction};
pub use pet::{Mood, Pet, PetPatch, PetStats, StatDeltas, STAT_MAX, STAT_MIN};
pub use preferences::{Preferences, PreferencesPatch};
pub use profile::{Profile, ProfilePatch};
