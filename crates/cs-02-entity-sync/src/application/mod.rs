//! # Application Layer
//!
//! The generic synchronizer and the per-kind entry points.

mod ledger;
mod pet;
mod synchronizer;

pub use ledger::LedgerSynchronizer;
pub use pet::PetSynchronizer;
pub use synchronizer::{CreateOutcome, EntitySynchronizer};

use shared_types::{Preferences, Profile};

pub type ProfileSynchronizer = EntitySynchronizer<Profile>;
pub type PreferencesSynchronizer = EntitySynchronizer<Preferences>;
