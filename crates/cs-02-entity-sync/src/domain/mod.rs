//! # Domain Layer
//!
//! Lifecycle phases, the last-write-wins rule and the observable view.

pub mod merge;
pub mod phase;
pub mod view;

pub use merge::{decide, MergeDecision};
pub use phase::{Settled, SyncPhase};
pub use view::EntityView;
