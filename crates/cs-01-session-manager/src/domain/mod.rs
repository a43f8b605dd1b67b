//! # Domain Layer
//!
//! Pure types for the session manager: no I/O, no async.

pub mod identity;
pub mod init_gate;
pub mod snapshot;

pub use identity::{Existence, ExistenceReport, Identity};
pub use init_gate::{GateVerdict, InitGate, InitSource};
pub use snapshot::SessionSnapshot;
