//! # Application Layer
//!
//! The session manager service and the transition guard.

mod service;
mod transition;

pub use service::SessionManager;
pub use transition::TransitionGuard;
