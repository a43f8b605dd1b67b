//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implements outbound port traits.

mod memory_auth;

pub use memory_auth::InMemoryAuthProvider;
