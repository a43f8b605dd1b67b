//! # CS-01 Session Manager
//!
//! Single source of truth for the signed-in identity and its derived
//! onboarding flags (has-profile, has-pet).
//!
//! **Subsystem ID:** cs-01
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Responsibilities
//!
//! | Concern | Mechanism |
//! |---------|-----------|
//! | Cold start | current-session fetch raced against the session-event stream through a one-shot [`InitGate`] |
//! | Onboarding flags | point lookups with retry; `Unknown` is distinct from confirmed absence |
//! | Redirect suppression | transition lock with an RAII [`TransitionGuard`] |
//! | Live flags | one change channel over the identity's Profile and Pet rows |
//!
//! ## Cold Start
//!
//! ```text
//! initialize()
//!   ├── on_session_change() ──→ InitialSession (replay) ──→ always discarded
//!   │                       └──→ SignedIn / SignedOut ───→ commits if first
//!   ├── get_current_session() ─────────────────────────────→ commits if first
//!   └── init_timeout ──────────────────────────────────────→ commits "no identity"
//! ```
//!
//! Exactly one of the three commits; whichever does runs the existence check
//! before `loading` clears.
//!
//! ## Module Structure
//!
//! ```text
//! cs-01-session-manager/
//! ├── domain/          # Identity, Existence, InitGate, SessionSnapshot
//! ├── ports/           # SessionApi (inbound), AuthProvider (outbound)
//! ├── adapters/        # InMemoryAuthProvider
//! ├── application/     # SessionManager, TransitionGuard
//! └── config.rs        # SessionConfig
//! ```

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use adapters::InMemoryAuthProvider;
pub use application::{SessionManager, TransitionGuard};
pub use config::SessionConfig;
pub use domain::{
    Existence, ExistenceReport, GateVerdict, Identity, InitGate, InitSource, SessionSnapshot,
};
pub use ports::{
    AuthError, AuthProvider, AuthSession, SessionApi, SessionEvent, SessionEventKind,
    SessionStream,
};
