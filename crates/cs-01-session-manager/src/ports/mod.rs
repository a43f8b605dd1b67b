//! # Ports Layer
//!
//! - `inbound`: what the UI and runtime call (`SessionApi`)
//! - `outbound`: what the session manager needs (`AuthProvider`; the store
//!   port lives in `shared-store`)

pub mod inbound;
pub mod outbound;

pub use inbound::SessionApi;
pub use outbound::{
    AuthError, AuthProvider, AuthSession, SessionEvent, SessionEventKind, SessionStream,
};
