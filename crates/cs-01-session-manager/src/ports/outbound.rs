//! # Outbound Ports
//!
//! The auth provider: current-session lookup, a session-change stream that
//! starts with a synthetic replay, and sign-out. Credential issuance is the
//! provider's business; only session events are consumed here.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use shared_types::OwnerId;
use thiserror::Error;

use crate::domain::Identity;

/// Session as reported by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub user_id: OwnerId,
    pub email: String,
    pub display_name: Option<String>,
}

impl AuthSession {
    #[must_use]
    pub fn new(user_id: OwnerId, email: impl Into<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
            display_name: None,
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Identity with flags still undetermined.
    #[must_use]
    pub fn to_identity(&self) -> Identity {
        Identity::undetermined(self.user_id, self.email.clone(), self.display_name.clone())
    }
}

/// Kind of session transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionEventKind {
    /// Synthetic first event replaying the provider's cached session.
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// One session-change notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub kind: SessionEventKind,
    pub session: Option<AuthSession>,
}

impl SessionEvent {
    #[must_use]
    pub fn new(kind: SessionEventKind, session: Option<AuthSession>) -> Self {
        Self { kind, session }
    }

    #[must_use]
    pub fn is_replay(&self) -> bool {
        self.kind == SessionEventKind::InitialSession
    }
}

/// Stream of session events, replay first.
pub type SessionStream = BoxStream<'static, SessionEvent>;

/// Auth provider failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Auth provider unreachable: {0}")]
    Network(String),

    #[error("Auth provider rejected the request: {0}")]
    Rejected(String),
}

/// Auth provider - outbound port.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The provider's current session, if any.
    async fn get_current_session(&self) -> Result<Option<AuthSession>, AuthError>;

    /// Subscribe to session changes. The first item is always an
    /// `InitialSession` replay.
    async fn on_session_change(&self) -> SessionStream;

    /// End the current session. Emits `SignedOut` on every stream.
    async fn sign_out(&self) -> Result<(), AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_to_identity() {
        let session = AuthSession::new(OwnerId::random(), "kit@example.com").with_display_name("Kit");
        let identity = session.to_identity();
        assert_eq!(identity.id, session.user_id);
        assert_eq!(identity.display_name.as_deref(), Some("Kit"));
        assert!(identity.is_new_user);
    }

    #[test]
    fn test_replay_detection() {
        assert!(SessionEvent::new(SessionEventKind::InitialSession, None).is_replay());
        assert!(!SessionEvent::new(SessionEventKind::SignedOut, None).is_replay());
    }
}
