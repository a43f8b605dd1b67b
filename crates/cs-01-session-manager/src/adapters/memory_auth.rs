//! In-memory auth provider.
//!
//! Holds one session shared by every "tab" that holds a clone of the
//! `Arc`, and fans session events out to every open stream. Fault knobs
//! reproduce the cold-start races a hosted provider exhibits.

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::debug;

use crate::ports::{AuthError, AuthProvider, AuthSession, SessionEvent, SessionEventKind, SessionStream};

#[derive(Default)]
struct Faults {
    fetch_delay: Duration,
    fetch_failures: u32,
    /// `Some(x)`: the replay reports `x` instead of the current session.
    stale_replay: Option<Option<AuthSession>>,
}

/// In-memory implementation of [`AuthProvider`].
#[derive(Default)]
pub struct InMemoryAuthProvider {
    session: Mutex<Option<AuthSession>>,
    listeners: Mutex<Vec<mpsc::UnboundedSender<SessionEvent>>>,
    faults: Mutex<Faults>,
    sign_outs: AtomicUsize,
}

impl InMemoryAuthProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider that already holds a session (a returning user).
    #[must_use]
    pub fn with_session(session: AuthSession) -> Self {
        let provider = Self::default();
        *provider.session.lock() = Some(session);
        provider
    }

    /// Sign in and notify every stream.
    pub fn sign_in(&self, session: AuthSession) {
        *self.session.lock() = Some(session.clone());
        self.emit(SessionEvent::new(SessionEventKind::SignedIn, Some(session)));
    }

    /// Emit a token refresh for the current session.
    pub fn refresh_token(&self) {
        let current = self.session.lock().clone();
        if current.is_some() {
            self.emit(SessionEvent::new(SessionEventKind::TokenRefreshed, current));
        }
    }

    /// Change the display name and emit `UserUpdated`.
    pub fn update_display_name(&self, name: impl Into<String>) {
        let updated = {
            let mut session = self.session.lock();
            if let Some(s) = session.as_mut() {
                s.display_name = Some(name.into());
            }
            session.clone()
        };
        if updated.is_some() {
            self.emit(SessionEvent::new(SessionEventKind::UserUpdated, updated));
        }
    }

    /// Delay every `get_current_session` call.
    pub fn set_fetch_delay(&self, delay: Duration) {
        self.faults.lock().fetch_delay = delay;
    }

    /// Fail the next `count` fetches with a network error.
    pub fn fail_next_fetches(&self, count: u32) {
        self.faults.lock().fetch_failures = count;
    }

    /// Make the replay report `session` regardless of the current state.
    pub fn set_stale_replay(&self, session: Option<AuthSession>) {
        self.faults.lock().stale_replay = Some(session);
    }

    /// Number of upstream `sign_out` calls received.
    #[must_use]
    pub fn sign_out_count(&self) -> usize {
        self.sign_outs.load(Ordering::SeqCst)
    }

    /// Number of open streams.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        let mut listeners = self.listeners.lock();
        listeners.retain(|tx| !tx.is_closed());
        listeners.len()
    }

    fn emit(&self, event: SessionEvent) {
        debug!(kind = ?event.kind, "[auth] Session event");
        self.listeners
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[async_trait]
impl AuthProvider for InMemoryAuthProvider {
    async fn get_current_session(&self) -> Result<Option<AuthSession>, AuthError> {
        let delay = self.faults.lock().fetch_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        {
            let mut faults = self.faults.lock();
            if faults.fetch_failures > 0 {
                faults.fetch_failures -= 1;
                return Err(AuthError::Network("session endpoint unreachable".into()));
            }
        }
        Ok(self.session.lock().clone())
    }

    async fn on_session_change(&self) -> SessionStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let replay = match self.faults.lock().stale_replay.clone() {
            Some(stale) => stale,
            None => self.session.lock().clone(),
        };
        // Receiver is held below, send cannot fail
        let _ = tx.send(SessionEvent::new(SessionEventKind::InitialSession, replay));
        self.listeners.lock().push(tx);
        UnboundedReceiverStream::new(rx).boxed()
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        let had_session = self.session.lock().take().is_some();
        if had_session {
            self.emit(SessionEvent::new(SessionEventKind::SignedOut, None));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::OwnerId;

    #[tokio::test]
    async fn test_stream_starts_with_replay() {
        let session = AuthSession::new(OwnerId::random(), "kit@example.com");
        let auth = InMemoryAuthProvider::with_session(session.clone());

        let mut stream = auth.on_session_change().await;
        let first = stream.next().await.unwrap();
        assert!(first.is_replay());
        assert_eq!(first.session, Some(session));
    }

    #[tokio::test]
    async fn test_events_fan_out_to_every_stream() {
        let auth = InMemoryAuthProvider::new();
        let mut a = auth.on_session_change().await;
        let mut b = auth.on_session_change().await;
        a.next().await;
        b.next().await;

        auth.sign_in(AuthSession::new(OwnerId::random(), "kit@example.com"));
        assert_eq!(a.next().await.unwrap().kind, SessionEventKind::SignedIn);
        assert_eq!(b.next().await.unwrap().kind, SessionEventKind::SignedIn);

        auth.sign_out().await.unwrap();
        assert_eq!(a.next().await.unwrap().kind, SessionEventKind::SignedOut);
    }

    #[tokio::test]
    async fn test_fetch_failures_are_consumed() {
        let auth = InMemoryAuthProvider::new();
        auth.fail_next_fetches(1);
        assert!(auth.get_current_session().await.is_err());
        assert_eq!(auth.get_current_session().await, Ok(None));
    }

    #[tokio::test]
    async fn test_dropped_streams_are_pruned() {
        let auth = InMemoryAuthProvider::new();
        let stream = auth.on_session_change().await;
        assert_eq!(auth.listener_count(), 1);
        drop(stream);
        assert_eq!(auth.listener_count(), 0);
    }
}
