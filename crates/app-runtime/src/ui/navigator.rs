//! Route state driven by the onboarding gate.
//!
//! The gate is evaluated from a fresh session snapshot on every attempt and
//! at most one redirect is followed, so a navigation can never loop.

use std::sync::Arc;

use cs_01_session_manager::{SessionApi, SessionManager};
use cs_03_onboarding_gate::{evaluate, GateDecision, GateInput, Route};
use tokio::sync::watch;
use tracing::{debug, warn};

/// Where the UI currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// Session state unresolved; the route renders nothing specific yet.
    Waiting(Route),
    At(Route),
}

impl Location {
    #[must_use]
    pub fn route(&self) -> Route {
        match self {
            Location::Waiting(route) | Location::At(route) => *route,
        }
    }

    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(self, Location::At(_))
    }
}

pub struct Navigator {
    session: Arc<SessionManager>,
    location: watch::Sender<Location>,
}

impl Navigator {
    pub fn new(session: Arc<SessionManager>, initial: Route) -> Self {
        let (location, _) = watch::channel(Location::Waiting(initial));
        Self { session, location }
    }

    #[must_use]
    pub fn location(&self) -> Location {
        *self.location.borrow()
    }

    #[must_use]
    pub fn current(&self) -> Route {
        self.location().route()
    }

    pub fn watch(&self) -> watch::Receiver<Location> {
        self.location.subscribe()
    }

    /// Try to show `requested`. Returns where the UI ends up.
    pub fn navigate(&self, requested: Route) -> Location {
        let input = GateInput::from(&self.session.snapshot());
        let landed = match evaluate(&input, requested) {
            GateDecision::Allow => Location::At(requested),
            GateDecision::Wait => Location::Waiting(requested),
            GateDecision::Redirect(target) => {
                let second = evaluate(&input, target);
                if let GateDecision::Redirect(again) = second {
                    warn!(
                        from = requested.path(),
                        to = target.path(),
                        next = again.path(),
                        "[runtime] Redirect chain cut after one hop"
                    );
                }
                debug!(from = requested.path(), to = target.path(), "[runtime] Redirected");
                match second {
                    GateDecision::Wait => Location::Waiting(target),
                    _ => Location::At(target),
                }
            }
        };
        self.location.send_if_modified(|current| {
            let changed = *current != landed;
            *current = landed;
            changed
        });
        landed
    }

    /// Navigate by path. `None` for unknown paths.
    pub fn navigate_path(&self, path: &str) -> Option<Location> {
        Route::from_path(path).map(|route| self.navigate(route))
    }

    /// Re-run the gate for the current route after the session changed.
    pub fn reevaluate(&self) -> Location {
        self.navigate(self.current())
    }
}
