//! # Test Fixtures
//!
//! A `Device` is one application instance with its own auth provider. Two
//! devices over the same `InMemoryStore` model the same user on two tabs or
//! two phones.

use std::sync::Arc;
use std::time::Duration;

use app_runtime::{AppConfig, AppInstance};
use cs_01_session_manager::{AuthSession, InMemoryAuthProvider, SessionApi};
use shared_store::InMemoryStore;
use shared_types::{OwnerId, Pet, Profile};

/// Upper bound for anything a scenario waits on.
pub const WAIT: Duration = Duration::from_secs(5);

pub struct Device {
    pub app: Arc<AppInstance>,
    pub auth: Arc<InMemoryAuthProvider>,
}

impl Device {
    pub async fn start(store: &Arc<InMemoryStore>) -> Self {
        let auth = Arc::new(InMemoryAuthProvider::new());
        let app = AppInstance::start(store.clone(), auth.clone(), AppConfig::for_testing())
            .await
            .expect("testing config is valid");
        Self { app, auth }
    }

    /// Sign in and wait until every synchronizer is loaded for `owner`.
    pub async fn sign_in(&self, owner: OwnerId) {
        let mut session = self.app.session().watch();
        self.auth
            .sign_in(AuthSession::new(owner, format!("{owner}@example.com")));
        tokio::time::timeout(
            WAIT,
            session.wait_for(|s| s.owner_id() == Some(owner) && !s.loading),
        )
        .await
        .expect("identity committed in time")
        .expect("session alive");
        assert!(
            self.app.until_routed(owner, WAIT).await,
            "synchronizers loaded for {owner}"
        );
    }

    /// Sign in and run both setup steps.
    pub async fn onboard(&self, owner: OwnerId, username: &str) -> (Profile, Pet) {
        self.sign_in(owner).await;
        let profile = self
            .app
            .create_profile(username, None)
            .await
            .expect("profile created");
        let pet = self
            .app
            .create_pet("cat", "tabby", "Miso")
            .await
            .expect("pet created");
        (profile.entity, pet.entity)
    }
}

/// Poll `check` until it holds; panic with `what` after [`WAIT`].
pub async fn eventually<F>(what: &str, check: F)
where
    F: Fn() -> bool,
{
    let polled = tokio::time::timeout(WAIT, async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(polled.is_ok(), "timed out waiting for: {what}");
}
