//! # Application Instance
//!
//! Owns every subsystem of one running app and manages their lifetime.
//!
//! ## Startup Order
//!
//! ```text
//! 1. SessionManager (store + auth)
//! 2. SessionBridge → 4 × EntitySynchronizer
//! 3. Identity routing task (snapshot → load/detach)
//! 4. Navigation task (snapshot → gate re-evaluation)
//! 5. SessionManager::initialize() (resolves the first identity)
//! ```
//!
//! Nothing here is global: two instances over the same store behave like two
//! devices of the same user.

use std::sync::Arc;
use std::time::Duration;

use cs_01_session_manager::{AuthProvider, SessionApi, SessionManager, SessionSnapshot};
use cs_02_entity_sync::{EntitySynchronizer, SessionLink};
use cs_03_onboarding_gate::{current_state, OnboardingState, Route};
use parking_lot::Mutex;
use shared_store::PersistentStore;
use shared_types::OwnerId;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::container::config::{AppConfig, ConfigError};
use crate::gateway::CollaboratorGateway;
use crate::ui::{EntityHook, IdentityHook, Navigator, SyncedEntity};
use crate::wiring::{route_identity, SessionBridge, Synchronizers};

/// Route shown before the first identity resolves.
pub const INITIAL_ROUTE: Route = Route::Home;

pub struct AppInstance {
    config: AppConfig,
    pub(crate) session: Arc<SessionManager>,
    pub(crate) syncs: Arc<Synchronizers>,
    pub(crate) navigator: Arc<Navigator>,
    routed: watch::Sender<Option<OwnerId>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl AppInstance {
    /// Build, wire and initialize an instance.
    ///
    /// Returns once the first identity determination has been committed;
    /// synchronizer loads for that identity may still be running (see
    /// [`AppInstance::until_routed`]).
    pub async fn start(
        store: Arc<dyn PersistentStore>,
        auth: Arc<dyn AuthProvider>,
        config: AppConfig,
    ) -> Result<Arc<Self>, ConfigError> {
        config.validate()?;
        info!("[runtime] Starting application instance");

        let session = SessionManager::new(config.session.clone(), Arc::clone(&store), auth);
        let link: Arc<dyn SessionLink> = Arc::new(SessionBridge::new(Arc::clone(&session)));
        let syncs = Arc::new(Synchronizers {
            profile: EntitySynchronizer::new(config.sync.clone(), Arc::clone(&store), link.clone()),
            pet: EntitySynchronizer::new(config.sync.clone(), Arc::clone(&store), link.clone()),
            ledger: EntitySynchronizer::new(config.sync.clone(), Arc::clone(&store), link.clone()),
            preferences: EntitySynchronizer::new(config.sync.clone(), store, link),
        });
        let navigator = Arc::new(Navigator::new(Arc::clone(&session), INITIAL_ROUTE));
        let (routed, _) = watch::channel(None);

        let routing = tokio::spawn(route_identity(
            Arc::clone(&syncs),
            session.watch(),
            routed.clone(),
        ));
        let navigation = tokio::spawn(follow_session(Arc::clone(&navigator), session.watch()));

        let app = Arc::new(Self {
            config,
            session,
            syncs,
            navigator,
            routed,
            tasks: Mutex::new(vec![routing, navigation]),
        });

        app.session.initialize().await;
        info!(
            state = current_state(&app.session.snapshot()).as_str(),
            "[runtime] Application instance ready"
        );
        Ok(app)
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn session(&self) -> Arc<SessionManager> {
        Arc::clone(&self.session)
    }

    #[must_use]
    pub fn navigator(&self) -> Arc<Navigator> {
        Arc::clone(&self.navigator)
    }

    #[must_use]
    pub fn gateway(&self) -> CollaboratorGateway {
        CollaboratorGateway::new(Arc::clone(&self.syncs.pet), Arc::clone(&self.syncs.ledger))
    }

    #[must_use]
    pub fn synchronizers(&self) -> Arc<Synchronizers> {
        Arc::clone(&self.syncs)
    }

    // =========================================================================
    // UI HOOKS
    // =========================================================================

    pub fn use_identity(&self) -> IdentityHook {
        IdentityHook::new(Arc::clone(&self.session))
    }

    pub fn use_entity<E: SyncedEntity>(&self) -> EntityHook<E> {
        EntityHook::new(E::synchronizer(&self.syncs))
    }

    #[must_use]
    pub fn use_onboarding_state(&self) -> OnboardingState {
        current_state(&self.session.snapshot())
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Owner whose entities the synchronizers have finished loading.
    #[must_use]
    pub fn routed_owner(&self) -> Option<OwnerId> {
        *self.routed.borrow()
    }

    /// Wait until the synchronizers are loaded for `owner`.
    ///
    /// Returns `false` when that does not happen within `limit`.
    pub async fn until_routed(&self, owner: OwnerId, limit: Duration) -> bool {
        let mut rx = self.routed.subscribe();
        let reached = tokio::time::timeout(limit, rx.wait_for(|r| *r == Some(owner))).await;
        matches!(reached, Ok(Ok(_)))
    }

    /// Stop background tasks, detach every synchronizer and stop the
    /// session manager. Idempotent.
    pub fn shutdown(&self) {
        let tasks = std::mem::take(&mut *self.tasks.lock());
        if tasks.is_empty() {
            return;
        }
        for task in tasks {
            task.abort();
        }
        self.syncs.detach_all();
        self.session.shutdown();
        self.routed.send_replace(None);
        info!("[runtime] Application instance stopped");
    }
}

impl Drop for AppInstance {
    fn drop(&mut self) {
        for task in self.tasks.get_mut().drain(..) {
            task.abort();
        }
    }
}

/// Re-run the gate for the current route whenever the session changes.
async fn follow_session(
    navigator: Arc<Navigator>,
    mut session: watch::Receiver<SessionSnapshot>,
) {
    loop {
        drop(session.borrow_and_update());
        let location = navigator.reevaluate();
        debug!(
            route = location.route().path(),
            settled = location.is_settled(),
            "[runtime] Gate re-evaluated"
        );
        if session.changed().await.is_err() {
            break;
        }
    }
}
