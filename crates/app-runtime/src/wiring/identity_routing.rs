//! # Identity Routing
//!
//! Follows the session snapshot and points every synchronizer at the
//! current identity.
//!
//! ```text
//! snapshot.owner_id() changes
//!   ├── Some(new) ──→ detach all ──→ load all for `new` ──→ routed = Some(new)
//!   └── None ───────→ detach all ──→ routed = None
//! ```
//!
//! Loads for an identity that was replaced mid-flight are cancelled by the
//! synchronizers themselves (generation check), so a slow load for the old
//! owner can never land on the new one.

use std::sync::Arc;

use cs_01_session_manager::SessionSnapshot;
use cs_02_entity_sync::{
    EntitySyncApi, LedgerSynchronizer, PetSynchronizer, PreferencesSynchronizer,
    ProfileSynchronizer,
};
use shared_types::{Entity, OwnerId, SyncError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// The four synchronizers of one application instance.
pub struct Synchronizers {
    pub profile: Arc<ProfileSynchronizer>,
    pub pet: Arc<PetSynchronizer>,
    pub ledger: Arc<LedgerSynchronizer>,
    pub preferences: Arc<PreferencesSynchronizer>,
}

impl Synchronizers {
    pub fn detach_all(&self) {
        self.profile.detach();
        self.pet.detach();
        self.ledger.detach();
        self.preferences.detach();
    }

    /// Load every kind for `owner`. Failures stay on each synchronizer's
    /// view; they do not stop the others.
    pub async fn load_all(&self, owner: OwnerId) {
        let (profile, pet, ledger, preferences) = tokio::join!(
            self.profile.load(owner),
            self.pet.load(owner),
            self.ledger.load(owner),
            self.preferences.load(owner),
        );
        report(owner, profile);
        report(owner, pet);
        report(owner, ledger);
        report(owner, preferences);
    }
}

fn report<E: Entity>(owner: OwnerId, outcome: Result<Option<E>, SyncError>) {
    match outcome {
        Ok(found) => debug!(
            kind = %E::KIND,
            owner = %owner,
            present = found.is_some(),
            "[runtime] Loaded"
        ),
        Err(e) => warn!(
            kind = %E::KIND,
            owner = %owner,
            error_kind = e.kind().as_str(),
            error = %e,
            "[runtime] Load failed"
        ),
    }
}

/// Run until the session manager goes away.
pub async fn route_identity(
    syncs: Arc<Synchronizers>,
    mut session: watch::Receiver<SessionSnapshot>,
    routed: watch::Sender<Option<OwnerId>>,
) {
    let mut current: Option<OwnerId> = None;
    loop {
        let owner = session.borrow_and_update().owner_id();
        if owner != current {
            current = owner;
            routed.send_replace(None);
            syncs.detach_all();
            match owner {
                Some(owner) => {
                    info!(owner = %owner, "[runtime] Routing synchronizers to identity");
                    syncs.load_all(owner).await;
                    if session.borrow().owner_id() == Some(owner) {
                        routed.send_replace(Some(owner));
                    }
                }
                None => info!("[runtime] Signed out, synchronizers detached"),
            }
        }
        if session.changed().await.is_err() {
            debug!("[runtime] Session channel closed, identity routing stopped");
            break;
        }
    }
}
