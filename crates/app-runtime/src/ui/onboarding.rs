//! Setup-wizard flows.
//!
//! Each flow holds the session's transition guard from the create call until
//! it has navigated to the next screen. Until then the gate allows the
//! requested route even if the refreshed flags are not in yet, so the
//! wizard is never bounced back to the step it just completed. The guard
//! is released on every path out of the flow.

use std::time::Duration;

use cs_01_session_manager::SessionApi;
use cs_02_entity_sync::EntitySyncApi;
use cs_03_onboarding_gate::Route;
use shared_types::{Ledger, OwnerId, Pet, Profile, SyncError};
use thiserror::Error;
use tracing::{info, warn};

use crate::container::AppInstance;
use crate::ui::Location;

/// Coins granted when a profile is created.
pub const STARTING_COINS: i64 = 100;

/// Longest a flow waits for the synchronizers to load the identity.
const ROUTING_WAIT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("no signed-in identity")]
    NotSignedIn,

    #[error("entities for {0} did not finish loading")]
    NotReady(OwnerId),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// Result of a completed setup step.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowOutcome<E> {
    pub entity: E,
    /// Where the wizard landed after the step.
    pub location: Location,
    /// Whether the session flags were refreshed before navigating.
    pub session_refreshed: bool,
}

impl AppInstance {
    /// Create the identity's profile (and opening ledger), then go to pet
    /// setup.
    pub async fn create_profile(
        &self,
        username: &str,
        avatar_ref: Option<&str>,
    ) -> Result<FlowOutcome<Profile>, FlowError> {
        let owner = self.ready_owner().await?;
        let _guard = self.session.begin_transition();

        if self.syncs.ledger.view().value.is_none() {
            self.syncs
                .ledger
                .create(Ledger::opening(owner, STARTING_COINS, "welcome_grant"))
                .await?;
        }

        let mut profile = Profile::new(owner, username);
        if let Some(avatar) = avatar_ref {
            profile = profile.with_avatar(avatar);
        }
        profile.coin_balance_snapshot = self.syncs.ledger.balance().unwrap_or_default();

        let outcome = self.syncs.profile.create(profile).await?;
        let location = self.navigator.navigate(Route::PetSetup);
        info!(owner = %owner, "[runtime] Profile created");
        Ok(FlowOutcome {
            entity: outcome.entity,
            location,
            session_refreshed: outcome.session_refreshed,
        })
    }

    /// Hatch the identity's pet, then go home.
    pub async fn create_pet(
        &self,
        species: &str,
        breed: &str,
        name: &str,
    ) -> Result<FlowOutcome<Pet>, FlowError> {
        let owner = self.ready_owner().await?;
        let _guard = self.session.begin_transition();

        let outcome = self
            .syncs
            .pet
            .create(Pet::hatch(owner, species, breed, name))
            .await?;
        if !outcome.session_refreshed {
            warn!(owner = %owner, "[runtime] Pet created before flags refreshed");
        }
        let location = self.navigator.navigate(Route::Home);
        info!(owner = %owner, "[runtime] Pet created");
        Ok(FlowOutcome {
            entity: outcome.entity,
            location,
            session_refreshed: outcome.session_refreshed,
        })
    }

    async fn ready_owner(&self) -> Result<OwnerId, FlowError> {
        let owner = self
            .session
            .snapshot()
            .owner_id()
            .ok_or(FlowError::NotSignedIn)?;
        if self.until_routed(owner, ROUTING_WAIT).await {
            Ok(owner)
        } else {
            Err(FlowError::NotReady(owner))
        }
    }
}
