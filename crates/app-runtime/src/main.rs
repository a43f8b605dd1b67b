//! # Companion-Sync Demo
//!
//! Runs one application instance over the in-memory store and auth
//! provider and walks a new user through onboarding.
//!
//! ## Sequence
//!
//! 1. Load configuration (`CS_*` environment variables)
//! 2. Initialize logging and metrics
//! 3. Start the instance (no session yet → sign-in screen)
//! 4. Sign in, create a profile, hatch a pet
//! 5. Play: earn coins, apply stat deltas, spend coins
//! 6. Log the final state and shut down

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::info;

use app_runtime::{AppConfig, AppInstance};
use companion_telemetry::{encode_metrics, init_telemetry};
use cs_01_session_manager::{AuthSession, InMemoryAuthProvider, SessionApi};
use shared_store::InMemoryStore;
use shared_types::{OwnerId, Pet, StatDeltas};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env().context("Invalid configuration")?;
    init_telemetry(&config.telemetry).context("Failed to initialize telemetry")?;
    let metrics_enabled = config.telemetry.metrics_enabled;

    let store = Arc::new(InMemoryStore::new());
    let auth = Arc::new(InMemoryAuthProvider::new());
    let app = AppInstance::start(store, auth.clone(), config)
        .await
        .context("Failed to start application instance")?;
    info!(
        route = app.navigator().current().path(),
        state = app.use_onboarding_state().as_str(),
        "Started"
    );

    let owner = OwnerId::random();
    let mut session = app.session().watch();
    auth.sign_in(AuthSession::new(owner, "demo@companion.app").with_display_name("Demo"));
    let signed_in = tokio::time::timeout(
        Duration::from_secs(15),
        session.wait_for(|s| s.owner_id() == Some(owner) && !s.loading),
    )
    .await;
    if !matches!(signed_in, Ok(Ok(_))) {
        bail!("Sign-in for {owner} was not observed");
    }

    let profile = app
        .create_profile("demo_player", None)
        .await
        .context("Profile setup failed")?;
    info!(
        username = %profile.entity.username,
        route = profile.location.route().path(),
        "Profile created"
    );

    let pet = app
        .create_pet("cat", "tabby", "Miso")
        .await
        .context("Pet setup failed")?;
    info!(
        name = %pet.entity.name,
        route = pet.location.route().path(),
        "Pet hatched"
    );

    let gateway = app.gateway();
    gateway
        .earn(25, "minigame:catch")
        .await
        .context("Earn failed")?;
    gateway
        .apply_stat_delta(StatDeltas {
            happiness: 15,
            hunger: -10,
            ..StatDeltas::default()
        })
        .await
        .context("Stat update failed")?;
    gateway
        .spend(40, "shop:scarf")
        .await
        .context("Spend failed")?;

    let pet: Option<Pet> = app.use_entity::<Pet>().value();
    info!(
        state = app.use_onboarding_state().as_str(),
        route = app.navigator().current().path(),
        balance = ?gateway.balance(),
        mood = ?gateway.mood(),
        stats = ?pet.map(|p| p.stats),
        "Final state"
    );

    if metrics_enabled {
        let exposition = encode_metrics().context("Failed to encode metrics")?;
        info!(bytes = exposition.len(), "Metrics gathered");
        tracing::debug!("{exposition}");
    }

    app.shutdown();
    Ok(())
}
