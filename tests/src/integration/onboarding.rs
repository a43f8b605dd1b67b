//! # Onboarding Scenarios
//!
//! Gate redirects over real session state, the transition lock around the
//! setup wizard, and the existence check riding out replication lag.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use app_runtime::Location;
    use cs_01_session_manager::{
        AuthSession, Existence, InMemoryAuthProvider, SessionApi, SessionConfig, SessionManager,
    };
    use cs_03_onboarding_gate::{OnboardingState, Route};
    use shared_store::{InMemoryStore, PersistentStore, RetryPolicy};
    use shared_types::{Entity, OwnerId, Pet, Profile};
    use tokio::time::Instant;

    use crate::integration::support::{eventually, Device};

    #[tokio::test]
    async fn test_no_profile_no_pet_ready_route_goes_to_profile_setup() {
        let store = Arc::new(InMemoryStore::new());
        let device = Device::start(&store).await;
        device.sign_in(OwnerId::random()).await;

        let navigator = device.app.navigator();
        assert_eq!(navigator.navigate(Route::Minigames), Location::At(Route::ProfileSetup));
        assert_eq!(navigator.navigate(Route::PetSetup), Location::At(Route::ProfileSetup));
        assert_eq!(navigator.navigate(Route::ProfileSetup), Location::At(Route::ProfileSetup));
    }

    #[tokio::test]
    async fn test_profile_without_pet_on_root_goes_to_pet_setup() {
        let store = Arc::new(InMemoryStore::new());
        let owner = OwnerId::random();
        store
            .insert(Profile::new(owner, "half_done").into_record())
            .await
            .unwrap();

        let device = Device::start(&store).await;
        device.sign_in(owner).await;
        assert_eq!(device.app.use_onboarding_state(), OnboardingState::NeedsPet);
        assert_eq!(
            device.app.navigator().navigate(Route::Home),
            Location::At(Route::PetSetup)
        );
    }

    #[tokio::test]
    async fn test_transition_lock_after_pet_create_suppresses_redirect() {
        let store = Arc::new(InMemoryStore::new());
        let owner = OwnerId::random();
        let device = Device::start(&store).await;
        device.sign_in(owner).await;
        device.app.create_profile("almost_there", None).await.unwrap();

        let session = device.app.session();
        let guard = session.begin_transition();
        // Created, but the session has not refreshed yet
        store
            .insert(Pet::hatch(owner, "cat", "tabby", "Miso").into_record())
            .await
            .unwrap();
        let navigator = device.app.navigator();
        assert_eq!(navigator.navigate(Route::Home), Location::At(Route::Home));
        assert!(session.snapshot().transitioning);

        assert!(session.refresh().await);
        drop(guard);
        assert!(!session.snapshot().transitioning);
        assert_eq!(navigator.reevaluate(), Location::At(Route::Home));
    }

    #[tokio::test]
    async fn test_pet_wizard_survives_replication_lag() {
        let store = Arc::new(InMemoryStore::new());
        let owner = OwnerId::random();
        let device = Device::start(&store).await;
        device.sign_in(owner).await;
        device.app.create_profile("laggy_reads", None).await.unwrap();

        store.set_read_lag(1);
        let outcome = device.app.create_pet("dog", "corgi", "Biscuit").await.unwrap();
        assert_eq!(outcome.location, Location::At(Route::Home));

        let session = device.app.session();
        eventually("pet flag catches up", || {
            session.snapshot().has_pet() == Existence::Present
        })
        .await;
        let navigator = device.app.navigator();
        eventually("wizard settles on home", || {
            navigator.location() == Location::At(Route::Home)
        })
        .await;
        assert_eq!(device.app.use_onboarding_state(), OnboardingState::Ready);
    }

    #[tokio::test]
    async fn test_unknown_existence_does_not_redirect() {
        let store = Arc::new(InMemoryStore::new());
        let owner = OwnerId::random();
        store
            .insert(Profile::new(owner, "flaky_net").into_record())
            .await
            .unwrap();
        let device = Device::start(&store).await;
        device.sign_in(owner).await;
        device.app.create_pet("cat", "tabby", "Miso").await.unwrap();
        // Let the refresh triggered by the pet's insert event finish first
        tokio::time::sleep(Duration::from_millis(100)).await;

        store.fail_next(
            shared_store::StoreOp::Get,
            6,
            shared_types::StoreError::TransientNetwork("offline".into()),
        );
        let session = device.app.session();
        assert!(!session.refresh().await);
        assert_eq!(session.snapshot().has_pet(), Existence::Unknown);
        assert_eq!(device.app.use_onboarding_state(), OnboardingState::NeedsProfile);
        assert_eq!(
            device.app.navigator().navigate(Route::Shop),
            Location::At(Route::Shop)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_false_negative_resolved_by_third_attempt_after_backoff() {
        let store = Arc::new(InMemoryStore::new());
        let owner = OwnerId::random();
        store.set_read_lag(2);
        store
            .insert(Pet::hatch(owner, "cat", "tabby", "Miso").into_record())
            .await
            .unwrap();

        let config = SessionConfig {
            existence_retry: RetryPolicy::default(),
            ..SessionConfig::for_testing()
        };
        let auth = Arc::new(InMemoryAuthProvider::with_session(AuthSession::new(
            owner,
            "lag@example.com",
        )));
        let manager = SessionManager::new(config, store.clone(), auth);

        let started = Instant::now();
        let report = manager.check_entity_existence(owner).await;
        assert_eq!(report.has_pet, Existence::Present);
        assert!(started.elapsed() >= Duration::from_millis(300));
    }
}
