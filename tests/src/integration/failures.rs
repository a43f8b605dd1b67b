//! # Failure Scenarios
//!
//! Store faults as seen through a full application instance: transient
//! write failures roll back at once, unauthorized calls end the session,
//! and a severed change channel recovers without losing writes.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use cs_01_session_manager::SessionApi;
    use cs_02_entity_sync::EntitySyncApi;
    use shared_store::{InMemoryStore, StoreOp};
    use shared_types::{
        EntityKind, EntityRecord, ErrorKind, Ledger, OwnerId, Pet, PetPatch, PetStats, StoreError,
    };

    use crate::integration::support::{eventually, Device};

    #[tokio::test]
    async fn test_transient_write_failure_restores_prior_value() {
        let store = Arc::new(InMemoryStore::new());
        let owner = OwnerId::random();
        let device = Device::start(&store).await;
        device.onboard(owner, "unlucky").await;

        let ledger = device.app.use_entity::<Ledger>();
        let before = ledger.value().unwrap();
        let updates_before = store.calls(StoreOp::Update);
        store.fail_next(
            StoreOp::Update,
            1,
            StoreError::TransientNetwork("connection reset".into()),
        );

        let err = device.app.gateway().earn(10, "quest").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransientNetwork);
        assert_eq!(ledger.value(), Some(before.clone()));
        assert!(!ledger.updating());
        assert!(ledger.error().is_some());
        // Mutations are never retried
        assert_eq!(store.calls(StoreOp::Update), updates_before + 1);
        assert_eq!(
            store.row(EntityKind::Ledger, owner),
            Some(EntityRecord::Ledger(before))
        );

        // The next write goes through and clears the error
        device.app.gateway().earn(10, "quest").await.unwrap();
        assert_eq!(device.app.gateway().balance(), Some(110));
        assert!(ledger.error().is_none());
    }

    #[tokio::test]
    async fn test_unauthorized_write_signs_out() {
        let store = Arc::new(InMemoryStore::new());
        let owner = OwnerId::random();
        let device = Device::start(&store).await;
        device.onboard(owner, "revoked").await;

        store.deny_owner(owner);
        let err = device
            .app
            .gateway()
            .apply_stat_delta(shared_types::StatDeltas {
                energy: -5,
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        let session = device.app.session();
        eventually("session signed out", || session.snapshot().identity.is_none()).await;
        let syncs = device.app.synchronizers();
        eventually("synchronizers detached", || syncs.pet.owner().is_none()).await;
        assert!(device.app.use_entity::<Pet>().value().is_none());
    }

    #[tokio::test]
    async fn test_severed_channel_catches_up_on_writes_made_meanwhile() {
        let store = Arc::new(InMemoryStore::new());
        let owner = OwnerId::random();
        let a = Device::start(&store).await;
        a.onboard(owner, "reconnects").await;
        let b = Device::start(&store).await;
        b.sign_in(owner).await;

        store.bus().sever();
        let current = a.app.use_entity::<Pet>().value().unwrap();
        let written = a
            .app
            .use_entity::<Pet>()
            .mutate(PetPatch {
                stats: Some(PetStats {
                    cleanliness: 5,
                    ..current.stats
                }),
                ..PetPatch::default()
            })
            .await
            .unwrap();

        let pet_on_b = b.app.use_entity::<Pet>();
        eventually("B sees the write made while severed", || {
            pet_on_b.value().as_ref() == Some(&written)
        })
        .await;
        let syncs = b.app.synchronizers();
        eventually("B's pet channel healthy again", || {
            !syncs.pet.sync_health().is_degraded()
        })
        .await;
        assert!(syncs.pet.has_channel());
    }

    #[tokio::test]
    async fn test_failed_load_surfaces_message_and_refresh_recovers() {
        let store = Arc::new(InMemoryStore::new());
        let owner = OwnerId::random();
        let device = Device::start(&store).await;
        device.onboard(owner, "retry_later").await;

        let ledger = device.app.use_entity::<Ledger>();
        // Let existence checks triggered by onboarding finish first
        tokio::time::sleep(Duration::from_millis(100)).await;
        store.fail_next(
            StoreOp::Get,
            3,
            StoreError::TransientNetwork("timeout".into()),
        );
        let err = ledger.refresh().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransientNetwork);
        let message = ledger.error().unwrap();
        assert_ne!(message, ErrorKind::TransientNetwork.as_str());

        let recovered = ledger.refresh().await.unwrap();
        assert_eq!(recovered.map(|l| l.balance), Some(100));
        assert!(ledger.error().is_none());
    }
}
