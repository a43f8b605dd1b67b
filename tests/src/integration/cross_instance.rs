//! # Cross-Instance Scenarios
//!
//! Two application instances of the same owner over one store. Writes from
//! one must reach the other through the change channel; ordering between
//! them is last-write-wins by server timestamp.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cs_02_entity_sync::{EntitySyncApi, MergeDecision};
    use futures::future::join_all;
    use shared_bus::{ChangeEvent, ChangeOp};
    use shared_store::InMemoryStore;
    use shared_types::{
        Entity, EntityKind, EntityRecord, Ledger, OwnerId, Pet, PetPatch, PetStats, Profile,
    };

    use crate::integration::support::{eventually, Device};

    #[tokio::test]
    async fn test_happiness_written_on_one_device_reaches_the_other() {
        let store = Arc::new(InMemoryStore::new());
        let owner = OwnerId::random();
        let a = Device::start(&store).await;
        a.onboard(owner, "two_devices").await;
        let b = Device::start(&store).await;
        b.sign_in(owner).await;

        let current = a.app.use_entity::<Pet>().value().unwrap();
        let written = a
            .app
            .use_entity::<Pet>()
            .mutate(PetPatch {
                stats: Some(PetStats {
                    happiness: 80,
                    ..current.stats
                }),
                ..PetPatch::default()
            })
            .await
            .unwrap();
        assert_eq!(written.stats.happiness, 80);

        let pet_on_b = b.app.use_entity::<Pet>();
        eventually("B observes happiness 80", || {
            pet_on_b.value().map(|p| p.stats.happiness) == Some(80)
        })
        .await;
        assert_eq!(pet_on_b.value().unwrap().updated_at, written.updated_at);
    }

    #[tokio::test]
    async fn test_created_rows_load_on_a_second_instance() {
        let store = Arc::new(InMemoryStore::new());
        let owner = OwnerId::random();
        let a = Device::start(&store).await;
        let (profile, pet) = a.onboard(owner, "first_tab").await;

        let b = Device::start(&store).await;
        b.sign_in(owner).await;
        assert_eq!(b.app.use_entity::<Profile>().value(), Some(profile));
        assert_eq!(b.app.use_entity::<Pet>().value(), Some(pet));
        assert_eq!(b.app.gateway().balance(), Some(100));
    }

    #[tokio::test]
    async fn test_rapid_mutations_persist_in_issue_order() {
        let store = Arc::new(InMemoryStore::new());
        let owner = OwnerId::random();
        let a = Device::start(&store).await;
        a.onboard(owner, "rapid_earner").await;
        let b = Device::start(&store).await;
        b.sign_in(owner).await;

        let gateway = a.app.gateway();
        let earns = (1..=10).map(|i| {
            let gateway = gateway.clone();
            async move { gateway.earn(i, &format!("round_{i}")).await }
        });
        for result in join_all(earns).await {
            result.unwrap();
        }

        let persisted = match store.row(EntityKind::Ledger, owner) {
            Some(EntityRecord::Ledger(ledger)) => ledger,
            other => panic!("expected a ledger row, got {other:?}"),
        };
        assert_eq!(persisted.balance, 100 + 55);
        assert!(persisted.is_consistent());
        let categories: Vec<&str> = persisted.transactions[1..]
            .iter()
            .map(|t| t.category.as_str())
            .collect();
        let issued: Vec<String> = (1..=10).map(|i| format!("round_{i}")).collect();
        assert_eq!(categories, issued);
        assert_eq!(a.app.use_entity::<Ledger>().value(), Some(persisted.clone()));

        let ledger_on_b = b.app.use_entity::<Ledger>();
        eventually("B converges on the final ledger", || {
            ledger_on_b.value().as_ref() == Some(&persisted)
        })
        .await;
    }

    #[tokio::test]
    async fn test_replayed_event_changes_nothing() {
        let store = Arc::new(InMemoryStore::new());
        let owner = OwnerId::random();
        let a = Device::start(&store).await;
        a.onboard(owner, "replayer").await;

        let syncs = a.app.synchronizers();
        let before = syncs.pet.view();
        let pet = before.value.clone().unwrap();
        let event = ChangeEvent::new(ChangeOp::Update, pet.clone().into_record(), pet.updated_at());

        assert_eq!(syncs.pet.apply_change(event.clone()).unwrap(), MergeDecision::Stale);
        assert_eq!(syncs.pet.apply_change(event).unwrap(), MergeDecision::Stale);
        assert_eq!(syncs.pet.view(), before);

        let mut newer = pet.clone();
        newer.stats.energy = 10;
        newer.updated_at = pet.updated_at + 1;
        let event = ChangeEvent::new(ChangeOp::Update, newer.clone().into_record(), newer.updated_at);
        assert_eq!(syncs.pet.apply_change(event.clone()).unwrap(), MergeDecision::Apply);
        let applied = syncs.pet.view();
        assert_eq!(syncs.pet.apply_change(event).unwrap(), MergeDecision::Stale);
        assert_eq!(syncs.pet.view(), applied);
        assert_eq!(applied.value, Some(newer));
    }

    #[tokio::test]
    async fn test_concurrent_writers_converge_on_latest_server_write() {
        let store = Arc::new(InMemoryStore::new());
        let owner = OwnerId::random();
        let a = Device::start(&store).await;
        a.onboard(owner, "tug_of_war").await;
        let b = Device::start(&store).await;
        b.sign_in(owner).await;

        let rename = |name: &str| PetPatch {
            name: Some(name.to_string()),
            ..PetPatch::default()
        };
        let entity_a = a.app.use_entity::<Pet>();
        let entity_b = b.app.use_entity::<Pet>();
        let (from_a, from_b) = tokio::join!(
            entity_a.mutate(rename("Alpha")),
            entity_b.mutate(rename("Bravo")),
        );
        let (from_a, from_b) = (from_a.unwrap(), from_b.unwrap());
        let winner = if from_a.updated_at > from_b.updated_at {
            from_a
        } else {
            from_b
        };

        let pet_a = a.app.use_entity::<Pet>();
        let pet_b = b.app.use_entity::<Pet>();
        eventually("both devices hold the latest write", || {
            pet_a.value().as_ref() == Some(&winner) && pet_b.value().as_ref() == Some(&winner)
        })
        .await;
    }
}
