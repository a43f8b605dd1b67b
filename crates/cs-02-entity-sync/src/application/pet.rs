//! Pet entry points for collaborators.

use shared_types::{Mood, Pet, PetPatch, StatDeltas, SyncError};

use super::synchronizer::EntitySynchronizer;
use crate::ports::EntitySyncApi;

pub type PetSynchronizer = EntitySynchronizer<Pet>;

impl EntitySynchronizer<Pet> {
    /// Add signed deltas to the current stats. Each stat saturates at the
    /// range bounds before the write.
    pub async fn apply_stat_delta(&self, deltas: StatDeltas) -> Result<Pet, SyncError> {
        self.mutate_with("apply_stat_delta", move |pet| {
            Ok(PetPatch {
                stats: Some(pet.stats.with_deltas(&deltas)),
                ..PetPatch::default()
            })
        })
        .await
    }

    /// Mood of the loaded pet.
    #[must_use]
    pub fn mood(&self) -> Option<Mood> {
        self.view().value.map(|pet| pet.mood())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use crate::ports::SessionLink;
    use async_trait::async_trait;
    use proptest::prelude::*;
    use shared_store::{InMemoryStore, PersistentStore};
    use shared_types::{Entity, OwnerId, PetStats, STAT_MAX, STAT_MIN};
    use std::sync::Arc;

    struct NoSession;

    #[async_trait]
    impl SessionLink for NoSession {
        async fn refresh(&self) -> bool {
            true
        }

        async fn signal_unauthorized(&self, _operation: &str) {}
    }

    async fn loaded_pet() -> (Arc<InMemoryStore>, Arc<PetSynchronizer>, OwnerId) {
        let store = Arc::new(InMemoryStore::new());
        let owner = OwnerId::random();
        store
            .insert(Pet::hatch(owner, "cat", "tabby", "Miso").into_record())
            .await
            .unwrap();
        let sync = PetSynchronizer::new(
            SyncConfig::for_testing(),
            Arc::clone(&store) as Arc<dyn PersistentStore>,
            Arc::new(NoSession),
        );
        sync.load(owner).await.unwrap();
        (store, sync, owner)
    }

    #[tokio::test]
    async fn test_overflowing_delta_clamps_before_persisting() {
        let (store, sync, owner) = loaded_pet().await;

        let pet = sync
            .apply_stat_delta(StatDeltas {
                happiness: 500,
                hunger: -500,
                ..StatDeltas::default()
            })
            .await
            .unwrap();

        assert_eq!(pet.stats.happiness, STAT_MAX);
        assert_eq!(pet.stats.hunger, STAT_MIN);
        let stored = Pet::from_record(store.row(Pet::KIND, owner).unwrap()).unwrap();
        assert_eq!(stored.stats, pet.stats);
    }

    #[tokio::test]
    async fn test_concurrent_deltas_accumulate() {
        let (_store, sync, _owner) = loaded_pet().await;
        let start = sync.view().value.unwrap().stats.energy;
        let tired = StatDeltas {
            energy: -10,
            ..StatDeltas::default()
        };

        let (a, b, c) = tokio::join!(
            sync.apply_stat_delta(tired),
            sync.apply_stat_delta(tired),
            sync.apply_stat_delta(tired)
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());

        assert_eq!(sync.view().value.unwrap().stats.energy, start - 30);
    }

    #[tokio::test]
    async fn test_mood_follows_stats() {
        let (_store, sync, _owner) = loaded_pet().await;
        let before = sync.mood().unwrap();

        sync.apply_stat_delta(StatDeltas {
            health: -100,
            hunger: -100,
            happiness: -100,
            cleanliness: -100,
            energy: -100,
        })
        .await
        .unwrap();

        assert_ne!(sync.mood(), Some(before));
        assert_eq!(sync.mood(), Some(PetStats::new(0, 0, 0, 0, 0).mood()));
    }

    #[tokio::test]
    async fn test_extreme_deltas_clamp_at_bounds() {
        let (store, sync, owner) = loaded_pet().await;

        let raised = sync
            .apply_stat_delta(StatDeltas {
                health: i32::MAX,
                hunger: i32::MAX,
                happiness: i32::MAX,
                cleanliness: i32::MAX,
                energy: i32::MAX,
            })
            .await
            .unwrap();
        assert_eq!(raised.stats, PetStats::full());

        let lowered = sync
            .apply_stat_delta(StatDeltas {
                health: i32::MIN,
                hunger: i32::MIN,
                happiness: i32::MIN,
                cleanliness: i32::MIN,
                energy: i32::MIN,
            })
            .await
            .unwrap();
        assert_eq!(lowered.stats, PetStats::new(0, 0, 0, 0, 0));
        let stored = Pet::from_record(store.row(Pet::KIND, owner).unwrap()).unwrap();
        assert_eq!(stored.stats, lowered.stats);
    }

    proptest! {
        #[test]
        fn prop_stats_stay_in_range(
            base in (0i32..=100, 0i32..=100, 0i32..=100, 0i32..=100, 0i32..=100),
            deltas in proptest::collection::vec(
                (any::<i32>(), any::<i32>(), any::<i32>(), any::<i32>(), any::<i32>()),
                1..20,
            ),
        ) {
            let mut pet = Pet::hatch(OwnerId::random(), "cat", "tabby", "Miso");
            pet.stats = PetStats::new(base.0, base.1, base.2, base.3, base.4);
            for (health, hunger, happiness, cleanliness, energy) in deltas {
                let delta = StatDeltas { health, hunger, happiness, cleanliness, energy };
                let patch = PetPatch {
                    stats: Some(pet.stats.with_deltas(&delta)),
                    ..PetPatch::default()
                };
                pet.apply_patch(&patch, 0);
                prop_assert!(pet.stats.in_range());
                prop_assert!(pet.validate().is_ok());
            }
        }
    }
}
