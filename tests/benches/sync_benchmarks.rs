//! # Companion-Sync Benchmarks
//!
//! | Path | Target |
//! |------|--------|
//! | LWW merge decision | < 10ns |
//! | Gate evaluation (all routes × all inputs) | < 10µs |
//! | Stat delta clamping | < 50ns |
//! | Optimistic mutation over the in-memory store | < 100µs |

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use cs_01_session_manager::Existence;
use cs_02_entity_sync::{decide, EntitySyncApi, PetSynchronizer, SessionLink, SyncConfig};
use cs_03_onboarding_gate::{evaluate, GateInput, Route};
use shared_bus::ChangeOp;
use shared_store::{InMemoryStore, PersistentStore};
use shared_types::{Entity, OwnerId, Pet, PetStats, StatDeltas};

fn bench_merge_decision(c: &mut Criterion) {
    c.bench_function("lww_decide", |b| {
        b.iter(|| {
            decide(
                black_box(Some(1_000)),
                black_box(ChangeOp::Update),
                black_box(1_001),
            )
        })
    });
}

fn bench_gate(c: &mut Criterion) {
    let flags = [Existence::Present, Existence::Absent, Existence::Unknown];
    let mut inputs = Vec::new();
    for has_session in [true, false] {
        for has_profile in flags {
            for has_pet in flags {
                inputs.push(GateInput {
                    has_session,
                    loading: false,
                    has_profile,
                    has_pet,
                    transitioning: false,
                });
            }
        }
    }

    c.bench_function("gate_evaluate_all", |b| {
        b.iter(|| {
            for input in &inputs {
                for route in Route::ALL {
                    black_box(evaluate(input, route));
                }
            }
        })
    });
}

fn bench_stat_clamping(c: &mut Criterion) {
    let stats = PetStats::full();
    let mut group = c.benchmark_group("stat_deltas");
    for magnitude in [1, 50, 1_000] {
        let deltas = StatDeltas {
            health: -magnitude,
            hunger: magnitude,
            happiness: -magnitude,
            cleanliness: magnitude,
            energy: -magnitude,
        };
        group.bench_with_input(BenchmarkId::from_parameter(magnitude), &deltas, |b, d| {
            b.iter(|| black_box(stats.with_deltas(d)))
        });
    }
    group.finish();
}

struct NoSession;

#[async_trait::async_trait]
impl SessionLink for NoSession {
    async fn refresh(&self) -> bool {
        true
    }

    async fn signal_unauthorized(&self, _operation: &str) {}
}

fn bench_mutation(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let store = Arc::new(InMemoryStore::new());
    let owner = OwnerId::random();
    let pet = runtime.block_on(async {
        store
            .insert(Pet::hatch(owner, "cat", "tabby", "Bench").into_record())
            .await
            .expect("seed pet");
        let pet: Arc<PetSynchronizer> = PetSynchronizer::new(
            SyncConfig::default(),
            store.clone() as Arc<dyn PersistentStore>,
            Arc::new(NoSession) as Arc<dyn SessionLink>,
        );
        pet.load(owner).await.expect("load pet");
        pet
    });

    let nudge = StatDeltas {
        energy: 1,
        ..StatDeltas::default()
    };
    c.bench_function("pet_stat_delta_roundtrip", |b| {
        b.iter(|| runtime.block_on(async { black_box(pet.apply_stat_delta(nudge).await) }))
    });
}

criterion_group!(
    benches,
    bench_merge_decision,
    bench_gate,
    bench_stat_clamping,
    bench_mutation
);
criterion_main!(benches);
