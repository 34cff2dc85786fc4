//! Split-weapon benchmarks for trion_core.
//!
//! Run with: `cargo bench -p trion_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use trion_core::arena::Arena;
use trion_core::catalog::ItemCatalog;
use trion_core::components::{Hand, TeamId, Transform};
use trion_core::config::TrionConfig;
use trion_core::loadout::{Loadout, LoadoutLedger};
use trion_core::math::Vec3Fixed;

fn armed_arena(characters: i32) -> (Arena, Vec<u64>) {
    let mut arena = Arena::new(TrionConfig::default(), Arc::new(ItemCatalog::standard()));
    let loadout = Loadout::from_ids(&["asteroid"], &["shield"]).expect("fits");
    let ids = (0..characters)
        .map(|i| {
            let id = arena.spawn_character(
                20,
                TeamId(0),
                Transform::at(Vec3Fixed::from_ints(i * 4, 0, 0)),
            );
            arena.equip(id, loadout.clone()).expect("affordable");
            arena.draw(id, Hand::Main, 0).expect("slot 0 filled");
            id
        })
        .collect();
    (arena, ids)
}

/// Full charge, escalate to level 3 and fire for one wielder.
pub fn split_cycle_benchmark(c: &mut Criterion) {
    let (mut arena, ids) = armed_arena(1);
    let id = ids[0];
    c.bench_function("charge_escalate_fire", |b| {
        b.iter(|| {
            arena.charge(id).expect("charge");
            arena.escalate(id).expect("escalate");
            arena.escalate(id).expect("escalate");
            let report = arena.fire(id).expect("fire");
            arena.tick();
            arena.refresh_resources(id).expect("refresh");
            black_box(report)
        })
    });
}

/// Per-tick cube tracking with many charged wielders.
pub fn update_positions_benchmark(c: &mut Criterion) {
    let (mut arena, ids) = armed_arena(64);
    for &id in &ids {
        arena.charge(id).expect("charge");
        arena.escalate(id).expect("escalate");
        arena.escalate(id).expect("escalate");
    }
    c.bench_function("tick_64_charged_level_3", |b| {
        b.iter(|| black_box(arena.tick()))
    });
}

/// Set cost of a full loadout.
pub fn set_cost_benchmark(c: &mut Criterion) {
    let ledger = LoadoutLedger::new(Arc::new(ItemCatalog::standard()));
    let full = Loadout::from_ids(
        &["kogetsu", "asteroid", "meteora", "hound"],
        &["viper", "shield", "bagworm", "grasshopper"],
    )
    .expect("fits");
    c.bench_function("set_cost_full_loadout", |b| {
        b.iter(|| black_box(ledger.set_cost(black_box(&full))))
    });
}

criterion_group!(
    benches,
    split_cycle_benchmark,
    update_positions_benchmark,
    set_cost_benchmark
);
criterion_main!(benches);
