//! Test fixtures and helpers.
//!
//! Pre-built catalogs, characters and arenas for consistent testing.

use std::sync::Arc;

use fixed::types::I32F32;
use trion_core::arena::Arena;
use trion_core::capacity::CapacityModel;
use trion_core::catalog::ItemCatalog;
use trion_core::character::Character;
use trion_core::components::{EntityId, Hand, TeamId, Transform};
use trion_core::config::TrionConfig;
use trion_core::loadout::Loadout;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// The built-in catalog, shared.
#[must_use]
pub fn standard_catalog() -> Arc<ItemCatalog> {
    Arc::new(ItemCatalog::standard())
}

/// Every standard item id with its set cost, in catalog order.
#[must_use]
pub fn standard_item_costs() -> Vec<(String, u32)> {
    ItemCatalog::standard()
        .iter()
        .map(|spec| (spec.id.to_string(), spec.set_cost))
        .collect()
}

/// A character with the default capacity model and an empty loadout.
#[must_use]
pub fn character(attribute: i32) -> Character {
    Character::new(&CapacityModel::default(), attribute, TeamId(1), standard_catalog())
}

/// Asteroid in the first primary slot, shield in the first secondary slot.
///
/// # Panics
///
/// Never; the id lists fit the slot groups.
#[must_use]
pub fn asteroid_loadout() -> Loadout {
    Loadout::from_ids(&["asteroid"], &["shield"]).expect("two ids fit")
}

/// An arena with one character that has Asteroid equipped and drawn.
///
/// # Panics
///
/// Panics if the attribute is too low to afford the loadout (24).
#[must_use]
pub fn armed_arena(attribute: i32) -> (Arena, EntityId) {
    let mut arena = Arena::new(TrionConfig::default(), standard_catalog());
    let id = arena.spawn_character(attribute, TeamId(1), Transform::default());
    arena
        .equip(id, asteroid_loadout())
        .expect("attribute too low for the asteroid loadout");
    arena.draw(id, Hand::Main, 0).expect("asteroid is in slot 0");
    (arena, id)
}
