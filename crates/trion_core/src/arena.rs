//! Frame-driven battle session.
//!
//! The arena owns the entity storage, every character and the split
//! controller, and runs the controller's per-tick reconciliation.
//!
//! # Determinism
//!
//! - No floating-point math in state transitions
//! - Characters and split states live in `BTreeMap`s
//! - Entities are visited in sorted ID order when hashing
//!
//! Two arenas fed the same calls produce the same [`Arena::state_hash`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use trion_core::arena::Arena;
//! use trion_core::catalog::ItemCatalog;
//! use trion_core::components::{Hand, TeamId, Transform};
//! use trion_core::config::TrionConfig;
//! use trion_core::loadout::Loadout;
//!
//! let mut arena = Arena::new(TrionConfig::default(), Arc::new(ItemCatalog::standard()));
//! let id = arena.spawn_character(5, TeamId(1), Transform::default());
//! arena.equip(id, Loadout::from_ids(&["asteroid"], &[]).unwrap()).unwrap();
//! arena.draw(id, Hand::Main, 0).unwrap();
//! arena.charge(id).unwrap();
//! let report = arena.fire(id).unwrap();
//! assert_eq!(report.projectiles, 4);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tracing::{debug, info};

use crate::capacity::CapacityModel;
use crate::catalog::{ItemCatalog, ItemId};
use crate::character::Character;
use crate::components::{Component, ComponentKind, EntityId, Hand, TeamId, Transform};
use crate::config::TrionConfig;
use crate::error::{Result, TrionError};
use crate::ledger::ResourceLedger;
use crate::loadout::Loadout;
use crate::math::Fixed;
use crate::registry::{Entity, EntityRegistry, EntityStorage, OrientationQuery, ProjectileSpawner, Shot};
use crate::split::{
    ChargeOutcome, EscalateOutcome, FireReport, SplitError, SplitEvent, SplitProjectileController,
};

/// Events generated during an arena tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickEvents {
    /// Tick number after advancing.
    pub tick: u64,
    /// Split controller reconciliation.
    pub split_events: Vec<SplitEvent>,
    /// Shots fired since the previous tick.
    pub shots: Vec<Shot>,
    /// Characters that ran out of Trion since the previous tick.
    pub defeated: Vec<EntityId>,
}

/// A battle session.
#[derive(Debug, Clone)]
pub struct Arena {
    tick: u64,
    model: CapacityModel,
    catalog: Arc<ItemCatalog>,
    entities: EntityStorage,
    characters: BTreeMap<EntityId, Character>,
    controller: SplitProjectileController,
    pending_shots: Vec<Shot>,
    pending_defeats: Vec<EntityId>,
}

impl Arena {
    /// Create an empty arena.
    #[must_use]
    pub fn new(config: TrionConfig, catalog: Arc<ItemCatalog>) -> Self {
        Self {
            tick: 0,
            model: CapacityModel::new(config.capacity),
            catalog,
            entities: EntityStorage::new(),
            characters: BTreeMap::new(),
            controller: SplitProjectileController::new(config.split),
            pending_shots: Vec::new(),
            pending_defeats: Vec::new(),
        }
    }

    /// Current tick number.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Capacity model characters are created with.
    #[must_use]
    pub const fn model(&self) -> &CapacityModel {
        &self.model
    }

    /// Shared item catalog.
    #[must_use]
    pub fn catalog(&self) -> &Arc<ItemCatalog> {
        &self.catalog
    }

    /// Entity storage.
    #[must_use]
    pub fn entities(&self) -> &EntityStorage {
        &self.entities
    }

    /// Split controller.
    #[must_use]
    pub fn controller(&self) -> &SplitProjectileController {
        &self.controller
    }

    /// A character by entity ID.
    #[must_use]
    pub fn character(&self, id: EntityId) -> Option<&Character> {
        self.characters.get(&id)
    }

    /// Iterate characters in ID order.
    pub fn characters(&self) -> impl Iterator<Item = (&EntityId, &Character)> {
        self.characters.iter()
    }

    fn character_mut(&mut self, id: EntityId) -> Result<&mut Character> {
        self.characters
            .get_mut(&id)
            .ok_or(TrionError::EntityNotFound(id))
    }

    /// Spawn a character entity at full Trion.
    pub fn spawn_character(&mut self, attribute: i32, team: TeamId, transform: Transform) -> EntityId {
        let mut entity = Entity::new(0);
        entity.transform = Some(transform);
        let id = self.entities.insert(entity);
        let character = Character::new(&self.model, attribute, team, Arc::clone(&self.catalog));
        info!(
            id,
            attribute,
            team = team.0,
            capacity = character.resources().capacity(),
            "Character spawned"
        );
        self.characters.insert(id, character);
        id
    }

    /// Remove a character, its entity and any charged weapon.
    pub fn despawn_character(&mut self, id: EntityId) -> Result<()> {
        if self.characters.remove(&id).is_none() {
            return Err(TrionError::EntityNotFound(id));
        }
        self.controller.clear(&mut self.entities, id);
        self.entities.remove_entity(id);
        info!(id, "Character despawned");
        Ok(())
    }

    /// Equip a loadout, returning the cost locked.
    pub fn equip(&mut self, id: EntityId, loadout: Loadout) -> Result<u32> {
        self.character_mut(id)?.equip(loadout)
    }

    /// Draw the item in `slot` of `hand`.
    pub fn draw(&mut self, id: EntityId, hand: Hand, slot: usize) -> Result<ItemId> {
        self.character_mut(id)?.draw(hand, slot).cloned()
    }

    /// Put away whatever `hand` holds.
    pub fn holster(&mut self, id: EntityId, hand: Hand) -> Result<Option<ItemId>> {
        Ok(self.character_mut(id)?.holster(hand))
    }

    /// Give a character a fresh resource record from its attribute.
    ///
    /// The loadout is re-applied against the new record.
    pub fn refresh_resources(&mut self, id: EntityId) -> Result<u32> {
        let model = self.model;
        let character = self.character_mut(id)?;
        let fresh = ResourceLedger::from_attribute(&model, character.attribute());
        character.replace_resources(fresh)
    }

    /// Move or turn an entity.
    pub fn set_transform(&mut self, id: EntityId, transform: Transform) -> Result<()> {
        self.entities.attach(id, Component::Transform(transform))
    }

    /// Charge the drawn splitting weapon of a character.
    pub fn charge(&mut self, id: EntityId) -> std::result::Result<ChargeOutcome, SplitError> {
        let character = self
            .characters
            .get_mut(&id)
            .ok_or(SplitError::OwnerMissing(id))?;
        self.controller.charge(&mut self.entities, id, character)
    }

    /// Escalate a charged weapon.
    pub fn escalate(&mut self, id: EntityId) -> std::result::Result<EscalateOutcome, SplitError> {
        self.controller.escalate(&mut self.entities, id)
    }

    /// Fire a charged weapon from the centre of its cube grid.
    ///
    /// Shots become projectile entities until the next tick hands them off.
    pub fn fire(&mut self, id: EntityId) -> std::result::Result<FireReport, SplitError> {
        let character = self.characters.get(&id).ok_or(SplitError::OwnerMissing(id))?;
        let orientation = self
            .entities
            .orientation(id)
            .ok_or(SplitError::OwnerMissing(id))?;
        let config = self.controller.config();
        let origin = orientation.position
            + orientation.forward.scale(config.forward_offset)
            + orientation.up.scale(config.height_offset);

        let mut shots: Vec<Shot> = Vec::new();
        let report = self
            .controller
            .fire(&mut self.entities, &mut shots, id, character, origin)?;
        for shot in shots {
            self.entities.fire_one(shot);
            self.pending_shots.push(shot);
        }
        Ok(report)
    }

    /// Cancel a charged weapon without firing. The activation cost is kept.
    pub fn cancel(&mut self, id: EntityId) -> bool {
        self.controller.clear(&mut self.entities, id)
    }

    /// Damage a character, returning the amount removed.
    pub fn apply_hit(&mut self, target: EntityId, amount: Fixed) -> Result<Fixed> {
        let character = self.character_mut(target)?;
        let was_defeated = character.is_defeated();
        let removed = character.resources_mut().apply_damage(amount);
        if !was_defeated && character.is_defeated() {
            info!(target, "Character defeated");
            self.pending_defeats.push(target);
        }
        Ok(removed)
    }

    /// Restore Trion to a character, returning the amount added.
    pub fn heal(&mut self, target: EntityId, amount: Fixed) -> Result<Fixed> {
        Ok(self.character_mut(target)?.resources_mut().heal(amount))
    }

    /// Advance one tick.
    ///
    /// Cube grids follow their wielders, and projectiles fired since the
    /// last tick are handed off: their entities are removed and their shots
    /// reported.
    pub fn tick(&mut self) -> TickEvents {
        self.tick += 1;
        let split_events = self.controller.update_positions(&mut self.entities);

        let projectiles: Vec<EntityId> = self
            .entities
            .sorted_ids()
            .into_iter()
            .filter(|&id| self.entities.get(id, ComponentKind::Projectile).is_some())
            .collect();
        for id in &projectiles {
            self.entities.remove_entity(*id);
        }
        if !projectiles.is_empty() {
            debug!(tick = self.tick, count = projectiles.len(), "Projectiles handed off");
        }

        TickEvents {
            tick: self.tick,
            split_events,
            shots: std::mem::take(&mut self.pending_shots),
            defeated: std::mem::take(&mut self.pending_defeats),
        }
    }

    /// Tear down every charged weapon.
    pub fn clear_all(&mut self) -> usize {
        self.controller.destroy_all(&mut self.entities)
    }

    /// Hash of the observable session state.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);

        let ids = self.entities.sorted_ids();
        ids.len().hash(&mut hasher);
        for id in ids {
            if let Some(entity) = self.entities.entity(id) {
                id.hash(&mut hasher);
                if let Some(ref t) = entity.transform {
                    t.position.hash(&mut hasher);
                    t.forward.hash(&mut hasher);
                }
                if let Some(ref cube) = entity.cube {
                    cube.owner.hash(&mut hasher);
                    cube.index.hash(&mut hasher);
                }
                if let Some(ref p) = entity.projectile {
                    p.source.hash(&mut hasher);
                    p.damage.to_bits().hash(&mut hasher);
                }
            }
        }

        for (id, character) in &self.characters {
            id.hash(&mut hasher);
            let res = character.resources();
            res.capacity().hash(&mut hasher);
            res.locked().hash(&mut hasher);
            res.current().to_bits().hash(&mut hasher);
            character.loadout().loadout().hash(&mut hasher);
            for hand in Hand::ALL {
                character.loadout().active_item(hand).hash(&mut hasher);
            }
        }

        for (id, state) in self.controller.states() {
            id.hash(&mut hasher);
            state.level.hash(&mut hasher);
            state.cubes.hash(&mut hasher);
        }

        hasher.finish()
    }
}
