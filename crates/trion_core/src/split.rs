//! Split-projectile controller.
//!
//! A splitting weapon is charged into a floating grid of cubes in front of
//! its wielder, optionally escalated to a denser grid, and fired as one
//! projectile per cube. Total damage does not depend on the level; the
//! level only decides how many pieces it is divided into.
//!
//! ```text
//!            charge                fire
//!   Idle ────────────▶ Charged(1) ───────▶ Idle
//!                        │   ▲
//!               escalate │   │ (L < 3)
//!                        ▼   │
//!                      Charged(L+1)
//! ```
//!
//! The activation cost is paid once, at charge time. Cancelling through
//! [`SplitProjectileController::clear`] never refunds it.
//!
//! # Determinism
//!
//! Per-owner state lives in a `BTreeMap`, so every pass visits owners in ID
//! order, and all geometry is fixed-point.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::ItemId;
use crate::character::Character;
use crate::components::{Component, CubeTag, EntityId, Hand, Transform};
use crate::config::SplitConfig;
use crate::error::TrionError;
use crate::math::{Fixed, Vec3Fixed};
use crate::registry::{EntityRegistry, Orientation, OrientationQuery, ProjectileSpawner, Shot};

/// Split level of a charged weapon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SplitLevel {
    /// 2×2 grid.
    One,
    /// 3×3 grid.
    Two,
    /// 4×4 grid.
    Three,
}

impl SplitLevel {
    /// Cubes per grid row.
    #[must_use]
    pub const fn grid_side(self) -> u8 {
        match self {
            Self::One => 2,
            Self::Two => 3,
            Self::Three => 4,
        }
    }

    /// Number of projectiles one firing produces.
    #[must_use]
    pub const fn split_count(self) -> u32 {
        let side = self.grid_side() as u32;
        side * side
    }

    /// The next level, or `None` at the maximum.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::One => Some(Self::Two),
            Self::Two => Some(Self::Three),
            Self::Three => None,
        }
    }

    /// Level as a number from 1 to 3.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
        }
    }
}

/// Controller state for one charged wielder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitState {
    /// Current split level.
    pub level: SplitLevel,
    /// Whether the cube grid has been spawned.
    pub generated: bool,
    /// Cube entities, in grid index order.
    pub cubes: Vec<EntityId>,
    /// Weapon that was charged.
    pub item: ItemId,
    /// Total damage of one firing.
    pub damage: u32,
}

/// Failure outcomes of the split controller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SplitError {
    /// Neither hand has an item drawn.
    #[error("No item drawn")]
    NoActiveItem,

    /// The drawn items cannot be split.
    #[error("Drawn item {0} is not a splitting weapon")]
    NotSplitWeapon(ItemId),

    /// The balance does not cover the activation cost.
    #[error("Insufficient Trion: need {required}, have {available}")]
    InsufficientTrion {
        /// Activation cost.
        required: u32,
        /// Balance at the time of the attempt.
        available: Fixed,
    },

    /// The entity has no charged weapon.
    #[error("Entity {0} is not charged")]
    NotCharged(EntityId),

    /// The entity is charged but its cubes were never generated.
    #[error("Entity {0} has no generated cubes")]
    NotGenerated(EntityId),

    /// The wielder is gone from the registry or has no transform.
    #[error("Owner entity {0} is missing")]
    OwnerMissing(EntityId),

    /// The registry refused a cube entity.
    #[error(transparent)]
    Registry(#[from] TrionError),
}

/// Successful result of [`SplitProjectileController::charge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeOutcome {
    /// The weapon was charged to level 1.
    Charged {
        /// Trion spent.
        cost: u32,
        /// Cubes spawned.
        cubes: u32,
    },
    /// The weapon was already charged; nothing changed.
    AlreadyCharged {
        /// Level it is charged to.
        level: SplitLevel,
    },
}

/// Successful result of [`SplitProjectileController::escalate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalateOutcome {
    /// Moved up one level.
    Escalated {
        /// New level.
        level: SplitLevel,
        /// Cubes in the new grid.
        cubes: u32,
    },
    /// Already at level 3; nothing changed.
    AlreadyMaximal,
}

/// Summary of one firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FireReport {
    /// Level the weapon was fired at.
    pub level: SplitLevel,
    /// Projectiles emitted.
    pub projectiles: u32,
    /// Damage carried by each projectile.
    pub per_projectile: Fixed,
    /// Total damage of the firing.
    pub total: Fixed,
}

/// Reconciliation performed by [`SplitProjectileController::update_positions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitEvent {
    /// The wielder vanished; its cubes were removed and its state dropped.
    OwnerLost {
        /// Former wielder.
        owner: EntityId,
        /// Cube entities removed.
        cubes_removed: u32,
    },
    /// Cube entities that had disappeared were spawned again.
    CubesRegenerated {
        /// Wielder.
        owner: EntityId,
        /// Cubes respawned.
        count: u32,
    },
}

/// Right/up offsets of every cell of a level's grid, centred on zero.
///
/// Row 0 is the top row; index order is row-major.
fn grid_offsets(level: SplitLevel, spacing: Fixed) -> impl Iterator<Item = (u8, Fixed, Fixed)> {
    let side = level.grid_side();
    let centre = Fixed::from_num(side - 1) / Fixed::from_num(2);
    (0..side * side).map(move |index| {
        let col = Fixed::from_num(index % side);
        let row = Fixed::from_num(index / side);
        (index, (col - centre) * spacing, (centre - row) * spacing)
    })
}

/// Position of the cube at offset (`dx`, `dy`) for a wielder.
fn cube_position(config: &SplitConfig, o: &Orientation, dx: Fixed, dy: Fixed) -> Vec3Fixed {
    o.position
        + o.forward.scale(config.forward_offset)
        + o.up.scale(config.height_offset + dy)
        + o.right.scale(dx)
}

/// Per-entity split weapon lifecycle.
#[derive(Debug, Clone, Default)]
pub struct SplitProjectileController {
    config: SplitConfig,
    states: BTreeMap<EntityId, SplitState>,
}

impl SplitProjectileController {
    /// Create a controller with the given grid geometry.
    #[must_use]
    pub fn new(config: SplitConfig) -> Self {
        Self {
            config,
            states: BTreeMap::new(),
        }
    }

    /// Grid geometry.
    #[must_use]
    pub const fn config(&self) -> &SplitConfig {
        &self.config
    }

    /// State of a charged wielder.
    #[must_use]
    pub fn state(&self, entity: EntityId) -> Option<&SplitState> {
        self.states.get(&entity)
    }

    /// Iterate charged wielders in ID order.
    pub fn states(&self) -> impl Iterator<Item = (&EntityId, &SplitState)> {
        self.states.iter()
    }

    /// Level of a charged wielder.
    #[must_use]
    pub fn level(&self, entity: EntityId) -> Option<SplitLevel> {
        self.states.get(&entity).map(|s| s.level)
    }

    /// Check if `entity` holds a charged weapon.
    #[must_use]
    pub fn is_charged(&self, entity: EntityId) -> bool {
        self.states.contains_key(&entity)
    }

    /// Number of charged wielders.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.states.len()
    }

    /// Charge the drawn splitting weapon of `entity` to level 1.
    ///
    /// The main hand is checked before the sub hand. The activation cost is
    /// taken from `character` only once the cubes exist; any error leaves
    /// both the character and the registry untouched.
    pub fn charge<W>(
        &mut self,
        world: &mut W,
        entity: EntityId,
        character: &mut Character,
    ) -> Result<ChargeOutcome, SplitError>
    where
        W: EntityRegistry + OrientationQuery,
    {
        if let Some(state) = self.states.get(&entity) {
            debug!(entity, level = state.level.number(), "Already charged, ignoring");
            return Ok(ChargeOutcome::AlreadyCharged { level: state.level });
        }

        let orientation = world
            .orientation(entity)
            .ok_or(SplitError::OwnerMissing(entity))?;

        let spec = match character.split_weapon() {
            Some(spec) => spec,
            None => {
                let drawn = Hand::ALL
                    .into_iter()
                    .find_map(|hand| character.loadout().active_item(hand));
                return Err(match drawn {
                    Some(item) => SplitError::NotSplitWeapon(item.clone()),
                    None => SplitError::NoActiveItem,
                });
            }
        };
        let item = spec.id.clone();
        let cost = spec.activation_cost;
        let damage = spec.damage;

        if !character.resources().can_spend(cost) {
            return Err(SplitError::InsufficientTrion {
                required: cost,
                available: character.resources().current(),
            });
        }

        let level = SplitLevel::One;
        let cubes = self.spawn_grid(world, entity, &orientation, level)?;
        let spent = character.resources_mut().spend(cost);
        debug_assert!(spent, "balance checked before spawning");

        debug!(entity, item = %item, cost, cubes = cubes.len(), "Split weapon charged");
        self.states.insert(
            entity,
            SplitState {
                level,
                generated: true,
                cubes,
                item,
                damage,
            },
        );
        Ok(ChargeOutcome::Charged {
            cost,
            cubes: level.split_count(),
        })
    }

    /// Raise a charged weapon one level, respawning its cube grid.
    ///
    /// Costs no Trion.
    pub fn escalate<W>(&mut self, world: &mut W, entity: EntityId) -> Result<EscalateOutcome, SplitError>
    where
        W: EntityRegistry + OrientationQuery,
    {
        let level = self
            .states
            .get(&entity)
            .ok_or(SplitError::NotCharged(entity))?
            .level;
        let Some(next) = level.next() else {
            debug!(entity, "Split level already maximal");
            return Ok(EscalateOutcome::AlreadyMaximal);
        };
        let orientation = world
            .orientation(entity)
            .ok_or(SplitError::OwnerMissing(entity))?;

        let cubes = self.spawn_grid(world, entity, &orientation, next)?;
        if let Some(state) = self.states.get_mut(&entity) {
            for cube in state.cubes.drain(..) {
                world.remove_entity(cube);
            }
            state.cubes = cubes;
            state.level = next;
            state.generated = true;
        }

        debug!(entity, level = next.number(), "Split weapon escalated");
        Ok(EscalateOutcome::Escalated {
            level: next,
            cubes: next.split_count(),
        })
    }

    /// Fire a charged weapon and return the wielder to idle.
    ///
    /// Emits one projectile per cube, each from its grid offset around
    /// `origin` along the wielder's facing. If the wielder is missing the
    /// firing is aborted and the state is left for
    /// [`update_positions`](Self::update_positions) to collect.
    pub fn fire<W, S>(
        &mut self,
        world: &mut W,
        spawner: &mut S,
        entity: EntityId,
        character: &Character,
        origin: Vec3Fixed,
    ) -> Result<FireReport, SplitError>
    where
        W: EntityRegistry + OrientationQuery,
        S: ProjectileSpawner,
    {
        let state = self.states.get(&entity).ok_or(SplitError::NotCharged(entity))?;
        if !state.generated {
            return Err(SplitError::NotGenerated(entity));
        }
        let orientation = world
            .orientation(entity)
            .ok_or(SplitError::OwnerMissing(entity))?;

        let level = state.level;
        let count = level.split_count();
        let total = Fixed::saturating_from_num(state.damage);
        let per_projectile = total / Fixed::from_num(count);

        for (_, dx, dy) in grid_offsets(level, self.config.cube_spacing) {
            spawner.fire_one(Shot {
                origin: origin + orientation.right.scale(dx) + orientation.up.scale(dy),
                heading: orientation.forward,
                damage: per_projectile,
                owner: entity,
                owner_team: character.team(),
            });
        }

        if let Some(state) = self.states.remove(&entity) {
            for cube in state.cubes {
                world.remove_entity(cube);
            }
        }

        debug!(
            entity,
            level = level.number(),
            projectiles = count,
            per_projectile = %per_projectile,
            "Split weapon fired"
        );
        Ok(FireReport {
            level,
            projectiles: count,
            per_projectile,
            total,
        })
    }

    /// Move every cube grid to follow its wielder.
    ///
    /// Wielders that vanished lose their state and cubes. Cube entities that
    /// disappeared are spawned again.
    pub fn update_positions<W>(&mut self, world: &mut W) -> Vec<SplitEvent>
    where
        W: EntityRegistry + OrientationQuery,
    {
        let mut events = Vec::new();
        let mut lost = Vec::new();
        let spacing = self.config.cube_spacing;

        for (&owner, state) in &mut self.states {
            let Some(orientation) = world.orientation(owner) else {
                let mut removed = 0;
                for &cube in &state.cubes {
                    if world.remove_entity(cube) {
                        removed += 1;
                    }
                }
                debug!(owner, removed, "Wielder gone, dropping split state");
                lost.push(owner);
                events.push(SplitEvent::OwnerLost {
                    owner,
                    cubes_removed: removed,
                });
                continue;
            };

            let mut regenerated = 0;
            for (index, dx, dy) in grid_offsets(state.level, spacing) {
                let transform = Transform {
                    position: cube_position(&self.config, &orientation, dx, dy),
                    forward: orientation.forward,
                    up: orientation.up,
                };
                let slot = usize::from(index);
                let alive = state
                    .cubes
                    .get(slot)
                    .is_some_and(|&cube| world.contains(cube));

                if alive {
                    if let Err(err) = world.attach(state.cubes[slot], Component::Transform(transform)) {
                        warn!(owner, %err, "Failed to move cube");
                    }
                    continue;
                }

                let cube = world.create_entity();
                let attached = world
                    .attach(cube, Component::Cube(CubeTag { owner, index }))
                    .and_then(|()| world.attach(cube, Component::Transform(transform)));
                if let Err(err) = attached {
                    warn!(owner, %err, "Failed to regenerate cube");
                    world.remove_entity(cube);
                    continue;
                }
                if slot < state.cubes.len() {
                    state.cubes[slot] = cube;
                } else {
                    state.cubes.push(cube);
                }
                regenerated += 1;
            }

            if regenerated > 0 {
                debug!(owner, regenerated, "Missing cubes regenerated");
                state.generated = true;
                events.push(SplitEvent::CubesRegenerated {
                    owner,
                    count: regenerated,
                });
            }
        }

        for owner in lost {
            self.states.remove(&owner);
        }
        events
    }

    /// Drop the state and cubes of `entity` without firing.
    ///
    /// Safe when idle. The activation cost is not refunded. Returns true if
    /// the entity was charged.
    pub fn clear<W: EntityRegistry>(&mut self, world: &mut W, entity: EntityId) -> bool {
        let Some(state) = self.states.remove(&entity) else {
            return false;
        };
        for cube in state.cubes {
            world.remove_entity(cube);
        }
        debug!(entity, "Split state cleared");
        true
    }

    /// Clear every wielder, returning how many were charged.
    pub fn destroy_all<W: EntityRegistry>(&mut self, world: &mut W) -> usize {
        let states = std::mem::take(&mut self.states);
        let count = states.len();
        for cube in states.into_values().flat_map(|s| s.cubes) {
            world.remove_entity(cube);
        }
        if count > 0 {
            debug!(count, "All split states destroyed");
        }
        count
    }

    fn spawn_grid<W: EntityRegistry>(
        &self,
        world: &mut W,
        owner: EntityId,
        orientation: &Orientation,
        level: SplitLevel,
    ) -> Result<Vec<EntityId>, SplitError> {
        let mut cubes = Vec::with_capacity(level.split_count() as usize);
        for (index, dx, dy) in grid_offsets(level, self.config.cube_spacing) {
            let cube = world.create_entity();
            cubes.push(cube);
            let transform = Transform {
                position: cube_position(&self.config, orientation, dx, dy),
                forward: orientation.forward,
                up: orientation.up,
            };
            let attached = world
                .attach(cube, Component::Cube(CubeTag { owner, index }))
                .and_then(|()| world.attach(cube, Component::Transform(transform)));
            if let Err(err) = attached {
                for cube in cubes {
                    world.remove_entity(cube);
                }
                return Err(err.into());
            }
        }
        Ok(cubes)
    }
}
