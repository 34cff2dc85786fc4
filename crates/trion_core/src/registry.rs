//! Entity storage and the collaborator interfaces the split controller uses.
//!
//! The controller never owns the world. It reaches it through three narrow
//! traits:
//!
//! - [`EntityRegistry`]: create and remove entities, attach components
//! - [`OrientationQuery`]: read a wielder's position and facing
//! - [`ProjectileSpawner`]: emit one projectile per split unit
//!
//! [`EntityStorage`] is the in-memory implementation used by
//! [`Arena`](crate::arena::Arena), the headless runner and the tests.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::components::{
    Component, ComponentKind, CubeTag, EntityId, ProjectileTag, TeamId, Transform,
};
use crate::error::{Result, TrionError};
use crate::math::{Fixed, Vec3Fixed};

/// Create, query and remove entities and their components.
pub trait EntityRegistry {
    /// Create an entity with no components.
    fn create_entity(&mut self) -> EntityId;

    /// Remove an entity. Returns false if it did not exist.
    fn remove_entity(&mut self, id: EntityId) -> bool;

    /// Check if an entity exists.
    fn contains(&self, id: EntityId) -> bool;

    /// Attach a component, replacing any component of the same kind.
    fn attach(&mut self, id: EntityId, component: Component) -> Result<()>;

    /// Read a component.
    fn get(&self, id: EntityId, kind: ComponentKind) -> Option<Component>;

    /// Remove a component, returning it.
    fn detach(&mut self, id: EntityId, kind: ComponentKind) -> Option<Component>;
}

/// Position and basis vectors of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Orientation {
    /// World position.
    pub position: Vec3Fixed,
    /// Facing direction.
    pub forward: Vec3Fixed,
    /// Sideways direction, `forward × up`.
    pub right: Vec3Fixed,
    /// Up direction.
    pub up: Vec3Fixed,
}

impl Orientation {
    /// Derive an orthonormal basis from a transform.
    ///
    /// A transform whose `up` is parallel to its `forward` still yields a
    /// non-degenerate right/up pair.
    #[must_use]
    pub fn from_transform(transform: &Transform) -> Self {
        let (right, up) = Vec3Fixed::orthonormal_basis(transform.forward, transform.up);
        Self {
            position: transform.position,
            forward: transform.forward,
            right,
            up,
        }
    }
}

/// Read-only orientation lookup.
pub trait OrientationQuery {
    /// Orientation of `id`, or `None` if it has no transform.
    fn orientation(&self, id: EntityId) -> Option<Orientation>;
}

/// One emitted projectile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shot {
    /// Spawn point.
    pub origin: Vec3Fixed,
    /// Travel direction.
    pub heading: Vec3Fixed,
    /// Damage dealt on impact.
    #[serde(with = "crate::math::fixed_serde")]
    pub damage: Fixed,
    /// Entity that fired.
    pub owner: EntityId,
    /// Team of the entity that fired.
    pub owner_team: TeamId,
}

/// Sink for projectiles.
pub trait ProjectileSpawner {
    /// Emit one projectile.
    fn fire_one(&mut self, shot: Shot);
}

impl ProjectileSpawner for Vec<Shot> {
    fn fire_one(&mut self, shot: Shot) {
        self.push(shot);
    }
}

/// An entity with optional components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier for this entity.
    pub id: EntityId,
    /// World transform.
    pub transform: Option<Transform>,
    /// Charge cube marker.
    pub cube: Option<CubeTag>,
    /// Projectile data for projectile entities.
    pub projectile: Option<ProjectileTag>,
}

impl Entity {
    /// Create a new entity with the given ID and no components.
    #[must_use]
    pub const fn new(id: EntityId) -> Self {
        Self {
            id,
            transform: None,
            cube: None,
            projectile: None,
        }
    }

    /// Check if this entity carries a component of `kind`.
    #[must_use]
    pub const fn has(&self, kind: ComponentKind) -> bool {
        match kind {
            ComponentKind::Transform => self.transform.is_some(),
            ComponentKind::Cube => self.cube.is_some(),
            ComponentKind::Projectile => self.projectile.is_some(),
        }
    }
}

/// Storage for all entities in a session.
///
/// Uses a `HashMap` for O(1) entity lookup by ID, with deterministic
/// iteration via sorted keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityStorage {
    entities: HashMap<EntityId, Entity>,
    next_id: EntityId,
}

impl EntityStorage {
    /// Create empty entity storage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: HashMap::new(),
            next_id: 1,
        }
    }

    /// Insert a new entity and return its ID.
    pub fn insert(&mut self, mut entity: Entity) -> EntityId {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        entity.id = id;
        self.entities.insert(id, entity);
        id
    }

    /// Remove an entity by ID.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    /// Get an entity by ID.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Get a mutable reference to an entity by ID.
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Get the number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Get sorted entity IDs for deterministic iteration.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<_> = self.entities.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Iterate over all entities (not in deterministic order).
    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &Entity)> {
        self.entities.iter()
    }

    /// Number of entities carrying a component of `kind`.
    #[must_use]
    pub fn count_with(&self, kind: ComponentKind) -> usize {
        self.entities.values().filter(|e| e.has(kind)).count()
    }

    /// Sorted IDs of the cube entities owned by `owner`.
    #[must_use]
    pub fn cubes_of(&self, owner: EntityId) -> Vec<EntityId> {
        let mut ids: Vec<_> = self
            .entities
            .values()
            .filter(|e| e.cube.is_some_and(|c| c.owner == owner))
            .map(|e| e.id)
            .collect();
        ids.sort_unstable();
        ids
    }
}

impl EntityRegistry for EntityStorage {
    fn create_entity(&mut self) -> EntityId {
        self.insert(Entity::new(0))
    }

    fn remove_entity(&mut self, id: EntityId) -> bool {
        self.remove(id).is_some()
    }

    fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    fn attach(&mut self, id: EntityId, component: Component) -> Result<()> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(TrionError::EntityNotFound(id))?;
        match component {
            Component::Transform(t) => entity.transform = Some(t),
            Component::Cube(c) => entity.cube = Some(c),
            Component::Projectile(p) => entity.projectile = Some(p),
        }
        Ok(())
    }

    fn get(&self, id: EntityId, kind: ComponentKind) -> Option<Component> {
        let entity = self.entities.get(&id)?;
        match kind {
            ComponentKind::Transform => entity.transform.map(Component::Transform),
            ComponentKind::Cube => entity.cube.map(Component::Cube),
            ComponentKind::Projectile => entity.projectile.map(Component::Projectile),
        }
    }

    fn detach(&mut self, id: EntityId, kind: ComponentKind) -> Option<Component> {
        let entity = self.entities.get_mut(&id)?;
        match kind {
            ComponentKind::Transform => entity.transform.take().map(Component::Transform),
            ComponentKind::Cube => entity.cube.take().map(Component::Cube),
            ComponentKind::Projectile => entity.projectile.take().map(Component::Projectile),
        }
    }
}

impl OrientationQuery for EntityStorage {
    fn orientation(&self, id: EntityId) -> Option<Orientation> {
        self.entities
            .get(&id)?
            .transform
            .as_ref()
            .map(Orientation::from_transform)
    }
}

impl ProjectileSpawner for EntityStorage {
    fn fire_one(&mut self, shot: Shot) {
        let mut entity = Entity::new(0);
        entity.transform = Some(Transform::facing(shot.origin, shot.heading));
        entity.projectile = Some(ProjectileTag {
            source: shot.owner,
            team: shot.owner_team,
            damage: shot.damage,
            heading: shot.heading,
        });
        let id = self.insert(entity);
        debug!(id, owner = shot.owner, damage = %shot.damage, "Projectile spawned");
    }
}
