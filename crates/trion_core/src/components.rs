//! Component definitions.
//!
//! Components are pure data with no behavior. Characters, split cubes and
//! in-flight projectiles are all composed of these.

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, Fixed, Vec3Fixed};

/// Unique identifier for entities.
pub type EntityId = u64;

/// Team a character fights for. Shots carry it so hits can skip allies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct TeamId(pub u8);

/// World transform of an entity.
///
/// `forward` and `up` are kept normalized by the constructors; the right
/// vector is derived when an orientation is queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transform {
    /// World position.
    pub position: Vec3Fixed,
    /// Facing direction.
    pub forward: Vec3Fixed,
    /// Up direction.
    pub up: Vec3Fixed,
}

impl Transform {
    /// Transform at `position` facing the default forward axis.
    #[must_use]
    pub const fn at(position: Vec3Fixed) -> Self {
        Self {
            position,
            forward: Vec3Fixed::FORWARD,
            up: Vec3Fixed::UP,
        }
    }

    /// Transform at `position` facing `forward`, with `up` as close to world
    /// up as the facing allows.
    ///
    /// A zero `forward` falls back to the default facing.
    #[must_use]
    pub fn facing(position: Vec3Fixed, forward: Vec3Fixed) -> Self {
        let forward = forward.normalize();
        let forward = if forward.is_zero() {
            Vec3Fixed::FORWARD
        } else {
            forward
        };
        let (_, up) = Vec3Fixed::orthonormal_basis(forward, Vec3Fixed::UP);
        Self {
            position,
            forward,
            up,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::at(Vec3Fixed::ZERO)
    }
}

/// Marks an entity as one of the charge cubes visualizing a split weapon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CubeTag {
    /// Character wielding the charged weapon.
    pub owner: EntityId,
    /// Row-major index inside the split grid.
    pub index: u8,
}

/// A projectile emitted by a firing action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectileTag {
    /// Entity that fired this projectile.
    pub source: EntityId,
    /// Team of the firing entity.
    pub team: TeamId,
    /// Damage to deal on impact.
    #[serde(with = "fixed_serde")]
    pub damage: Fixed,
    /// Travel direction.
    pub heading: Vec3Fixed,
}

/// A component value that can be attached to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Component {
    /// World transform.
    Transform(Transform),
    /// Charge cube marker.
    Cube(CubeTag),
    /// In-flight projectile.
    Projectile(ProjectileTag),
}

impl Component {
    /// The kind of this component.
    #[must_use]
    pub const fn kind(&self) -> ComponentKind {
        match self {
            Self::Transform(_) => ComponentKind::Transform,
            Self::Cube(_) => ComponentKind::Cube,
            Self::Projectile(_) => ComponentKind::Projectile,
        }
    }
}

/// Component slot selector used by registry lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    /// [`Component::Transform`].
    Transform,
    /// [`Component::Cube`].
    Cube,
    /// [`Component::Projectile`].
    Projectile,
}

/// Which hand an item is drawn into.
///
/// The main hand draws from the primary slot group, the sub hand from the
/// secondary group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hand {
    /// Right hand, primary slots.
    Main,
    /// Left hand, secondary slots.
    Sub,
}

impl Hand {
    /// Both hands in lookup priority order.
    pub const ALL: [Hand; 2] = [Hand::Main, Hand::Sub];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facing_normalizes() {
        let t = Transform::facing(Vec3Fixed::ZERO, Vec3Fixed::from_ints(0, 0, 5));
        assert_eq!(t.forward, Vec3Fixed::FORWARD);
    }

    #[test]
    fn test_facing_zero_falls_back() {
        let t = Transform::facing(Vec3Fixed::ZERO, Vec3Fixed::ZERO);
        assert_eq!(t.forward, Vec3Fixed::FORWARD);
    }

    #[test]
    fn test_facing_straight_up_keeps_up_orthogonal() {
        let t = Transform::facing(Vec3Fixed::ZERO, Vec3Fixed::from_ints(0, 3, 0));
        assert_eq!(t.forward, Vec3Fixed::UP);
        assert_eq!(t.up, Vec3Fixed::FORWARD);
    }

    #[test]
    fn test_facing_long_vector() {
        let t = Transform::facing(Vec3Fixed::ZERO, Vec3Fixed::from_ints(70_000, 0, 0));
        assert_eq!(t.forward, Vec3Fixed::from_ints(1, 0, 0));
        assert_eq!(t.up, Vec3Fixed::UP);
    }

    #[test]
    fn test_component_kind() {
        let c = Component::Cube(CubeTag { owner: 1, index: 0 });
        assert_eq!(c.kind(), ComponentKind::Cube);
    }
}
