//! A combatant: Trion attribute, team, resource record and loadout.

use std::sync::Arc;

use tracing::warn;

use crate::capacity::CapacityModel;
use crate::catalog::{ItemCatalog, ItemId, ItemSpec};
use crate::components::{Hand, TeamId};
use crate::error::{Result, TrionError};
use crate::ledger::ResourceLedger;
use crate::loadout::{Loadout, LoadoutLedger};

/// One character's exclusively owned combat state.
#[derive(Debug, Clone)]
pub struct Character {
    attribute: i32,
    team: TeamId,
    resources: ResourceLedger,
    loadout: LoadoutLedger,
}

impl Character {
    /// Create a character at full Trion with an empty loadout.
    #[must_use]
    pub fn new(model: &CapacityModel, attribute: i32, team: TeamId, catalog: Arc<ItemCatalog>) -> Self {
        Self {
            attribute,
            team,
            resources: ResourceLedger::from_attribute(model, attribute),
            loadout: LoadoutLedger::new(catalog),
        }
    }

    /// Trion attribute the capacity was derived from.
    #[must_use]
    pub const fn attribute(&self) -> i32 {
        self.attribute
    }

    /// Team this character fights for.
    #[must_use]
    pub const fn team(&self) -> TeamId {
        self.team
    }

    /// Resource record.
    #[must_use]
    pub const fn resources(&self) -> &ResourceLedger {
        &self.resources
    }

    /// Mutable resource record, for damage, heals and spending.
    pub fn resources_mut(&mut self) -> &mut ResourceLedger {
        &mut self.resources
    }

    /// Loadout ledger.
    #[must_use]
    pub const fn loadout(&self) -> &LoadoutLedger {
        &self.loadout
    }

    /// Check affordability, then swap in `loadout`.
    ///
    /// Returns the cost locked. Fails with
    /// [`TrionError::InsufficientCapacity`] without mutating anything when
    /// the loadout does not fit once the current one is refunded.
    pub fn equip(&mut self, loadout: Loadout) -> Result<u32> {
        let cost = self.loadout.set_cost(&loadout)?;
        let available = self.loadout.available_capacity(&self.resources);
        if cost > available {
            return Err(TrionError::InsufficientCapacity {
                required: cost,
                available,
            });
        }
        self.loadout.apply_loadout(&mut self.resources, loadout)
    }

    /// Replace the resource record wholesale and re-apply the loadout.
    ///
    /// The old lock left with the old record, so it is forgotten rather than
    /// refunded. If the loadout no longer fits the new record, it is
    /// unequipped and the shortfall is returned as an error.
    pub fn replace_resources(&mut self, resources: ResourceLedger) -> Result<u32> {
        self.resources = resources;
        self.loadout.forget_lock();

        let loadout = self.loadout.loadout().clone();
        let cost = self.loadout.set_cost(&loadout)?;
        let available = self.resources.capacity();
        if cost > available {
            warn!(
                cost,
                available, "Loadout no longer fits replaced resources, unequipping"
            );
            self.loadout.apply_loadout(&mut self.resources, Loadout::new())?;
            return Err(TrionError::InsufficientCapacity {
                required: cost,
                available,
            });
        }
        self.loadout.apply_loadout(&mut self.resources, loadout)
    }

    /// Draw the item in `slot` of `hand`'s group.
    pub fn draw(&mut self, hand: Hand, slot: usize) -> Result<&ItemId> {
        self.loadout.draw(hand, slot)
    }

    /// Put away whatever `hand` holds.
    pub fn holster(&mut self, hand: Hand) -> Option<ItemId> {
        self.loadout.holster(hand)
    }

    /// First drawn splitting weapon, main hand before sub hand.
    #[must_use]
    pub fn split_weapon(&self) -> Option<&ItemSpec> {
        Hand::ALL
            .into_iter()
            .filter_map(|hand| self.loadout.active_spec(hand))
            .find(|spec| spec.category.is_splitting())
    }

    /// Check if the character is out of Trion.
    #[must_use]
    pub fn is_defeated(&self) -> bool {
        self.resources.is_defeated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Fixed;

    fn character(attr: i32) -> Character {
        Character::new(
            &CapacityModel::default(),
            attr,
            TeamId(1),
            Arc::new(ItemCatalog::standard()),
        )
    }

    #[test]
    fn test_new_uses_capacity_model() {
        let c = character(5);
        assert_eq!(c.resources().capacity(), 475);
        assert_eq!(c.resources().current(), Fixed::from_num(475));
    }

    #[test]
    fn test_equip_rejects_unaffordable_without_mutation() {
        // capacity(2) = 30
        let mut c = character(2);
        let heavy = Loadout::from_ids(&["kogetsu", "meteora"], &[]).unwrap();
        let err = c.equip(heavy).unwrap_err();
        assert_eq!(
            err,
            TrionError::InsufficientCapacity {
                required: 38,
                available: 30,
            }
        );
        assert_eq!(c.resources().capacity(), 30);
        assert!(c.loadout().locked_cost().is_none());
    }

    #[test]
    fn test_equip_swap_can_use_refunded_capacity() {
        let mut c = character(2);
        c.equip(Loadout::from_ids(&["kogetsu"], &[]).unwrap()).unwrap();
        assert_eq!(c.resources().capacity(), 10);
        // 34 exceeds even the refunded 30
        assert!(c
            .equip(Loadout::from_ids(&["kogetsu", "asteroid"], &[]).unwrap())
            .is_err());
        assert_eq!(c.resources().capacity(), 10);

        // 21 only fits once the 20 is refunded
        c.equip(Loadout::from_ids(&["asteroid"], &["bagworm"]).unwrap())
            .unwrap();
        assert_eq!(c.resources().capacity(), 9);
    }

    #[test]
    fn test_replace_resources_reapplies_fresh() {
        let mut c = character(5);
        c.equip(Loadout::from_ids(&["asteroid"], &["bagworm"]).unwrap())
            .unwrap();

        let locked = c.replace_resources(ResourceLedger::new(100)).unwrap();
        assert_eq!(locked, 21);
        assert_eq!(c.resources().capacity(), 79);
        assert_eq!(c.resources().locked(), 21);
    }

    #[test]
    fn test_replace_resources_unequips_when_too_small() {
        let mut c = character(5);
        c.equip(Loadout::from_ids(&["asteroid"], &["bagworm"]).unwrap())
            .unwrap();

        let err = c.replace_resources(ResourceLedger::new(10)).unwrap_err();
        assert!(matches!(err, TrionError::InsufficientCapacity { .. }));
        assert!(c.loadout().loadout().is_empty());
        assert_eq!(c.resources().capacity(), 10);
    }

    #[test]
    fn test_split_weapon_prefers_main_hand() {
        let mut c = character(5);
        c.equip(Loadout::from_ids(&["kogetsu", "asteroid"], &["meteora"]).unwrap())
            .unwrap();
        assert!(c.split_weapon().is_none());

        c.draw(Hand::Sub, 0).unwrap();
        assert_eq!(c.split_weapon().unwrap().id.as_str(), "meteora");

        c.draw(Hand::Main, 1).unwrap();
        assert_eq!(c.split_weapon().unwrap().id.as_str(), "asteroid");

        // A drawn melee weapon in the main hand falls through to the sub hand
        c.draw(Hand::Main, 0).unwrap();
        assert_eq!(c.split_weapon().unwrap().id.as_str(), "meteora");
    }
}
