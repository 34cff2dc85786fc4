//! Loadouts and the loadout ledger.
//!
//! A [`Loadout`] is eight optional item slots: four primary slots drawn by
//! the main hand and four secondary slots drawn by the sub hand. Equipping a
//! loadout locks its total set cost out of the character's capacity.
//!
//! # Swap ordering
//!
//! [`LoadoutLedger::apply_loadout`] always refunds the previous lock before
//! locking the new cost. Swapping a 21-cost loadout for a 41-cost one on a
//! 100-capacity character therefore ends at 59 capacity, not 38.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::catalog::{ItemCatalog, ItemId, ItemSpec};
use crate::components::Hand;
use crate::error::{Result, TrionError};
use crate::ledger::ResourceLedger;

/// Slots per hand group.
pub const SLOTS_PER_HAND: usize = 4;

/// Eight-slot equipment assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Loadout {
    /// Slots drawn by the main hand.
    #[serde(default)]
    pub primary: [Option<ItemId>; SLOTS_PER_HAND],
    /// Slots drawn by the sub hand.
    #[serde(default)]
    pub secondary: [Option<ItemId>; SLOTS_PER_HAND],
}

impl Loadout {
    /// Create an empty loadout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a loadout from item id lists, filling slots in order.
    ///
    /// Fails with [`TrionError::InvalidSlot`] when a list is longer than
    /// four entries.
    pub fn from_ids(primary: &[&str], secondary: &[&str]) -> Result<Self> {
        let mut loadout = Self::new();
        for (slot, id) in primary.iter().enumerate() {
            loadout.set(Hand::Main, slot, Some(ItemId::from(*id)))?;
        }
        for (slot, id) in secondary.iter().enumerate() {
            loadout.set(Hand::Sub, slot, Some(ItemId::from(*id)))?;
        }
        Ok(loadout)
    }

    /// The slot group drawn by `hand`.
    #[must_use]
    pub const fn group(&self, hand: Hand) -> &[Option<ItemId>; SLOTS_PER_HAND] {
        match hand {
            Hand::Main => &self.primary,
            Hand::Sub => &self.secondary,
        }
    }

    /// Item in a slot, if any.
    #[must_use]
    pub fn slot(&self, hand: Hand, slot: usize) -> Option<&ItemId> {
        self.group(hand).get(slot).and_then(Option::as_ref)
    }

    /// Assign or empty a slot.
    pub fn set(&mut self, hand: Hand, slot: usize, item: Option<ItemId>) -> Result<()> {
        let group = match hand {
            Hand::Main => &mut self.primary,
            Hand::Sub => &mut self.secondary,
        };
        let entry = group.get_mut(slot).ok_or(TrionError::InvalidSlot(slot))?;
        *entry = item;
        Ok(())
    }

    /// All non-empty slots, primary first.
    pub fn items(&self) -> impl Iterator<Item = &ItemId> {
        self.primary
            .iter()
            .chain(self.secondary.iter())
            .filter_map(Option::as_ref)
    }

    /// Check if `hand`'s group holds `item`.
    #[must_use]
    pub fn holds(&self, hand: Hand, item: &ItemId) -> bool {
        self.group(hand).iter().flatten().any(|id| id == item)
    }

    /// Check if every slot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items().next().is_none()
    }

    /// Encode as pretty RON.
    pub fn to_ron(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| TrionError::InvalidState(format!("Failed to encode loadout: {e}")))
    }

    /// Decode from RON.
    pub fn from_ron(ron: &str) -> Result<Self> {
        ron::from_str(ron).map_err(|e| TrionError::DataParseError {
            path: "<loadout>".to_string(),
            message: e.to_string(),
        })
    }

    /// Encode with bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| TrionError::InvalidState(format!("Failed to serialize loadout: {e}")))
    }

    /// Decode from bincode bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| TrionError::InvalidState(format!("Failed to deserialize loadout: {e}")))
    }
}

/// Equipped loadout of one character and the capacity it has locked.
#[derive(Debug, Clone)]
pub struct LoadoutLedger {
    catalog: Arc<ItemCatalog>,
    loadout: Loadout,
    main_hand: Option<ItemId>,
    sub_hand: Option<ItemId>,
    /// Cost locked on the character's resource record, if any.
    locked_cost: Option<u32>,
}

impl LoadoutLedger {
    /// Create a ledger with an empty loadout and nothing locked.
    #[must_use]
    pub fn new(catalog: Arc<ItemCatalog>) -> Self {
        Self {
            catalog,
            loadout: Loadout::new(),
            main_hand: None,
            sub_hand: None,
            locked_cost: None,
        }
    }

    /// The shared catalog.
    #[must_use]
    pub fn catalog(&self) -> &Arc<ItemCatalog> {
        &self.catalog
    }

    /// The equipped loadout.
    #[must_use]
    pub const fn loadout(&self) -> &Loadout {
        &self.loadout
    }

    /// Cost most recently locked, if a loadout is applied.
    #[must_use]
    pub const fn locked_cost(&self) -> Option<u32> {
        self.locked_cost
    }

    /// Sum of set costs over the non-empty slots of `loadout`.
    pub fn set_cost(&self, loadout: &Loadout) -> Result<u32> {
        loadout.items().try_fold(0u32, |total, id| {
            let spec = self.catalog.require(id)?;
            Ok(total.saturating_add(spec.set_cost))
        })
    }

    /// Check if `loadout` fits in `available` capacity.
    ///
    /// Loadouts naming unknown items are never affordable.
    #[must_use]
    pub fn can_afford(&self, loadout: &Loadout, available: u32) -> bool {
        self.set_cost(loadout)
            .is_ok_and(|cost| cost <= available)
    }

    /// Lock that a refund would actually release from `resources`.
    ///
    /// Zero when nothing is locked, or when the record no longer carries the
    /// remembered lock.
    #[must_use]
    pub fn refundable(&self, resources: &ResourceLedger) -> u32 {
        match self.locked_cost {
            Some(cost) if resources.locked() >= cost => cost,
            _ => 0,
        }
    }

    /// Capacity a new loadout could use once the current one is refunded.
    #[must_use]
    pub fn available_capacity(&self, resources: &ResourceLedger) -> u32 {
        resources.capacity().saturating_add(self.refundable(resources))
    }

    /// Refund the previous lock, then lock the cost of `loadout`.
    ///
    /// Unknown items are rejected before anything is mutated. Callers must
    /// check [`can_afford`](Self::can_afford) against
    /// [`available_capacity`](Self::available_capacity) first; an
    /// unaffordable loadout trips a debug assertion and in release builds
    /// locks only what capacity remains.
    ///
    /// Returns the amount locked.
    pub fn apply_loadout(&mut self, resources: &mut ResourceLedger, loadout: Loadout) -> Result<u32> {
        let new_cost = self.set_cost(&loadout)?;

        if let Some(previous) = self.locked_cost.take() {
            if resources.locked() < previous {
                warn!(
                    previous,
                    locked = resources.locked(),
                    "Resource record no longer carries the loadout lock, skipping refund"
                );
            } else {
                resources.unlock_capacity(previous);
            }
        }

        let available = resources.capacity();
        debug_assert!(
            new_cost <= available,
            "loadout cost {new_cost} exceeds capacity {available}; check can_afford before applying"
        );
        let locked = if new_cost <= available {
            new_cost
        } else {
            error!(
                cost = new_cost,
                available, "Unaffordable loadout applied, clamping lock to capacity"
            );
            available
        };
        resources.lock_capacity(locked)?;

        self.loadout = loadout;
        self.locked_cost = Some(locked);
        for hand in Hand::ALL {
            let dropped = self
                .active_item(hand)
                .is_some_and(|id| !self.loadout.holds(hand, id));
            if dropped {
                debug!(?hand, "Drawn item left the loadout, holstering");
                self.holster(hand);
            }
        }

        info!(
            cost = locked,
            capacity = resources.capacity(),
            "Loadout applied"
        );
        Ok(locked)
    }

    /// Drop the remembered lock without touching any resource record.
    ///
    /// Used after the character's resource record was replaced wholesale.
    pub fn forget_lock(&mut self) -> Option<u32> {
        self.locked_cost.take()
    }

    /// Item currently drawn in `hand`.
    #[must_use]
    pub const fn active_item(&self, hand: Hand) -> Option<&ItemId> {
        match hand {
            Hand::Main => self.main_hand.as_ref(),
            Hand::Sub => self.sub_hand.as_ref(),
        }
    }

    /// Catalog entry of the item drawn in `hand`.
    #[must_use]
    pub fn active_spec(&self, hand: Hand) -> Option<&ItemSpec> {
        self.active_item(hand).and_then(|id| self.catalog.get(id))
    }

    /// Draw the item in `slot` of `hand`'s group.
    pub fn draw(&mut self, hand: Hand, slot: usize) -> Result<&ItemId> {
        if slot >= SLOTS_PER_HAND {
            return Err(TrionError::InvalidSlot(slot));
        }
        let item = self
            .loadout
            .slot(hand, slot)
            .cloned()
            .ok_or(TrionError::EmptySlot { hand, slot })?;
        debug!(?hand, slot, item = %item, "Item drawn");

        let drawn = match hand {
            Hand::Main => &mut self.main_hand,
            Hand::Sub => &mut self.sub_hand,
        };
        Ok(&*drawn.insert(item))
    }

    /// Put away whatever `hand` holds, returning it.
    pub fn holster(&mut self, hand: Hand) -> Option<ItemId> {
        match hand {
            Hand::Main => self.main_hand.take(),
            Hand::Sub => self.sub_hand.take(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Fixed;

    fn ledger() -> LoadoutLedger {
        LoadoutLedger::new(Arc::new(ItemCatalog::standard()))
    }

    fn loadout_a() -> Loadout {
        // 14 + 7
        Loadout::from_ids(&["asteroid"], &["bagworm"]).unwrap()
    }

    fn loadout_b() -> Loadout {
        // 20 + 14 + 7
        Loadout::from_ids(&["kogetsu", "asteroid"], &["bagworm"]).unwrap()
    }

    #[test]
    fn test_set_cost_sums_filled_slots() {
        let l = ledger();
        assert_eq!(l.set_cost(&Loadout::new()).unwrap(), 0);
        assert_eq!(l.set_cost(&loadout_a()).unwrap(), 21);
        assert_eq!(l.set_cost(&loadout_b()).unwrap(), 41);
    }

    #[test]
    fn test_full_loadout_costs_106() {
        let l = ledger();
        let full = Loadout::from_ids(
            &["kogetsu", "asteroid", "meteora", "hound"],
            &["viper", "shield", "bagworm", "grasshopper"],
        )
        .unwrap();
        assert_eq!(l.set_cost(&full).unwrap(), 106);
        assert!(l.can_afford(&full, 106));
        assert!(!l.can_afford(&full, 105));
    }

    #[test]
    fn test_unknown_item_is_an_error_and_unaffordable() {
        let l = ledger();
        let bad = Loadout::from_ids(&["lightsaber"], &[]).unwrap();
        assert_eq!(
            l.set_cost(&bad).unwrap_err(),
            TrionError::UnknownItem("lightsaber".to_string())
        );
        assert!(!l.can_afford(&bad, u32::MAX));
    }

    #[test]
    fn test_swap_refunds_before_locking() {
        let mut l = ledger();
        let mut res = ResourceLedger::new(100);

        assert_eq!(l.apply_loadout(&mut res, loadout_a()).unwrap(), 21);
        assert_eq!(res.capacity(), 79);

        assert_eq!(l.apply_loadout(&mut res, loadout_b()).unwrap(), 41);
        assert_eq!(res.capacity(), 59);
        assert_eq!(res.locked(), 41);
        assert_eq!(l.locked_cost(), Some(41));
    }

    #[test]
    fn test_unknown_item_rejected_without_mutation() {
        let mut l = ledger();
        let mut res = ResourceLedger::new(100);
        l.apply_loadout(&mut res, loadout_a()).unwrap();

        let bad = Loadout::from_ids(&["lightsaber"], &[]).unwrap();
        assert!(l.apply_loadout(&mut res, bad).is_err());
        assert_eq!(res.capacity(), 79);
        assert_eq!(l.loadout(), &loadout_a());
        assert_eq!(l.locked_cost(), Some(21));
    }

    #[test]
    fn test_stale_lock_is_not_refunded() {
        let mut l = ledger();
        let mut res = ResourceLedger::new(100);
        l.apply_loadout(&mut res, loadout_b()).unwrap();

        // Fresh record, the old lock went with the old one
        let mut fresh = ResourceLedger::new(100);
        l.apply_loadout(&mut fresh, loadout_a()).unwrap();
        assert_eq!(fresh.capacity(), 79);
        assert_eq!(fresh.locked(), 21);
    }

    #[test]
    fn test_available_capacity_counts_refund() {
        let mut l = ledger();
        let mut res = ResourceLedger::new(50);
        l.apply_loadout(&mut res, loadout_b()).unwrap();
        assert_eq!(res.capacity(), 9);
        assert_eq!(l.available_capacity(&res), 50);
        assert!(l.can_afford(&loadout_a(), l.available_capacity(&res)));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "check can_afford")]
    fn test_unaffordable_apply_asserts_in_debug() {
        let mut l = ledger();
        let mut res = ResourceLedger::new(20);
        let _ = l.apply_loadout(&mut res, loadout_b());
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_unaffordable_apply_clamps_in_release() {
        let mut l = ledger();
        let mut res = ResourceLedger::new(20);
        assert_eq!(l.apply_loadout(&mut res, loadout_b()).unwrap(), 20);
        assert_eq!(l.locked_cost(), Some(20));
        assert_eq!(res.locked(), 20);
        assert_eq!(res.capacity(), 0);

        assert_eq!(l.apply_loadout(&mut res, Loadout::default()).unwrap(), 0);
        assert_eq!(l.locked_cost(), Some(0));
        assert_eq!(res.locked(), 0);
        assert_eq!(res.capacity(), 20);
    }

    #[test]
    fn test_lock_leaves_current_clamped() {
        let mut l = ledger();
        let mut res = ResourceLedger::new(100);
        l.apply_loadout(&mut res, loadout_a()).unwrap();
        assert_eq!(res.current(), Fixed::from_num(79));
    }

    #[test]
    fn test_draw_and_active_item() {
        let mut l = ledger();
        let mut res = ResourceLedger::new(100);
        l.apply_loadout(&mut res, loadout_b()).unwrap();

        assert!(l.active_item(Hand::Main).is_none());
        assert_eq!(l.draw(Hand::Main, 1).unwrap().as_str(), "asteroid");
        assert_eq!(l.active_item(Hand::Main).unwrap().as_str(), "asteroid");
        assert_eq!(l.active_spec(Hand::Main).unwrap().activation_cost, 8);

        assert_eq!(
            l.draw(Hand::Sub, 2).unwrap_err(),
            TrionError::EmptySlot {
                hand: Hand::Sub,
                slot: 2,
            }
        );
        assert_eq!(l.draw(Hand::Main, 4).unwrap_err(), TrionError::InvalidSlot(4));

        assert_eq!(l.holster(Hand::Main).unwrap().as_str(), "asteroid");
        assert!(l.active_item(Hand::Main).is_none());
    }

    #[test]
    fn test_apply_holsters_items_that_left() {
        let mut l = ledger();
        let mut res = ResourceLedger::new(100);
        l.apply_loadout(&mut res, loadout_b()).unwrap();
        l.draw(Hand::Main, 0).unwrap();
        l.draw(Hand::Sub, 0).unwrap();

        // Loadout A drops kogetsu but keeps bagworm
        l.apply_loadout(&mut res, loadout_a()).unwrap();
        assert!(l.active_item(Hand::Main).is_none());
        assert_eq!(l.active_item(Hand::Sub).unwrap().as_str(), "bagworm");
    }

    #[test]
    fn test_loadout_set_rejects_bad_slot() {
        let mut loadout = Loadout::new();
        assert_eq!(
            loadout.set(Hand::Main, 7, Some("hound".into())).unwrap_err(),
            TrionError::InvalidSlot(7)
        );
        assert!(Loadout::from_ids(&["a", "b", "c", "d", "e"], &[]).is_err());
    }

    #[test]
    fn test_loadout_ron_and_bytes() {
        let loadout = loadout_b();
        let ron = loadout.to_ron().unwrap();
        assert_eq!(Loadout::from_ron(&ron).unwrap(), loadout);

        let bytes = loadout.to_bytes().unwrap();
        assert_eq!(Loadout::from_bytes(&bytes).unwrap(), loadout);
    }

    #[test]
    fn test_loadout_parses_handwritten_ron() {
        let loadout = Loadout::from_ron(
            r#"Loadout(primary: (Some("asteroid"), None, None, None))"#,
        )
        .unwrap();
        assert_eq!(loadout.slot(Hand::Main, 0).unwrap().as_str(), "asteroid");
        assert!(loadout.secondary.iter().all(Option::is_none));
    }
}
