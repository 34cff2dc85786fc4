//! Per-character Trion resource ledger.
//!
//! Tracks the Trion capacity and the spendable balance (`current`). Capacity
//! is an integer; `current` is fixed-point because split projectiles deal
//! fractional damage shares.
//!
//! # Invariant
//!
//! `0 <= current <= capacity` after every operation. Damage and heal clamp
//! instead of failing, and locking capacity pulls `current` down with it.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::capacity::{CapacityModel, MAX_CAPACITY};
use crate::error::{Result, TrionError};
use crate::math::{fixed_serde, Fixed};

/// Convert an untrusted amount into a non-negative [`Fixed`].
///
/// NaN, infinite, negative and out-of-range values clamp to zero with a
/// warning; `op` names the operation in the log line.
#[must_use]
pub fn sanitize_amount(raw: f64, op: &'static str) -> Fixed {
    match Fixed::checked_from_num(raw) {
        Some(amount) if amount >= Fixed::ZERO => amount,
        _ => {
            warn!(op, raw, "Rejected invalid Trion amount, using 0");
            Fixed::ZERO
        }
    }
}

/// Trion capacity and balance of one character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLedger {
    /// Capacity before any loadout lock.
    base_capacity: u32,
    /// Capacity after locks.
    capacity: u32,
    /// Total currently locked by loadouts.
    locked: u32,
    /// Spendable balance.
    #[serde(with = "fixed_serde")]
    current: Fixed,
}

impl ResourceLedger {
    /// Create a ledger at full Trion.
    ///
    /// Capacity is clamped to [`MAX_CAPACITY`].
    #[must_use]
    pub fn new(capacity: u32) -> Self {
        let capacity = capacity.min(MAX_CAPACITY);
        Self {
            base_capacity: capacity,
            capacity,
            locked: 0,
            current: Fixed::from_num(capacity),
        }
    }

    /// Create a ledger from a Trion attribute.
    #[must_use]
    pub fn from_attribute(model: &CapacityModel, attr: i32) -> Self {
        Self::new(model.capacity(attr))
    }

    /// Capacity before any loadout lock.
    #[must_use]
    pub const fn base_capacity(&self) -> u32 {
        self.base_capacity
    }

    /// Capacity after loadout locks.
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Amount currently locked by loadouts.
    #[must_use]
    pub const fn locked(&self) -> u32 {
        self.locked
    }

    /// Spendable Trion.
    #[must_use]
    pub const fn current(&self) -> Fixed {
        self.current
    }

    fn capacity_fixed(&self) -> Fixed {
        Fixed::from_num(self.capacity)
    }

    /// Apply damage, returning the amount actually removed.
    ///
    /// Negative amounts clamp to zero with a warning.
    pub fn apply_damage(&mut self, amount: Fixed) -> Fixed {
        let amount = if amount < Fixed::ZERO {
            warn!(%amount, "Negative damage clamped to 0");
            Fixed::ZERO
        } else {
            amount
        };
        let actual = amount.min(self.current);
        self.current -= actual;
        actual
    }

    /// Apply damage from an untrusted floating-point source.
    pub fn apply_raw_damage(&mut self, raw: f64) -> Fixed {
        let amount = sanitize_amount(raw, "damage");
        self.apply_damage(amount)
    }

    /// Restore Trion up to capacity, returning the amount actually restored.
    ///
    /// Negative amounts clamp to zero with a warning.
    pub fn heal(&mut self, amount: Fixed) -> Fixed {
        let amount = if amount < Fixed::ZERO {
            warn!(%amount, "Negative heal clamped to 0");
            Fixed::ZERO
        } else {
            amount
        };
        let headroom = self.capacity_fixed() - self.current;
        let actual = amount.min(headroom);
        self.current += actual;
        actual
    }

    /// Heal from an untrusted floating-point source.
    pub fn heal_raw(&mut self, raw: f64) -> Fixed {
        let amount = sanitize_amount(raw, "heal");
        self.heal(amount)
    }

    /// Check if the character is out of Trion.
    #[must_use]
    pub fn is_defeated(&self) -> bool {
        self.current <= Fixed::ZERO
    }

    /// Balance as a percentage of capacity (0-100).
    #[must_use]
    pub fn percentage(&self) -> Fixed {
        if self.capacity == 0 {
            Fixed::ZERO
        } else {
            self.current / self.capacity_fixed() * Fixed::from_num(100)
        }
    }

    /// Check whether `amount` can be spent from the balance.
    #[must_use]
    pub fn can_spend(&self, amount: u32) -> bool {
        Fixed::checked_from_num(amount).is_some_and(|amount| self.current >= amount)
    }

    /// Spend Trion if available.
    ///
    /// Returns true if the transaction succeeded.
    pub fn spend(&mut self, amount: u32) -> bool {
        match Fixed::checked_from_num(amount) {
            Some(amount) if self.current >= amount => {
                self.current -= amount;
                true
            }
            _ => false,
        }
    }

    /// Fill the balance back to capacity.
    pub fn refill(&mut self) {
        self.current = self.capacity_fixed();
    }

    /// Reserve `amount` of capacity for equipment.
    ///
    /// Fails without mutating when the lock would push capacity below zero.
    /// A successful lock pulls `current` down to the new capacity.
    pub fn lock_capacity(&mut self, amount: u32) -> Result<()> {
        if amount > self.capacity {
            return Err(TrionError::InsufficientCapacity {
                required: amount,
                available: self.capacity,
            });
        }

        self.capacity -= amount;
        self.locked += amount;
        let cap = self.capacity_fixed();
        if self.current > cap {
            self.current = cap;
        }
        debug!(
            amount,
            capacity = self.capacity,
            locked = self.locked,
            "Capacity locked"
        );
        Ok(())
    }

    /// Release up to `amount` of locked capacity, returning what was released.
    ///
    /// `current` is not refilled.
    pub fn unlock_capacity(&mut self, amount: u32) -> u32 {
        if amount > self.locked {
            warn!(
                amount,
                locked = self.locked,
                "Unlock exceeds locked capacity, releasing what is locked"
            );
        }
        let released = amount.min(self.locked);
        self.locked -= released;
        self.capacity += released;
        debug!(
            released,
            capacity = self.capacity,
            locked = self.locked,
            "Capacity unlocked"
        );
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fx(n: f64) -> Fixed {
        Fixed::from_num(n)
    }

    #[test]
    fn test_new_starts_full() {
        let ledger = ResourceLedger::new(100);
        assert_eq!(ledger.capacity(), 100);
        assert_eq!(ledger.current(), fx(100.0));
        assert!(!ledger.is_defeated());
    }

    #[test]
    fn test_damage_clamps_at_zero() {
        let mut ledger = ResourceLedger::new(50);
        assert_eq!(ledger.apply_damage(fx(30.0)), fx(30.0));
        assert_eq!(ledger.apply_damage(fx(30.0)), fx(20.0));
        assert_eq!(ledger.current(), Fixed::ZERO);
        assert!(ledger.is_defeated());
    }

    #[test]
    fn test_negative_damage_ignored() {
        let mut ledger = ResourceLedger::new(50);
        assert_eq!(ledger.apply_damage(fx(-10.0)), Fixed::ZERO);
        assert_eq!(ledger.current(), fx(50.0));
    }

    #[test]
    fn test_raw_damage_rejects_nan_and_infinity() {
        let mut ledger = ResourceLedger::new(50);
        ledger.apply_raw_damage(f64::NAN);
        ledger.apply_raw_damage(f64::INFINITY);
        ledger.apply_raw_damage(-3.0);
        assert_eq!(ledger.current(), fx(50.0));

        ledger.apply_raw_damage(5.5);
        assert_eq!(ledger.current(), fx(44.5));
    }

    #[test]
    fn test_heal_clamps_at_capacity() {
        let mut ledger = ResourceLedger::new(50);
        ledger.apply_damage(fx(10.0));
        assert_eq!(ledger.heal(fx(25.0)), fx(10.0));
        assert_eq!(ledger.current(), fx(50.0));
        ledger.heal_raw(f64::NAN);
        assert_eq!(ledger.current(), fx(50.0));
    }

    #[test]
    fn test_percentage() {
        let mut ledger = ResourceLedger::new(200);
        ledger.apply_damage(fx(50.0));
        assert_eq!(ledger.percentage(), fx(75.0));
        assert_eq!(ResourceLedger::new(0).percentage(), Fixed::ZERO);
    }

    #[test]
    fn test_spend() {
        let mut ledger = ResourceLedger::new(10);
        assert!(ledger.spend(8));
        assert!(!ledger.spend(8));
        assert_eq!(ledger.current(), fx(2.0));
    }

    #[test]
    fn test_spend_beyond_fixed_range_fails() {
        let mut ledger = ResourceLedger::new(MAX_CAPACITY);
        assert!(!ledger.can_spend(u32::MAX));
        assert!(!ledger.spend(u32::MAX));
        assert_eq!(ledger.current(), Fixed::from_num(MAX_CAPACITY));
        assert!(ledger.spend(MAX_CAPACITY));
    }

    #[test]
    fn test_lock_reduces_capacity_and_clamps_current() {
        let mut ledger = ResourceLedger::new(100);
        ledger.lock_capacity(21).unwrap();
        assert_eq!(ledger.capacity(), 79);
        assert_eq!(ledger.locked(), 21);
        assert_eq!(ledger.current(), fx(79.0));
        assert_eq!(ledger.base_capacity(), 100);
    }

    #[test]
    fn test_lock_beyond_capacity_fails_without_mutation() {
        let mut ledger = ResourceLedger::new(100);
        let err = ledger.lock_capacity(101).unwrap_err();
        assert_eq!(
            err,
            TrionError::InsufficientCapacity {
                required: 101,
                available: 100,
            }
        );
        assert_eq!(ledger.capacity(), 100);
        assert_eq!(ledger.locked(), 0);
    }

    #[test]
    fn test_unlock_restores_capacity_not_current() {
        let mut ledger = ResourceLedger::new(100);
        ledger.lock_capacity(40).unwrap();
        assert_eq!(ledger.unlock_capacity(40), 40);
        assert_eq!(ledger.capacity(), 100);
        assert_eq!(ledger.current(), fx(60.0));
    }

    #[test]
    fn test_unlock_more_than_locked_is_bounded() {
        let mut ledger = ResourceLedger::new(100);
        ledger.lock_capacity(10).unwrap();
        assert_eq!(ledger.unlock_capacity(30), 10);
        assert_eq!(ledger.capacity(), 100);
        assert_eq!(ledger.locked(), 0);
    }
}
