//! Trion capacity model.
//!
//! Capacity grows with the cube of a character's Trion attribute, so a
//! high-attribute character outclasses a low one by hundreds of times rather
//! than by a constant factor:
//!
//! ```text
//! capacity(attr) = minimum_floor                       if attr <= 0
//! capacity(attr) = floor(attr³ × coefficient)          otherwise
//! ```
//!
//! The coefficient is stored in thousandths and the floor is taken with
//! integer math, so `capacity(5)` with a coefficient of 3.8 is exactly 475.
//!
//! The display breakdown splits capacity into a constant basic allocation,
//! an equipment allocation of one tenth, and whatever remains for combat.

use serde::{Deserialize, Serialize};

use crate::config::CapacityConfig;

/// Upper bound on any capacity value, so it always fits a [`crate::math::Fixed`].
pub const MAX_CAPACITY: u32 = i32::MAX as u32;

/// Divisor of the equipment allocation (one tenth of capacity).
pub const EQUIPMENT_DIVISOR: u32 = 10;

/// Display breakdown of a capacity value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityBreakdown {
    /// Total capacity.
    pub capacity: u32,
    /// Constant basic allocation.
    pub basic: u32,
    /// Allocation reserved for equipment.
    pub equipment: u32,
    /// Remainder available in combat.
    pub combat: u32,
}

/// Pure capacity formula, parameterized by a [`CapacityConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapacityModel {
    config: CapacityConfig,
}

impl CapacityModel {
    /// Create a model from its constants.
    #[must_use]
    pub const fn new(config: CapacityConfig) -> Self {
        Self { config }
    }

    /// The constants this model was built with.
    #[must_use]
    pub const fn config(&self) -> &CapacityConfig {
        &self.config
    }

    /// Capacity for a Trion attribute.
    ///
    /// Attributes of zero or below return the minimum floor. Results are
    /// clamped to [`MAX_CAPACITY`].
    #[must_use]
    pub fn capacity(&self, attr: i32) -> u32 {
        if attr <= 0 {
            return self.config.minimum_floor.min(MAX_CAPACITY);
        }

        let a = u128::from(attr.unsigned_abs());
        let scaled = a * a * a * u128::from(self.config.coefficient_permille) / 1000;
        u32::try_from(scaled).map_or(MAX_CAPACITY, |c| c.min(MAX_CAPACITY))
    }

    /// Constant allocation shared by every character.
    #[must_use]
    pub const fn basic_allocation(&self) -> u32 {
        self.config.basic_allocation
    }

    /// One tenth of capacity, rounded down.
    #[must_use]
    pub const fn equipment_allocation(&self, capacity: u32) -> u32 {
        capacity / EQUIPMENT_DIVISOR
    }

    /// Capacity left after the basic and equipment allocations, never negative.
    #[must_use]
    pub const fn combat_allocation(&self, capacity: u32) -> u32 {
        capacity
            .saturating_sub(self.basic_allocation())
            .saturating_sub(self.equipment_allocation(capacity))
    }

    /// All display figures for an attribute.
    #[must_use]
    pub fn breakdown(&self, attr: i32) -> CapacityBreakdown {
        let capacity = self.capacity(attr);
        CapacityBreakdown {
            capacity,
            basic: self.basic_allocation(),
            equipment: self.equipment_allocation(capacity),
            combat: self.combat_allocation(capacity),
        }
    }
}
