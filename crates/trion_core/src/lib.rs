//! # Trion Core
//!
//! Deterministic combat-resource core for Trion arena battles.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO beyond loading RON data files
//! - No system randomness
//! - No floating-point math in state transitions (uses fixed-point)
//!
//! ## Crate Structure
//!
//! - [`capacity`] - Cubic Trion capacity formula and its allocations
//! - [`ledger`] - Per-character capacity and balance
//! - [`catalog`] - Static item table
//! - [`loadout`] - Eight-slot loadouts and the capacity they lock
//! - [`character`] - Resource record, loadout and team of one combatant
//! - [`split`] - Charge / escalate / fire lifecycle of splitting weapons
//! - [`registry`] - Entity storage and the controller's collaborator traits
//! - [`arena`] - Frame-driven session tying it all together
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod arena;
pub mod capacity;
pub mod catalog;
pub mod character;
pub mod components;
pub mod config;
pub mod error;
pub mod ledger;
pub mod loadout;
pub mod math;
pub mod registry;
pub mod split;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::arena::{Arena, TickEvents};
    pub use crate::capacity::{CapacityBreakdown, CapacityModel};
    pub use crate::catalog::{ItemCatalog, ItemId, ItemSpec, WeaponCategory};
    pub use crate::character::Character;
    pub use crate::components::*;
    pub use crate::config::{CapacityConfig, SplitConfig, TrionConfig};
    pub use crate::error::{Result, TrionError};
    pub use crate::ledger::ResourceLedger;
    pub use crate::loadout::{Loadout, LoadoutLedger};
    pub use crate::math::{Fixed, Vec3Fixed};
    pub use crate::registry::{
        EntityRegistry, EntityStorage, Orientation, OrientationQuery, ProjectileSpawner, Shot,
    };
    pub use crate::split::{
        ChargeOutcome, EscalateOutcome, FireReport, SplitError, SplitEvent, SplitLevel,
        SplitProjectileController,
    };
}
