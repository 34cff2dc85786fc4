//! Static item catalog.
//!
//! The catalog is read-only data shared by every character's loadout. It is
//! built once (from RON or [`ItemCatalog::standard`]) and handed out as an
//! `Arc<ItemCatalog>`; nothing mutates it at runtime.
//!
//! # Example RON
//!
//! ```ron
//! [
//!     ItemSpec(
//!         id: "asteroid",
//!         name: "Asteroid",
//!         category: SplittingProjectile,
//!         activation_cost: 8,
//!         set_cost: 14,
//!         cooldown: 20,
//!         range: 60,
//!         damage: 22,
//!     ),
//! ]
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::capacity::MAX_CAPACITY;
use crate::error::{Result, TrionError};

/// Catalog key of an item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    /// Create an item id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Behavior category of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeaponCategory {
    /// Close-range blade.
    Melee,
    /// Single projectile per shot.
    Projectile,
    /// Charged cube that splits into a grid of parallel projectiles.
    SplittingProjectile,
    /// Shields, movement and stealth triggers.
    Utility,
}

impl WeaponCategory {
    /// Check if items of this category can be charged and split.
    #[must_use]
    pub const fn is_splitting(self) -> bool {
        match self {
            Self::SplittingProjectile => true,
            Self::Melee | Self::Projectile | Self::Utility => false,
        }
    }

    /// Check if items of this category deal damage.
    #[must_use]
    pub const fn is_weapon(self) -> bool {
        match self {
            Self::Melee | Self::Projectile | Self::SplittingProjectile => true,
            Self::Utility => false,
        }
    }
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSpec {
    /// Unique identifier.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Behavior category.
    pub category: WeaponCategory,
    /// Trion spent from the balance per activation.
    #[serde(default)]
    pub activation_cost: u32,
    /// Capacity locked while the item is in a loadout.
    pub set_cost: u32,
    /// Ticks between activations.
    #[serde(default)]
    pub cooldown: u32,
    /// Effective range in world units.
    #[serde(default)]
    pub range: u32,
    /// Total damage per activation.
    #[serde(default)]
    pub damage: u32,
}

impl ItemSpec {
    /// Create a catalog entry with no activation cost, cooldown, range or damage.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: WeaponCategory, set_cost: u32) -> Self {
        Self {
            id: ItemId::new(id),
            name: name.into(),
            category,
            activation_cost: 0,
            set_cost,
            cooldown: 0,
            range: 0,
            damage: 0,
        }
    }

    /// Builder method to set combat stats.
    #[must_use]
    pub fn with_combat(mut self, activation_cost: u32, damage: u32, range: u32, cooldown: u32) -> Self {
        self.activation_cost = activation_cost;
        self.damage = damage;
        self.range = range;
        self.cooldown = cooldown;
        self
    }
}

/// Read-only table of every equippable item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemCatalog {
    items: BTreeMap<ItemId, ItemSpec>,
}

impl ItemCatalog {
    /// Build a catalog, rejecting duplicate ids and costs or damage above
    /// [`MAX_CAPACITY`].
    pub fn new(items: impl IntoIterator<Item = ItemSpec>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for item in items {
            if map.contains_key(&item.id) {
                return Err(TrionError::DuplicateItem(item.id.0));
            }
            for (field, value) in [
                ("set_cost", item.set_cost),
                ("activation_cost", item.activation_cost),
                ("damage", item.damage),
            ] {
                if value > MAX_CAPACITY {
                    return Err(TrionError::InvalidConfig(format!(
                        "{}: {field} {value} exceeds {MAX_CAPACITY}",
                        item.id
                    )));
                }
            }
            map.insert(item.id.clone(), item);
        }
        Ok(Self { items: map })
    }

    /// Parse a catalog from a RON list of [`ItemSpec`].
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        Self::parse(ron, "<inline>")
    }

    /// Load a catalog from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| TrionError::DataParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&contents, &path.display().to_string())
    }

    fn parse(ron: &str, origin: &str) -> Result<Self> {
        let items: Vec<ItemSpec> = ron::from_str(ron).map_err(|e| TrionError::DataParseError {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        Self::new(items)
    }

    /// The built-in trigger table.
    #[must_use]
    pub fn standard() -> Self {
        use WeaponCategory::{Melee, Projectile, SplittingProjectile, Utility};

        let items = [
            ItemSpec::new("kogetsu", "Kogetsu", Melee, 20).with_combat(2, 40, 2, 30),
            ItemSpec::new("scorpion", "Scorpion", Melee, 12).with_combat(1, 25, 2, 15),
            ItemSpec::new("raygust", "Raygust", Melee, 16).with_combat(2, 30, 2, 25),
            ItemSpec::new("asteroid", "Asteroid", SplittingProjectile, 14).with_combat(8, 22, 60, 20),
            ItemSpec::new("meteora", "Meteora", SplittingProjectile, 18).with_combat(12, 36, 45, 40),
            ItemSpec::new("hound", "Hound", Projectile, 14).with_combat(6, 18, 55, 20),
            ItemSpec::new("viper", "Viper", Projectile, 15).with_combat(7, 20, 55, 25),
            ItemSpec::new("egret", "Egret", Projectile, 22).with_combat(10, 60, 200, 90),
            ItemSpec::new("shield", "Shield", Utility, 10),
            ItemSpec::new("bagworm", "Bagworm", Utility, 7),
            ItemSpec::new("grasshopper", "Grasshopper", Utility, 8),
        ];

        let mut map = BTreeMap::new();
        for item in items {
            map.insert(item.id.clone(), item);
        }
        Self { items: map }
    }

    /// Look up an item.
    #[must_use]
    pub fn get(&self, id: &ItemId) -> Option<&ItemSpec> {
        self.items.get(id)
    }

    /// Look up an item, failing with [`TrionError::UnknownItem`].
    pub fn require(&self, id: &ItemId) -> Result<&ItemSpec> {
        self.items
            .get(id)
            .ok_or_else(|| TrionError::UnknownItem(id.0.clone()))
    }

    /// Check if the catalog knows an item.
    #[must_use]
    pub fn contains(&self, id: &ItemId) -> bool {
        self.items.contains_key(id)
    }

    /// Iterate items in id order.
    pub fn iter(&self) -> impl Iterator<Item = &ItemSpec> {
        self.items.values()
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
