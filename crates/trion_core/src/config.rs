//! Tunable constants for the capacity model and the split controller.
//!
//! Values are loaded from RON. Every field has a default, so a config file
//! only needs to name what it overrides:
//!
//! ```ron
//! TrionConfig(
//!     capacity: CapacityConfig(
//!         coefficient_permille: 3800,
//!         minimum_floor: 1,
//!         basic_allocation: 10,
//!     ),
//! )
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrionError};
use crate::math::{fixed_serde, Fixed};

/// Constants of the capacity formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityConfig {
    /// Cubic coefficient in thousandths (3800 = 3.8).
    pub coefficient_permille: u32,
    /// Capacity for attributes of zero or below.
    pub minimum_floor: u32,
    /// Allocation every character reserves regardless of capacity.
    pub basic_allocation: u32,
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            coefficient_permille: 3800,
            minimum_floor: 1,
            basic_allocation: 10,
        }
    }
}

/// Geometry of the charge-cube grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Distance between neighbouring cubes.
    #[serde(with = "fixed_serde")]
    pub cube_spacing: Fixed,
    /// How far in front of the wielder the grid floats.
    #[serde(with = "fixed_serde")]
    pub forward_offset: Fixed,
    /// Height of the grid centre above the wielder's origin.
    #[serde(with = "fixed_serde")]
    pub height_offset: Fixed,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            cube_spacing: Fixed::from_num(0.5),
            forward_offset: Fixed::from_num(1),
            height_offset: Fixed::from_num(1.5),
        }
    }
}

/// Complete tuning table for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrionConfig {
    /// Capacity formula constants.
    pub capacity: CapacityConfig,
    /// Split cube layout.
    pub split: SplitConfig,
}

impl TrionConfig {
    /// Load a config from a RON file and validate it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| TrionError::DataParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&contents, &path.display().to_string())
    }

    /// Parse a config from a RON string and validate it.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        Self::parse(ron, "<inline>")
    }

    fn parse(ron: &str, origin: &str) -> Result<Self> {
        let config: Self = ron::from_str(ron).map_err(|e| TrionError::DataParseError {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the models rely on.
    ///
    /// The minimum floor must not exceed the capacity of attribute 1, or the
    /// capacity curve would dip between attribute 0 and 1.
    pub fn validate(&self) -> Result<()> {
        let cap = &self.capacity;
        if cap.coefficient_permille == 0 {
            return Err(TrionError::InvalidConfig(
                "coefficient_permille must be positive".to_string(),
            ));
        }
        let at_one = cap.coefficient_permille / 1000;
        if cap.minimum_floor > at_one {
            return Err(TrionError::InvalidConfig(format!(
                "minimum_floor {} exceeds capacity at attribute 1 ({})",
                cap.minimum_floor, at_one
            )));
        }
        if self.split.cube_spacing <= Fixed::ZERO {
            return Err(TrionError::InvalidConfig(
                "cube_spacing must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(TrionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_ron_keeps_defaults() {
        let config = TrionConfig::from_ron_str(
            "TrionConfig(capacity: CapacityConfig(basic_allocation: 25))",
        )
        .unwrap();
        assert_eq!(config.capacity.basic_allocation, 25);
        assert_eq!(config.capacity.coefficient_permille, 3800);
        assert_eq!(config.split, SplitConfig::default());
    }

    #[test]
    fn test_floor_above_first_step_rejected() {
        let mut config = TrionConfig::default();
        config.capacity.minimum_floor = 4;
        assert!(matches!(
            config.validate(),
            Err(TrionError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_parse_error_reports_origin() {
        let err = TrionConfig::from_ron_str("TrionConfig(capacity: 7)").unwrap_err();
        match err {
            TrionError::DataParseError { path, .. } => assert_eq!(path, "<inline>"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
