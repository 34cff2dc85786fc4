//! Fixed-point math utilities for deterministic simulation.
//!
//! Trion amounts, damage shares and every position the split controller
//! computes use fixed-point arithmetic, so two sessions fed the same inputs
//! end in bit-identical state on any CPU.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Fixed-point 3D vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec3Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate (up).
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
    /// Z coordinate.
    #[serde(with = "fixed_serde")]
    pub z: Fixed,
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

impl Vec3Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed, z: Fixed) -> Self {
        Self { x, y, z }
    }

    /// Create a vector from integer components.
    #[must_use]
    pub fn from_ints(x: i32, y: i32, z: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y), Fixed::from_num(z))
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
        z: Fixed::ZERO,
    };

    /// World up axis.
    pub const UP: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ONE,
        z: Fixed::ZERO,
    };

    /// Default facing for freshly spawned entities.
    pub const FORWARD: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
        z: Fixed::ONE,
    };

    /// Calculate squared distance (avoids sqrt for comparisons).
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let d = self - other;
        d.dot(d)
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product of two vectors.
    #[must_use]
    pub fn cross(self, other: Self) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    /// Multiply every component by a scalar.
    #[must_use]
    pub fn scale(self, factor: Fixed) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
            z: self.z * factor,
        }
    }

    /// Linearly interpolate between two vectors.
    #[must_use]
    pub fn lerp(self, other: Self, t: Fixed) -> Self {
        self + (other - self).scale(t)
    }

    /// Normalize vector using fixed-point math.
    ///
    /// Components are first divided by the largest magnitude so the squared
    /// length stays in `[1, 3]` for any input.
    #[must_use]
    pub fn normalize(self) -> Self {
        let largest = self
            .x
            .saturating_abs()
            .max(self.y.saturating_abs())
            .max(self.z.saturating_abs());
        if largest == Fixed::ZERO {
            return Self::ZERO;
        }

        let unit = Self::new(self.x / largest, self.y / largest, self.z / largest);
        let len = fixed_sqrt(unit.dot(unit));
        if len == Fixed::ZERO {
            return Self::ZERO;
        }

        Self::new(unit.x / len, unit.y / len, unit.z / len)
    }

    /// Orthonormal `(right, up)` pair for a unit `forward` and an up hint.
    ///
    /// `right` is `forward × up`. When `forward` is (nearly) parallel to the
    /// hint, [`Self::FORWARD`] is used as the reference axis instead, and
    /// [`Self::UP`] if `forward` is parallel to that too.
    #[must_use]
    pub fn orthonormal_basis(forward: Self, up_hint: Self) -> (Self, Self) {
        let mut right = forward.cross(up_hint);
        for reference in [Self::FORWARD, Self::UP] {
            if right.dot(right) >= BASIS_EPSILON {
                break;
            }
            right = forward.cross(reference);
        }
        let right = right.normalize();
        let up = right.cross(forward).normalize();
        (right, up)
    }

    /// Check whether every component is zero.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self == Self::ZERO
    }
}

/// Squared cross-product length below which two unit vectors count as parallel.
const BASIS_EPSILON: Fixed = Fixed::from_bits(1 << 12);

/// Computes the square root of a fixed-point number using binary search.
///
/// Returns the largest representable value whose square does not exceed
/// `value`, so perfect squares come back exact.
fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = if value > Fixed::ONE {
        value
    } else {
        Fixed::ONE
    }
    .saturating_add(Fixed::DELTA);

    while high - low > Fixed::DELTA {
        let mid = low + (high - low) / Fixed::from_num(2);
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

impl std::ops::Add for Vec3Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
        }
    }
}

impl std::ops::Sub for Vec3Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

impl std::ops::Neg for Vec3Fixed {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}
