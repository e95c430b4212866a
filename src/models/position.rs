//! World coordinates.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// A point in world space, in blocks.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Position {
    /// East-west axis.
    pub x: f64,
    /// Vertical axis.
    pub y: f64,
    /// North-south axis.
    pub z: f64,
}

impl Position {
    /// Construct a position from its components.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Return this position shifted by the given deltas.
    #[must_use]
    pub fn offset(self, dx: f64, dy: f64, dz: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// The position one block below this one.
    #[must_use]
    pub fn below(self) -> Self {
        self.offset(0.0, -1.0, 0.0)
    }

    /// Round every component down to the containing block.
    #[must_use]
    pub fn floored(self) -> Self {
        Self::new(self.x.floor(), self.y.floor(), self.z.floor())
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance_to(self, other: Self) -> f64 {
        let (dx, dy, dz) = (other.x - self.x, other.y - self.y, other.z - self.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Distance to `other` ignoring the vertical axis.
    #[must_use]
    pub fn horizontal_distance_to(self, other: Self) -> f64 {
        (other.x - self.x).hypot(other.z - self.z)
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}
