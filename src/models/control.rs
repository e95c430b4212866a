//! Movement control channels and navigation goals.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use super::position::Position;

/// A boolean input channel of the agent's movement system.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    /// Walk forward.
    Forward,
    /// Walk backward.
    Back,
    /// Strafe left.
    Left,
    /// Strafe right.
    Right,
    /// Jump.
    Jump,
    /// Sprint.
    Sprint,
    /// Sneak (crouch).
    Sneak,
}

impl Control {
    /// Wire name of the control channel.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Back => "back",
            Self::Left => "left",
            Self::Right => "right",
            Self::Jump => "jump",
            Self::Sprint => "sprint",
            Self::Sneak => "sneak",
        }
    }
}

impl Display for Control {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which way a strafe goes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StrafeSide {
    /// Strafe left.
    Left,
    /// Strafe right.
    Right,
}

impl StrafeSide {
    /// Control channel driving this strafe direction.
    #[must_use]
    pub const fn control(self) -> Control {
        match self {
            Self::Left => Control::Left,
            Self::Right => Control::Right,
        }
    }
}

/// A request to the path-planning collaborator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NavigationGoal {
    /// Reach any point within `tolerance` blocks of `target`.
    Near {
        /// Destination point.
        target: Position,
        /// Acceptable distance from the destination.
        tolerance: f64,
    },
}

impl NavigationGoal {
    /// Tolerance used by every goal the agent issues.
    pub const DEFAULT_TOLERANCE: f64 = 1.0;

    /// A `Near` goal with the default one-block tolerance.
    #[must_use]
    pub const fn near(target: Position) -> Self {
        Self::Near {
            target,
            tolerance: Self::DEFAULT_TOLERANCE,
        }
    }

    /// Destination point of the goal.
    #[must_use]
    pub const fn target(&self) -> Position {
        match self {
            Self::Near { target, .. } => *target,
        }
    }

    /// Whether `position` satisfies the goal.
    #[must_use]
    pub fn is_reached_by(&self, position: Position) -> bool {
        match self {
            Self::Near { target, tolerance } => position.distance_to(*target) <= *tolerance,
        }
    }
}
