//! Classification of the ground beneath the agent.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Why a block is unsafe to stand on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum HazardReason {
    /// Nothing solid below (open air, void).
    Air,
    /// Lava below.
    Lava,
    /// Cactus below.
    Cactus,
}

impl HazardReason {
    /// Substring of a block name that marks this hazard.
    #[must_use]
    pub const fn marker(self) -> &'static str {
        match self {
            Self::Air => "air",
            Self::Lava => "lava",
            Self::Cactus => "cactus",
        }
    }
}

impl Display for HazardReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.marker())
    }
}

/// Safety verdict for one block.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HazardClassification {
    /// Fine to stand on.
    Safe,
    /// Agent should move back home.
    Unsafe(HazardReason),
}

impl HazardClassification {
    /// Classify a block by case-sensitive substring match on its name.
    ///
    /// Markers are checked in the order air, lava, cactus.
    #[must_use]
    pub fn classify(block_name: &str) -> Self {
        [HazardReason::Air, HazardReason::Lava, HazardReason::Cactus]
            .into_iter()
            .find(|reason| block_name.contains(reason.marker()))
            .map_or(Self::Safe, Self::Unsafe)
    }

    /// Whether the verdict calls for recovery.
    #[must_use]
    pub const fn is_unsafe(&self) -> bool {
        matches!(self, Self::Unsafe(_))
    }
}
