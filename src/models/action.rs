//! Idle actions: band selection and parameter sampling.
//!
//! Every function here is pure over its uniform draws in `[0, 1)`, so the
//! scheduler can feed them from any randomness source.

use std::f64::consts::PI;
use std::fmt::{Display, Formatter};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::control::{NavigationGoal, StrafeSide};
use super::position::Position;

/// Upper (exclusive) bound of the wander band.
pub const WANDER_BAND_END: f64 = 0.45;
/// Upper (exclusive) bound of the look-around band.
pub const LOOK_BAND_END: f64 = 0.70;
/// Upper (exclusive) bound of the jump band; the rest is strafe/sneak.
pub const JUMP_BAND_END: f64 = 0.85;

/// How long the jump control stays asserted.
pub const JUMP_HOLD: Duration = Duration::from_millis(400);
/// Shortest strafe/sneak hold.
pub const STRAFE_HOLD_MIN_MS: u64 = 800;
/// Width of the strafe/sneak hold window; holds fall in `[min, min + span)`.
pub const STRAFE_HOLD_SPAN_MS: u64 = 800;
/// Largest head pitch deviation, in degrees.
pub const MAX_PITCH_DEGREES: f64 = 20.0;

/// Which behavior a scheduler firing performed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    /// Walk to a random point near home.
    Wander,
    /// Turn the head to a random direction.
    LookAround,
    /// Tap jump.
    Jump,
    /// Short strafe while sneaking.
    StrafeSneak,
}

impl ActionOutcome {
    /// Pick the action whose cumulative band contains `r`.
    ///
    /// Bands: `[0, .45)` wander, `[.45, .70)` look, `[.70, .85)` jump,
    /// `[.85, 1)` strafe/sneak.
    #[must_use]
    pub fn from_draw(r: f64) -> Self {
        if r < WANDER_BAND_END {
            Self::Wander
        } else if r < LOOK_BAND_END {
            Self::LookAround
        } else if r < JUMP_BAND_END {
            Self::Jump
        } else {
            Self::StrafeSneak
        }
    }

    /// Short name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wander => "wander",
            Self::LookAround => "look_around",
            Self::Jump => "jump",
            Self::StrafeSneak => "strafe_sneak",
        }
    }
}

impl Display for ActionOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully sampled action, ready to execute against a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActionPlan {
    /// Navigate near a point around home.
    Wander {
        /// Goal handed to the navigation collaborator.
        goal: NavigationGoal,
    },
    /// Snap the head to the given angles (radians).
    LookAround {
        /// Horizontal angle in `[-π, π]`.
        yaw: f64,
        /// Vertical angle in `[-20°, 20°]`.
        pitch: f64,
    },
    /// Assert jump, release after `hold`.
    Jump {
        /// Time until release.
        hold: Duration,
    },
    /// Assert a strafe direction plus sneak, release both after `hold`.
    StrafeSneak {
        /// Strafe direction.
        side: StrafeSide,
        /// Time until release.
        hold: Duration,
    },
}

impl ActionPlan {
    /// Which action this plan carries out.
    #[must_use]
    pub const fn outcome(&self) -> ActionOutcome {
        match self {
            Self::Wander { .. } => ActionOutcome::Wander,
            Self::LookAround { .. } => ActionOutcome::LookAround,
            Self::Jump { .. } => ActionOutcome::Jump,
            Self::StrafeSneak { .. } => ActionOutcome::StrafeSneak,
        }
    }
}

/// Point on the horizontal disc of `radius` around `home`.
///
/// `angle_draw` maps to `[0, 2π)`, `radius_draw` to `[0, radius)`; the
/// vertical coordinate is home's.
#[must_use]
pub fn wander_target(home: Position, radius: f64, angle_draw: f64, radius_draw: f64) -> Position {
    let angle = angle_draw * PI * 2.0;
    let r = radius_draw * radius;
    home.offset(angle.cos() * r, 0.0, angle.sin() * r)
}

/// Head angles `(yaw, pitch)` in radians.
#[must_use]
pub fn look_angles(yaw_draw: f64, pitch_draw: f64) -> (f64, f64) {
    let yaw = yaw_draw * PI * 2.0 - PI;
    let pitch = (pitch_draw * MAX_PITCH_DEGREES * 2.0 - MAX_PITCH_DEGREES).to_radians();
    (yaw, pitch)
}

/// Strafe left on draws below one half, right otherwise.
#[must_use]
pub fn strafe_side(draw: f64) -> StrafeSide {
    if draw < 0.5 {
        StrafeSide::Left
    } else {
        StrafeSide::Right
    }
}

/// Strafe/sneak hold in whole milliseconds, in `[800, 1600)`.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)] // draw is clamped to [0, 1] and the span is small.
pub fn strafe_hold(draw: f64) -> Duration {
    let draw = if draw.is_finite() { draw.clamp(0.0, 1.0) } else { 0.0 };
    let extra = ((draw * STRAFE_HOLD_SPAN_MS as f64).floor() as u64).min(STRAFE_HOLD_SPAN_MS - 1);
    Duration::from_millis(STRAFE_HOLD_MIN_MS + extra)
}
