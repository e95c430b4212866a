//! Game-session boundary.
//!
//! The transport, path planner, and world lookup are external collaborators.
//! [`Connector`] opens a connection and hands back a [`SessionHandle`] for
//! issuing actions together with the stream of [`SessionEvent`]s the
//! lifecycle controller reacts to. The in-process [`sim`] transport
//! implements both traits for dry runs.

pub mod sim;

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::config::AgentConfig;
use crate::models::control::{Control, NavigationGoal};
use crate::models::position::Position;
use crate::Result;

/// Events emitted by a live connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The agent entered the world and has a position.
    Spawn,
    /// The server forcibly removed the agent.
    Kicked {
        /// Server-supplied reason text.
        reason: String,
    },
    /// The connection ended.
    End {
        /// Transport-supplied reason text.
        reason: String,
    },
    /// A transport-level error that does not by itself end the session.
    Error {
        /// Human-readable error message.
        message: String,
    },
    /// One world-simulation step elapsed.
    PhysicsTick,
}

/// A block resolved by the world lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Block {
    /// Identity name, e.g. `grass_block` or `lava`.
    pub name: String,
    /// Block-aligned position of the block.
    pub position: Position,
}

/// Movement profile installed in the path planner for the world's ruleset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MovementProfile {
    /// Ruleset (game version) the profile was built for.
    pub ruleset: String,
}

impl Display for MovementProfile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "movements[{}]", self.ruleset)
    }
}

/// Action surface of one connected session.
///
/// Every call returns promptly; long-running effects (walking to a goal,
/// holding a control) complete in the background and are observed only via
/// later events.
pub trait SessionHandle: Send + Sync {
    /// Current agent position, or `None` before spawn / after teardown.
    fn position(&self) -> Option<Position>;

    /// Turn the head to `yaw` / `pitch` (radians).
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Control`](crate::AppError::Control) if the agent
    /// cannot be steered right now.
    fn look_at(&self, yaw: f64, pitch: f64, immediate: bool) -> Result<()>;

    /// Assert or release one control channel.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Control`](crate::AppError::Control) if the agent
    /// cannot be steered right now.
    fn set_control_state(&self, control: Control, active: bool) -> Result<()>;

    /// Replace the path planner's goal.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Navigation`](crate::AppError::Navigation) if the
    /// planner rejects the goal.
    fn set_goal(&self, goal: NavigationGoal) -> Result<()>;

    /// Block at `position`, or `None` if the chunk is not loaded.
    fn block_at(&self, position: Position) -> Option<Block>;

    /// Build and install a movement profile for the current world ruleset.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Navigation`](crate::AppError::Navigation) if the
    /// ruleset is unknown to the planner.
    fn init_movement_profile(&self) -> Result<MovementProfile>;
}

/// A freshly opened connection.
pub struct Connection {
    /// Action surface for the session.
    pub session: Arc<dyn SessionHandle>,
    /// Lifecycle and tick events; closes when the transport goes away.
    pub events: mpsc::Receiver<SessionEvent>,
}

/// Opens connections to the game server.
pub trait Connector: Send + Sync {
    /// Connect and authenticate using `config`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Transport`](crate::AppError::Transport) if the
    /// connection cannot be established.
    fn connect<'a>(
        &'a self,
        config: &'a AgentConfig,
    ) -> Pin<Box<dyn Future<Output = Result<Connection>> + Send + 'a>>;
}
