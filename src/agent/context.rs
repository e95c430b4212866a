//! Session-scoped context shared by every component of one connection.
//!
//! A new [`SessionContext`] is created for each connection attempt. It holds
//! the configuration snapshot, the home position captured at spawn, and a
//! generation number; deferred work checks [`SessionContext::is_current`]
//! so nothing scheduled by a superseded session touches a newer one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::AgentConfig;
use crate::models::position::Position;
use crate::session::MovementProfile;

/// State owned by one connection attempt.
#[derive(Debug)]
pub struct SessionContext {
    id: Uuid,
    generation: u64,
    live_generation: Arc<AtomicU64>,
    config: Arc<AgentConfig>,
    home: OnceLock<Position>,
    movement_profile: OnceLock<MovementProfile>,
    created_at: DateTime<Utc>,
    cancel: CancellationToken,
}

impl SessionContext {
    /// Create the context for `generation` and mark it as the live one.
    ///
    /// The context's cancellation token is a child of `parent`, so process
    /// shutdown also tears the session down.
    #[must_use]
    pub fn new(
        generation: u64,
        live_generation: Arc<AtomicU64>,
        config: Arc<AgentConfig>,
        parent: &CancellationToken,
    ) -> Self {
        live_generation.store(generation, Ordering::SeqCst);
        Self {
            id: Uuid::new_v4(),
            generation,
            live_generation,
            config,
            home: OnceLock::new(),
            movement_profile: OnceLock::new(),
            created_at: Utc::now(),
            cancel: parent.child_token(),
        }
    }

    /// A first-generation context with its own generation counter.
    #[must_use]
    pub fn detached(config: Arc<AgentConfig>) -> Self {
        Self::new(
            1,
            Arc::new(AtomicU64::new(0)),
            config,
            &CancellationToken::new(),
        )
    }

    /// Unique identifier for logs.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Connection attempt number, starting at 1.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Configuration snapshot for this session.
    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Home position, once spawned.
    #[must_use]
    pub fn home(&self) -> Option<Position> {
        self.home.get().copied()
    }

    /// Record the home position. Only the first call takes effect.
    pub fn set_home(&self, home: Position) -> bool {
        self.home.set(home).is_ok()
    }

    /// Movement profile installed at spawn, if any.
    #[must_use]
    pub fn movement_profile(&self) -> Option<&MovementProfile> {
        self.movement_profile.get()
    }

    /// Record the movement profile. Only the first call takes effect.
    pub fn set_movement_profile(&self, profile: MovementProfile) -> bool {
        self.movement_profile.set(profile).is_ok()
    }

    /// When the connection attempt started.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Token cancelled on teardown.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Whether this is still the live session and has not been torn down.
    #[must_use]
    pub fn is_current(&self) -> bool {
        !self.cancel.is_cancelled()
            && self.live_generation.load(Ordering::SeqCst) == self.generation
    }

    /// Cancel everything bound to this session.
    pub fn teardown(&self) {
        self.cancel.cancel();
    }
}
