//! Session lifecycle: connect → spawn → run → disconnect → reconnect.
//!
//! The controller runs until the shutdown token fires. Every connection
//! attempt gets a fresh [`SessionContext`]; on spawn the action scheduler
//! and hazard monitor are wired in, and on kick / disconnect the session is
//! torn down before the fixed [`RECONNECT_DELAY`] starts. Reconnect attempts
//! are unbounded.

use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use super::active::ActiveSession;
use super::context::SessionContext;
use super::dice::{entropy_factory, DiceFactory};
use crate::config::{AgentConfig, RECONNECT_DELAY};
use crate::models::position::Position;
use crate::session::{Connection, Connector, SessionEvent};

/// Observable controller state.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleState {
    /// A connection attempt is in progress or awaiting spawn.
    Connecting {
        /// Connection attempt number.
        generation: u64,
    },
    /// The agent has spawned and its components are running.
    Active {
        /// Connection attempt number.
        generation: u64,
        /// Home position captured at spawn.
        home: Position,
    },
    /// The session ended; a reconnect is pending.
    Disconnected {
        /// Connection attempt number that ended.
        generation: u64,
        /// Why the session ended.
        reason: String,
    },
}

impl LifecycleState {
    /// Connection attempt number this state belongs to.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        match self {
            Self::Connecting { generation }
            | Self::Active { generation, .. }
            | Self::Disconnected { generation, .. } => *generation,
        }
    }
}

/// Owns the session state machine.
pub struct SessionLifecycleController<C> {
    config: Arc<AgentConfig>,
    connector: Arc<C>,
    dice_factory: DiceFactory,
    live_generation: Arc<AtomicU64>,
    state_tx: watch::Sender<LifecycleState>,
    shutdown: CancellationToken,
}

impl<C: Connector> SessionLifecycleController<C> {
    /// Construct a controller (does not connect yet).
    #[must_use]
    pub fn new(config: AgentConfig, connector: Arc<C>, shutdown: CancellationToken) -> Self {
        let (state_tx, _) = watch::channel(LifecycleState::Connecting { generation: 0 });
        Self {
            config: Arc::new(config),
            connector,
            dice_factory: entropy_factory(),
            live_generation: Arc::new(AtomicU64::new(0)),
            state_tx,
            shutdown,
        }
    }

    /// Replace the randomness used by each session's scheduler.
    #[must_use]
    pub fn with_dice(mut self, dice_factory: DiceFactory) -> Self {
        self.dice_factory = dice_factory;
        self
    }

    /// Subscribe to lifecycle state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state_tx.subscribe()
    }

    /// Run until the shutdown token is cancelled.
    pub async fn run(self) {
        let mut generation: u64 = 0;

        loop {
            generation += 1;
            let span = info_span!("session", generation);
            let Some(reason) = self.run_session(generation).instrument(span).await else {
                info!("session controller shutting down");
                return;
            };

            self.publish(LifecycleState::Disconnected {
                generation,
                reason: reason.clone(),
            });
            info!(
                %reason,
                delay_secs = RECONNECT_DELAY.as_secs(),
                "disconnected, reconnecting after delay"
            );

            tokio::select! {
                () = self.shutdown.cancelled() => {
                    info!("session controller shutting down");
                    return;
                }
                () = tokio::time::sleep(RECONNECT_DELAY) => {}
            }
        }
    }

    /// Drive one connection attempt to its end.
    ///
    /// Returns the disconnect reason, or `None` if shutdown interrupted it.
    async fn run_session(&self, generation: u64) -> Option<String> {
        let ctx = Arc::new(SessionContext::new(
            generation,
            Arc::clone(&self.live_generation),
            Arc::clone(&self.config),
            &self.shutdown,
        ));
        self.publish(LifecycleState::Connecting { generation });
        info!(
            session_id = %ctx.id(),
            username = %self.config.username,
            endpoint = %self.config.endpoint(),
            offline = self.config.offline,
            "starting agent"
        );

        let connected = tokio::select! {
            () = self.shutdown.cancelled() => return None,
            result = self.connector.connect(&self.config) => result,
        };
        let Connection {
            session,
            mut events,
        } = match connected {
            Ok(connection) => connection,
            Err(err) => {
                warn!(%err, "connection failed");
                ctx.teardown();
                return Some(err.to_string());
            }
        };

        let mut active = ActiveSession::new(Arc::clone(&ctx), session);
        let reason = loop {
            let event = tokio::select! {
                () = self.shutdown.cancelled() => {
                    active.teardown();
                    return None;
                }
                event = events.recv() => event,
            };

            match event {
                Some(SessionEvent::Spawn) => {
                    if active.is_running() {
                        debug!("ignoring repeated spawn");
                        continue;
                    }
                    if let Some(home) = active.activate((self.dice_factory)()) {
                        self.publish(LifecycleState::Active { generation, home });
                    }
                }
                Some(SessionEvent::PhysicsTick) => {
                    active.on_tick();
                }
                Some(SessionEvent::Kicked { reason }) => {
                    info!(%reason, "kicked");
                    break format!("kicked: {reason}");
                }
                Some(SessionEvent::End { reason }) => {
                    info!(%reason, "disconnected");
                    break reason;
                }
                Some(SessionEvent::Error { message }) => {
                    warn!(%message, "transport error");
                }
                None => break "event stream closed".to_owned(),
            }
        };

        active.teardown();
        let uptime = Utc::now().signed_duration_since(ctx.created_at());
        info!(%reason, uptime_secs = uptime.num_seconds(), "session ended");
        Some(reason)
    }

    fn publish(&self, state: LifecycleState) {
        debug!(generation = state.generation(), ?state, "lifecycle state changed");
        self.state_tx.send_replace(state);
    }
}
