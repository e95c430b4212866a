//! In-process simulated transport.
//!
//! A flat world driven by a background task: the agent spawns immediately,
//! physics ticks arrive every [`TICK_INTERVAL`], navigation goals are walked
//! toward in a straight line at [`WALK_SPEED`], and block names come from a
//! terrain function. Without a goal, held movement controls walk the agent
//! relative to its look direction. An optional session lifetime ends each
//! connection after a fixed time so the reconnect path can be exercised
//! locally.

use std::collections::BTreeSet;
use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, info_span, Instrument};

use super::{Block, Connection, Connector, MovementProfile, SessionEvent, SessionHandle};
use crate::config::AgentConfig;
use crate::models::control::{Control, NavigationGoal};
use crate::models::position::Position;
use crate::{AppError, Result};

/// Interval between simulated physics ticks (20 Hz).
pub const TICK_INTERVAL: Duration = Duration::from_millis(50);

/// Walking speed toward a goal, in blocks per second.
pub const WALK_SPEED: f64 = 4.3;

/// Walking speed multiplier while sneaking.
pub const SNEAK_FACTOR: f64 = 0.3;

/// Ruleset name reported by simulated sessions.
pub const SIM_RULESET: &str = "sim-flat";

const EVENT_BUFFER: usize = 256;

/// Maps a block-aligned position to a block name; `None` means unloaded.
pub type Terrain = Arc<dyn Fn(Position) -> Option<String> + Send + Sync>;

/// Static description of a simulated world.
#[derive(Clone)]
pub struct SimWorld {
    /// Where every session spawns.
    pub spawn: Position,
    /// Block lookup.
    pub terrain: Terrain,
}

impl Debug for SimWorld {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimWorld")
            .field("spawn", &self.spawn)
            .finish_non_exhaustive()
    }
}

impl SimWorld {
    /// A world with a custom terrain function.
    #[must_use]
    pub fn with_terrain(spawn: Position, terrain: Terrain) -> Self {
        Self { spawn, terrain }
    }

    /// A grass disc of `island_radius` under the spawn point, air elsewhere.
    #[must_use]
    pub fn flat_island(spawn: Position, island_radius: f64) -> Self {
        let ground_top = spawn.y.floor();
        let center = spawn.floored();
        let terrain: Terrain = Arc::new(move |pos: Position| {
            let name = if pos.y < ground_top && pos.horizontal_distance_to(center) <= island_radius
            {
                "grass_block"
            } else {
                "air"
            };
            Some(name.to_owned())
        });
        Self::with_terrain(spawn, terrain)
    }
}

/// Mutable state of one simulated session.
#[derive(Debug)]
struct SimState {
    spawned: bool,
    closed: bool,
    position: Position,
    goal: Option<NavigationGoal>,
    controls: BTreeSet<Control>,
    look: (f64, f64),
    profile: Option<MovementProfile>,
}

impl SimState {
    /// Move along the held direction controls relative to the look yaw.
    ///
    /// Yaw 0 faces negative z; right of that is positive x.
    fn walk_controls(&mut self, dt: Duration) {
        let held = |control: Control| i8::from(self.controls.contains(&control));
        let forward = held(Control::Forward) - held(Control::Back);
        let strafe = held(Control::Right) - held(Control::Left);
        if forward == 0 && strafe == 0 {
            return;
        }
        let (forward, strafe) = (f64::from(forward), f64::from(strafe));

        let mut speed = WALK_SPEED;
        if self.controls.contains(&Control::Sneak) {
            speed *= SNEAK_FACTOR;
        }
        let norm = forward.hypot(strafe);
        let stride = speed * dt.as_secs_f64() / norm;
        let (sin, cos) = self.look.0.sin_cos();
        let dx = (-sin * forward + cos * strafe) * stride;
        let dz = (-cos * forward - sin * strafe) * stride;
        self.position = self.position.offset(dx, 0.0, dz);
    }
}

/// One simulated connection.
pub struct SimSession {
    world: SimWorld,
    state: Mutex<SimState>,
}

impl SimSession {
    fn new(world: SimWorld) -> Self {
        let position = world.spawn;
        Self {
            world,
            state: Mutex::new(SimState {
                spawned: false,
                closed: false,
                position,
                goal: None,
                controls: BTreeSet::new(),
                look: (0.0, 0.0),
                profile: None,
            }),
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, SimState>> {
        self.state
            .lock()
            .map_err(|_| AppError::Transport("simulated session state poisoned".into()))
    }

    /// State guard for calls that need a live, spawned agent.
    fn steerable(&self) -> Result<MutexGuard<'_, SimState>> {
        let state = self.state()?;
        if state.closed {
            return Err(AppError::Control("session is closed".into()));
        }
        if !state.spawned {
            return Err(AppError::Control("agent has not spawned".into()));
        }
        Ok(state)
    }

    fn mark_spawned(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.spawned = true;
        }
    }

    fn close(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.closed = true;
            state.goal = None;
            state.controls.clear();
        }
    }

    /// Advance the agent by one tick: toward its goal if it has one,
    /// otherwise along the held movement controls.
    fn step(&self, dt: Duration) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        let Some(goal) = state.goal else {
            state.walk_controls(dt);
            return;
        };
        if goal.is_reached_by(state.position) {
            state.goal = None;
            return;
        }
        let target = goal.target();
        let remaining = state.position.distance_to(target);
        let stride = (WALK_SPEED * dt.as_secs_f64()).min(remaining);
        let scale = stride / remaining;
        let from = state.position;
        state.position = from.offset(
            (target.x - from.x) * scale,
            (target.y - from.y) * scale,
            (target.z - from.z) * scale,
        );
    }
}

impl SessionHandle for SimSession {
    fn position(&self) -> Option<Position> {
        let state = self.state.lock().ok()?;
        (state.spawned && !state.closed).then_some(state.position)
    }

    fn look_at(&self, yaw: f64, pitch: f64, _immediate: bool) -> Result<()> {
        self.steerable()?.look = (yaw, pitch);
        Ok(())
    }

    fn set_control_state(&self, control: Control, active: bool) -> Result<()> {
        let mut state = self.steerable()?;
        if active {
            state.controls.insert(control);
        } else {
            state.controls.remove(&control);
        }
        Ok(())
    }

    fn set_goal(&self, goal: NavigationGoal) -> Result<()> {
        let mut state = self.steerable()?;
        if state.profile.is_none() {
            return Err(AppError::Navigation("no movement profile installed".into()));
        }
        state.goal = Some(goal);
        Ok(())
    }

    fn block_at(&self, position: Position) -> Option<Block> {
        let position = position.floored();
        (self.world.terrain)(position).map(|name| Block { name, position })
    }

    fn init_movement_profile(&self) -> Result<MovementProfile> {
        let mut state = self.steerable()?;
        let profile = MovementProfile {
            ruleset: SIM_RULESET.to_owned(),
        };
        state.profile = Some(profile.clone());
        Ok(profile)
    }
}

/// Connector producing [`SimSession`]s.
#[derive(Debug)]
pub struct SimConnector {
    world: SimWorld,
    tick: Duration,
    session_lifetime: Option<Duration>,
    connects: AtomicU64,
}

impl SimConnector {
    /// Connector for `world` with the default tick rate and no lifetime limit.
    #[must_use]
    pub fn new(world: SimWorld) -> Self {
        Self {
            world,
            tick: TICK_INTERVAL,
            session_lifetime: None,
            connects: AtomicU64::new(0),
        }
    }

    /// End every session with a disconnect after `lifetime`.
    #[must_use]
    pub fn with_session_lifetime(mut self, lifetime: Option<Duration>) -> Self {
        self.session_lifetime = lifetime;
        self
    }

    /// Number of connections opened so far.
    #[must_use]
    pub fn connect_count(&self) -> u64 {
        self.connects.load(Ordering::SeqCst)
    }
}

impl Connector for SimConnector {
    fn connect<'a>(
        &'a self,
        config: &'a AgentConfig,
    ) -> Pin<Box<dyn Future<Output = Result<Connection>> + Send + 'a>> {
        Box::pin(async move {
            let attempt = self.connects.fetch_add(1, Ordering::SeqCst) + 1;
            info!(
                attempt,
                endpoint = %config.endpoint(),
                username = %config.username,
                auth_mode = ?config.auth_mode(),
                "opening simulated connection"
            );

            let session = Arc::new(SimSession::new(self.world.clone()));
            let (tx, rx) = mpsc::channel(EVENT_BUFFER);
            tokio::spawn(
                drive(
                    Arc::clone(&session),
                    tx,
                    self.tick,
                    self.session_lifetime,
                )
                .instrument(info_span!("sim_transport", attempt)),
            );

            Ok(Connection {
                session,
                events: rx,
            })
        })
    }
}

/// Background loop feeding events for one simulated session.
async fn drive(
    session: Arc<SimSession>,
    tx: mpsc::Sender<SessionEvent>,
    tick: Duration,
    lifetime: Option<Duration>,
) {
    session.mark_spawned();
    if tx.send(SessionEvent::Spawn).await.is_err() {
        session.close();
        return;
    }

    let started = Instant::now();
    let mut ticker = tokio::time::interval_at(started + tick, tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        if lifetime.is_some_and(|limit| started.elapsed() >= limit) {
            session.close();
            let _ = tx
                .send(SessionEvent::End {
                    reason: "session lifetime elapsed".into(),
                })
                .await;
            return;
        }

        session.step(tick);
        if tx.send(SessionEvent::PhysicsTick).await.is_err() {
            debug!("event receiver dropped; closing simulated session");
            session.close();
            return;
        }
    }
}
