//! Shared fakes for integration tests: scripted dice, a recording session
//! handle, and a connector that hands out recording sessions.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::time::Instant;

use afk_sentinel::agent::context::SessionContext;
use afk_sentinel::agent::dice::{Dice, DiceFactory};
use afk_sentinel::models::control::{Control, NavigationGoal};
use afk_sentinel::models::position::Position;
use afk_sentinel::session::{
    Block, Connection, Connector, MovementProfile, SessionEvent, SessionHandle,
};
use afk_sentinel::{AgentConfig, AppError, Result};

/// Dice that replay a fixed list of draws.
pub struct ScriptedDice(VecDeque<f64>);

impl Dice for ScriptedDice {
    fn unit(&mut self) -> f64 {
        self.0.pop_front().expect("dice script exhausted")
    }
}

pub fn scripted(draws: &[f64]) -> Box<dyn Dice> {
    Box::new(ScriptedDice(draws.iter().copied().collect()))
}

/// Factory whose every scheduler replays `draws`.
pub fn scripted_factory(draws: &[f64]) -> DiceFactory {
    let draws = draws.to_vec();
    Arc::new(move || scripted(&draws))
}

/// One successful call made against a [`RecordingSession`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Look { yaw: f64, pitch: f64, immediate: bool },
    Control { control: Control, active: bool },
    Goal(NavigationGoal),
    InitMovements,
}

#[derive(Default)]
struct Recorded {
    position: Option<Position>,
    blocks: HashMap<(i64, i64, i64), String>,
    calls: Vec<(Instant, Call)>,
}

/// Session handle that records every successful call with its time.
#[derive(Default)]
pub struct RecordingSession {
    inner: Mutex<Recorded>,
    fail_controls: AtomicBool,
    rejected_control: Mutex<Option<Control>>,
}

#[allow(clippy::cast_possible_truncation)]
fn block_key(position: Position) -> (i64, i64, i64) {
    let p = position.floored();
    (p.x as i64, p.y as i64, p.z as i64)
}

impl RecordingSession {
    pub fn at(position: Position) -> Arc<Self> {
        let session = Self::default();
        session.set_position(Some(position));
        Arc::new(session)
    }

    pub fn unspawned() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_position(&self, position: Option<Position>) {
        self.inner.lock().unwrap().position = position;
    }

    pub fn set_block(&self, position: Position, name: &str) {
        self.inner
            .lock()
            .unwrap()
            .blocks
            .insert(block_key(position), name.to_owned());
    }

    /// Make control and look calls fail until switched back.
    pub fn fail_controls(&self, fail: bool) {
        self.fail_controls.store(fail, Ordering::SeqCst);
    }

    /// Make every assertion or release of `control` fail.
    pub fn reject_control(&self, control: Control) {
        *self.rejected_control.lock().unwrap() = Some(control);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.timed_calls().into_iter().map(|(_, call)| call).collect()
    }

    pub fn timed_calls(&self) -> Vec<(Instant, Call)> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn goals(&self) -> Vec<NavigationGoal> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Goal(goal) => Some(goal),
                _ => None,
            })
            .collect()
    }

    pub fn last_goal(&self) -> Option<NavigationGoal> {
        self.goals().pop()
    }

    fn record(&self, call: Call) {
        self.inner.lock().unwrap().calls.push((Instant::now(), call));
    }

    fn check_controls(&self) -> Result<()> {
        if self.fail_controls.load(Ordering::SeqCst) {
            Err(AppError::Control("agent is not controllable".into()))
        } else {
            Ok(())
        }
    }
}

impl SessionHandle for RecordingSession {
    fn position(&self) -> Option<Position> {
        self.inner.lock().unwrap().position
    }

    fn look_at(&self, yaw: f64, pitch: f64, immediate: bool) -> Result<()> {
        self.check_controls()?;
        self.record(Call::Look {
            yaw,
            pitch,
            immediate,
        });
        Ok(())
    }

    fn set_control_state(&self, control: Control, active: bool) -> Result<()> {
        self.check_controls()?;
        if *self.rejected_control.lock().unwrap() == Some(control) {
            return Err(AppError::Control(format!("{control} is unavailable")));
        }
        self.record(Call::Control { control, active });
        Ok(())
    }

    fn set_goal(&self, goal: NavigationGoal) -> Result<()> {
        self.record(Call::Goal(goal));
        Ok(())
    }

    fn block_at(&self, position: Position) -> Option<Block> {
        let inner = self.inner.lock().unwrap();
        inner.blocks.get(&block_key(position)).map(|name| Block {
            name: name.clone(),
            position: position.floored(),
        })
    }

    fn init_movement_profile(&self) -> Result<MovementProfile> {
        self.record(Call::InitMovements);
        Ok(MovementProfile {
            ruleset: "test".into(),
        })
    }
}

/// A context with `home` already captured.
pub fn spawned_context(config: AgentConfig, home: Position) -> Arc<SessionContext> {
    let ctx = SessionContext::detached(Arc::new(config));
    ctx.set_home(home);
    Arc::new(ctx)
}

/// Let spawned tasks run without moving the paused clock.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

/// One connect call seen by [`FakeConnector`].
#[derive(Clone)]
pub struct Attempt {
    pub at: Instant,
    pub config: AgentConfig,
    pub events: mpsc::Sender<SessionEvent>,
    pub session: Arc<RecordingSession>,
}

/// Connector handing out recording sessions; spawn positions are taken in
/// order, the last one repeating.
pub struct FakeConnector {
    spawn_positions: Vec<Position>,
    fail_next: AtomicBool,
    attempts: Mutex<Vec<Attempt>>,
}

impl FakeConnector {
    pub fn new(spawn_positions: &[Position]) -> Arc<Self> {
        Arc::new(Self {
            spawn_positions: spawn_positions.to_vec(),
            fail_next: AtomicBool::new(false),
            attempts: Mutex::new(Vec::new()),
        })
    }

    pub fn fail_next_connect(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    pub fn attempt(&self, index: usize) -> Attempt {
        self.attempts.lock().unwrap()[index].clone()
    }

    /// Drop the stored event sender so the controller sees the stream close.
    pub fn hang_up(&self, index: usize) {
        let (detached, _) = mpsc::channel(1);
        self.attempts.lock().unwrap()[index].events = detached;
    }
}

impl Connector for FakeConnector {
    fn connect<'a>(
        &'a self,
        config: &'a AgentConfig,
    ) -> Pin<Box<dyn Future<Output = Result<Connection>> + Send + 'a>> {
        Box::pin(async move {
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(AppError::Transport("connection refused".into()));
            }

            let mut attempts = self.attempts.lock().unwrap();
            let position = self
                .spawn_positions
                .get(attempts.len())
                .or_else(|| self.spawn_positions.last())
                .copied()
                .unwrap_or_default();
            let session = RecordingSession::at(position);
            let (tx, rx) = mpsc::channel(64);
            attempts.push(Attempt {
                at: Instant::now(),
                config: config.clone(),
                events: tx,
                session: Arc::clone(&session),
            });

            Ok(Connection {
                session,
                events: rx,
            })
        })
    }
}
