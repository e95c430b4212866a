//! The live agent state bound to one connection.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::context::SessionContext;
use super::dice::Dice;
use super::hazard_monitor::HazardMonitor;
use super::scheduler::{ActionScheduler, SchedulerHandle};
use crate::models::hazard::HazardClassification;
use crate::models::position::Position;
use crate::session::SessionHandle;

/// Components wired to one session: the action timer and the tick hook.
///
/// Both are absent until [`activate`](Self::activate) runs on spawn and are
/// removed again by [`teardown`](Self::teardown).
pub struct ActiveSession {
    ctx: Arc<SessionContext>,
    session: Arc<dyn SessionHandle>,
    scheduler: Option<SchedulerHandle>,
    monitor: Option<HazardMonitor>,
}

impl ActiveSession {
    /// Bind a connection to its context; nothing runs yet.
    #[must_use]
    pub fn new(ctx: Arc<SessionContext>, session: Arc<dyn SessionHandle>) -> Self {
        Self {
            ctx,
            session,
            scheduler: None,
            monitor: None,
        }
    }

    /// Session context.
    #[must_use]
    pub fn context(&self) -> &Arc<SessionContext> {
        &self.ctx
    }

    /// Whether the action timer is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.scheduler
            .as_ref()
            .is_some_and(SchedulerHandle::is_running)
    }

    /// Spawn handling: capture home, install movements, start the action
    /// timer, and register the tick hook.
    ///
    /// Returns the captured home, or `None` if the session was already
    /// active or the agent has no position yet.
    pub fn activate(&mut self, dice: Box<dyn Dice>) -> Option<Position> {
        if self.scheduler.is_some() {
            debug!("ignoring repeated spawn");
            return None;
        }
        let Some(home) = self.session.position() else {
            warn!("spawn reported without a position; waiting for the next spawn");
            return None;
        };

        self.ctx.set_home(home);
        match self.session.init_movement_profile() {
            Ok(profile) => {
                debug!(%profile, "movement profile installed");
                self.ctx.set_movement_profile(profile);
            }
            Err(err) => warn!(%err, "movement profile unavailable"),
        }

        info!(%home, "spawned, home position set");
        let scheduler =
            ActionScheduler::new(Arc::clone(&self.ctx), Arc::clone(&self.session), dice);
        self.scheduler = Some(scheduler.spawn());
        self.monitor = Some(HazardMonitor::new(
            Arc::clone(&self.ctx),
            Arc::clone(&self.session),
        ));
        Some(home)
    }

    /// Forward a simulation tick to the hazard monitor, if registered.
    pub fn on_tick(&self) -> Option<HazardClassification> {
        self.monitor.as_ref().and_then(HazardMonitor::on_tick)
    }

    /// Stop the timer, detach the tick hook, and invalidate pending releases.
    pub fn teardown(&mut self) {
        if let Some(scheduler) = self.scheduler.take() {
            scheduler.stop();
        }
        self.monitor = None;
        self.ctx.teardown();
        debug!(generation = self.ctx.generation(), "session torn down");
    }
}

impl Drop for ActiveSession {
    fn drop(&mut self) {
        self.ctx.teardown();
    }
}
