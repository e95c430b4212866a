//! Periodic randomized idle actions.
//!
//! Each session gets an [`ActionScheduler`] once the agent spawns. Every
//! action interval it draws one action from fixed probability bands
//! (wander, look around, jump, strafe/sneak) and performs it against the
//! session. Failures are logged per firing and never stop the timer.
//!
//! Timed releases (jump, strafe) are handed to
//! [`schedule_release`](super::release::schedule_release); a firing never
//! waits for them.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::context::SessionContext;
use super::dice::Dice;
use super::release::schedule_release;
use crate::models::action::{
    look_angles, strafe_hold, strafe_side, wander_target, ActionOutcome, ActionPlan, JUMP_HOLD,
};
use crate::models::control::{Control, NavigationGoal};
use crate::models::position::Position;
use crate::session::SessionHandle;
use crate::Result;

/// Builder for a per-session action timer.
///
/// Call [`spawn`](Self::spawn) to start the background timer task, or
/// [`fire`](Self::fire) to run a single firing inline.
pub struct ActionScheduler {
    ctx: Arc<SessionContext>,
    session: Arc<dyn SessionHandle>,
    dice: Box<dyn Dice>,
}

impl ActionScheduler {
    /// Construct a scheduler (does not start the timer yet).
    #[must_use]
    pub fn new(
        ctx: Arc<SessionContext>,
        session: Arc<dyn SessionHandle>,
        dice: Box<dyn Dice>,
    ) -> Self {
        Self { ctx, session, dice }
    }

    /// Sample the next action around `home`.
    pub fn plan(&mut self, home: Position) -> ActionPlan {
        match ActionOutcome::from_draw(self.dice.unit()) {
            ActionOutcome::Wander => {
                let angle = self.dice.unit();
                let radius = self.dice.unit();
                let target = wander_target(home, self.ctx.config().wander_radius, angle, radius);
                ActionPlan::Wander {
                    goal: NavigationGoal::near(target),
                }
            }
            ActionOutcome::LookAround => {
                let yaw_draw = self.dice.unit();
                let pitch_draw = self.dice.unit();
                let (yaw, pitch) = look_angles(yaw_draw, pitch_draw);
                ActionPlan::LookAround { yaw, pitch }
            }
            ActionOutcome::Jump => ActionPlan::Jump { hold: JUMP_HOLD },
            ActionOutcome::StrafeSneak => {
                let side = strafe_side(self.dice.unit());
                let hold = strafe_hold(self.dice.unit());
                ActionPlan::StrafeSneak { side, hold }
            }
        }
    }

    /// Perform `plan` against the session.
    ///
    /// Returns once every control call has been issued; releases run later.
    ///
    /// # Errors
    ///
    /// Propagates the first error reported by the session.
    pub fn execute(&self, plan: ActionPlan) -> Result<()> {
        match plan {
            ActionPlan::Wander { goal } => {
                info!(destination = %goal.target().floored(), "walking to");
                self.session.set_goal(goal)
            }
            ActionPlan::LookAround { yaw, pitch } => {
                info!(yaw, pitch, "looking around");
                self.session.look_at(yaw, pitch, true)
            }
            ActionPlan::Jump { hold } => {
                info!("jumping");
                self.hold_controls(&[Control::Jump], hold)
            }
            ActionPlan::StrafeSneak { side, hold } => {
                info!(side = ?side, hold_ms = hold.as_millis(), "strafing while sneaking");
                self.hold_controls(&[side.control(), Control::Sneak], hold)
            }
        }
    }

    /// Assert `controls` now and schedule their release after `hold`.
    ///
    /// If one control is rejected, the ones already asserted are still
    /// released on schedule and the error is returned.
    fn hold_controls(&self, controls: &[Control], hold: Duration) -> Result<()> {
        let mut asserted = Vec::with_capacity(controls.len());
        let mut outcome = Ok(());
        for &control in controls {
            match self.session.set_control_state(control, true) {
                Ok(()) => asserted.push(control),
                Err(err) => {
                    outcome = Err(err);
                    break;
                }
            }
        }
        if !asserted.is_empty() {
            schedule_release(
                Arc::clone(&self.ctx),
                Arc::clone(&self.session),
                asserted,
                hold,
            );
        }
        outcome
    }

    /// Run one firing.
    ///
    /// Returns `None` when there is nothing to act on (no live position, no
    /// home yet, or the session was superseded); otherwise the action that
    /// was attempted. Execution errors are logged here and not returned.
    pub fn fire(&mut self) -> Option<ActionOutcome> {
        if !self.ctx.is_current() {
            return None;
        }
        self.session.position()?;
        let home = self.ctx.home()?;

        let plan = self.plan(home);
        let outcome = plan.outcome();
        if let Err(err) = self.execute(plan) {
            warn!(%err, action = %outcome, "action loop error");
        }
        Some(outcome)
    }

    /// Spawn the background timer task and return a handle for controlling it.
    ///
    /// The first firing happens one full interval after spawning.
    #[must_use]
    pub fn spawn(self) -> SchedulerHandle {
        let period = self.ctx.config().action_interval();
        let cancel = self.ctx.cancellation().child_token();
        let span = info_span!(
            "action_scheduler",
            session_id = %self.ctx.id(),
            generation = self.ctx.generation()
        );

        let join_handle = tokio::spawn(self.run(period, cancel.clone()).instrument(span));

        SchedulerHandle {
            join_handle: Some(join_handle),
            cancel,
        }
    }

    /// Core timer loop.
    async fn run(mut self, period: Duration, cancel: CancellationToken) {
        let start = Instant::now()
            .checked_add(period)
            .unwrap_or_else(far_future);
        let mut ticker = tokio::time::interval_at(start, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!(period_ms = period.as_millis(), "action scheduler started");

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("action scheduler cancelled");
                    return;
                }
                _ = ticker.tick() => {}
            }

            self.fire();
        }
    }
}

/// Handle returned from [`ActionScheduler::spawn`] for controlling the timer.
pub struct SchedulerHandle {
    /// Task handle for the background timer loop.
    join_handle: Option<JoinHandle<()>>,
    /// Per-scheduler cancellation token; cancelled when the handle is dropped.
    cancel: CancellationToken,
}

impl Drop for SchedulerHandle {
    /// Stop the background timer when the handle is dropped.
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl SchedulerHandle {
    /// Stop the timer; no further firings happen after this returns.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Whether the timer has neither been stopped nor exited on its own.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
            && self
                .join_handle
                .as_ref()
                .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the timer and wait for the background task to exit.
    pub async fn await_completion(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.join_handle.take() {
            if let Err(err) = handle.await {
                error!(%err, "action scheduler task failed");
            }
        }
    }
}

/// Deadline used when an interval is too long to represent as an instant.
fn far_future() -> Instant {
    // Roughly thirty years, well inside every platform's instant range.
    Instant::now() + Duration::from_secs(86_400 * 365 * 30)
}
