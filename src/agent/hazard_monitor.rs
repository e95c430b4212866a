//! Per-tick ground safety check.
//!
//! On every simulation tick the monitor looks at the block one unit below
//! the agent. Air, lava, or cactus sends the agent back home with a fresh
//! navigation goal, replacing whatever goal was active. The goal is
//! re-issued on every unsafe tick; safe ground leaves the current goal alone.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::context::SessionContext;
use crate::models::control::NavigationGoal;
use crate::models::hazard::HazardClassification;
use crate::session::SessionHandle;

/// Tick hook registered for a spawned session.
pub struct HazardMonitor {
    ctx: Arc<SessionContext>,
    session: Arc<dyn SessionHandle>,
    /// Whether the previous tick already logged an unsafe verdict.
    alerted: AtomicBool,
}

impl HazardMonitor {
    /// Construct a monitor for one session.
    #[must_use]
    pub fn new(ctx: Arc<SessionContext>, session: Arc<dyn SessionHandle>) -> Self {
        Self {
            ctx,
            session,
            alerted: AtomicBool::new(false),
        }
    }

    /// Handle one simulation tick.
    ///
    /// Returns the verdict for the block below the agent, or `None` when
    /// either the position or the block is unavailable.
    pub fn on_tick(&self) -> Option<HazardClassification> {
        let position = self.session.position()?;
        let block = self.session.block_at(position.below())?;
        let verdict = HazardClassification::classify(&block.name);

        match verdict {
            HazardClassification::Unsafe(reason) => {
                if self.alerted.swap(true, Ordering::Relaxed) {
                    debug!(block = %block.name, %reason, "still on unsafe ground");
                } else {
                    info!(
                        block = %block.name,
                        %reason,
                        "unsafe ground detected, moving back to home"
                    );
                }
                if let Some(home) = self.ctx.home() {
                    if let Err(err) = self.session.set_goal(NavigationGoal::near(home)) {
                        warn!(%err, "failed to request recovery goal");
                    }
                }
            }
            HazardClassification::Safe => {
                self.alerted.store(false, Ordering::Relaxed);
            }
        }

        Some(verdict)
    }
}
