//! Deferred control-state releases.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::context::SessionContext;
use crate::models::control::Control;
use crate::session::SessionHandle;

/// Release `controls` after `hold`, unless the session is superseded or torn
/// down first.
///
/// The deadline is fixed when this is called; the caller never waits on the
/// returned task.
pub fn schedule_release(
    ctx: Arc<SessionContext>,
    session: Arc<dyn SessionHandle>,
    controls: Vec<Control>,
    hold: Duration,
) -> JoinHandle<()> {
    let deadline = Instant::now() + hold;
    tokio::spawn(async move {
        tokio::select! {
            biased;
            () = ctx.cancellation().cancelled() => {
                debug!(
                    generation = ctx.generation(),
                    ?controls,
                    "release dropped: session torn down"
                );
                return;
            }
            () = tokio::time::sleep_until(deadline) => {}
        }

        if !ctx.is_current() {
            debug!(generation = ctx.generation(), ?controls, "release dropped: session superseded");
            return;
        }

        for control in controls {
            if let Err(err) = session.set_control_state(control, false) {
                warn!(%err, %control, "failed to release control");
            }
        }
    })
}
