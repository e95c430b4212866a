#![forbid(unsafe_code)]

//! `afk-sentinel`: presence-keeping agent binary.
//!
//! Resolves configuration, then runs the session lifecycle controller
//! against the in-process simulated transport until Ctrl-C / SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use afk_sentinel::agent::controller::SessionLifecycleController;
use afk_sentinel::agent::dice::seeded_factory;
use afk_sentinel::models::position::Position;
use afk_sentinel::session::sim::{SimConnector, SimWorld};
use afk_sentinel::{AgentConfig, AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "afk-sentinel", about = "Presence-keeping game agent", version, long_about = None)]
struct Cli {
    /// Optional TOML configuration file; environment keys override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Radius of the simulated grass island around spawn.
    #[arg(long, default_value_t = 24.0)]
    island_radius: f64,

    /// End each simulated session after this many seconds.
    #[arg(long)]
    session_lifetime_secs: Option<u64>,

    /// Seed the action dice for a reproducible run.
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("afk-sentinel bootstrap");

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = match &args.config {
        Some(path) => AgentConfig::load_from_path(path)?,
        None => AgentConfig::default(),
    };
    config.apply_env()?;
    config.load_credentials().await?;
    info!(
        endpoint = %config.endpoint(),
        username = %config.username,
        auth_mode = ?config.auth_mode(),
        wander_radius = config.wander_radius,
        action_interval_secs = config.action_interval_seconds,
        "configuration loaded"
    );

    // ── Build the transport and controller ──────────────
    let world = SimWorld::flat_island(Position::new(0.5, 64.0, 0.5), args.island_radius);
    let connector = Arc::new(
        SimConnector::new(world)
            .with_session_lifetime(args.session_lifetime_secs.map(Duration::from_secs)),
    );

    let shutdown = CancellationToken::new();
    let mut controller = SessionLifecycleController::new(config, connector, shutdown.clone());
    if let Some(seed) = args.seed {
        controller = controller.with_dice(seeded_factory(seed));
    }

    let controller_handle = tokio::spawn(controller.run());

    // ── Wait for shutdown signal ────────────────────────
    let signal = shutdown_signal().await;
    info!(signal, "shutdown requested, stopping agent");
    shutdown.cancel();

    if let Err(err) = controller_handle.await {
        error!(%err, "session controller task failed");
    }
    info!("afk-sentinel shut down");

    Ok(())
}

/// Resolve with the name of the signal that asked the agent to stop.
async fn shutdown_signal() -> &'static str {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => tokio::select! {
                result = tokio::signal::ctrl_c() => interrupted(result),
                _ = sigterm.recv() => "SIGTERM",
            },
            Err(err) => {
                tracing::warn!(%err, "SIGTERM handler unavailable, stopping on Ctrl-C only");
                interrupted(tokio::signal::ctrl_c().await)
            }
        }
    }

    #[cfg(not(unix))]
    {
        interrupted(tokio::signal::ctrl_c().await)
    }
}

fn interrupted(result: std::io::Result<()>) -> &'static str {
    if let Err(err) = result {
        error!(%err, "Ctrl-C handler failed, stopping the agent");
    }
    "Ctrl-C"
}

/// Install the global subscriber. `RUST_LOG` overrides the `info` default.
fn init_tracing(log_format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|err| AppError::Config(format!("invalid log filter: {err}")))?;
    let builder = fmt().with_env_filter(filter);

    let installed = match log_format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().flatten_event(true).try_init(),
    };
    installed.map_err(|err| AppError::Config(format!("failed to install log subscriber: {err}")))
}
