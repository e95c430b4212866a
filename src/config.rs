//! Agent configuration parsing, environment overlay, and credential loading.
//!
//! Configuration is resolved once at startup: an optional TOML file supplies
//! base values, the `MC_*` / `AFK_*` environment keys override them, and the
//! password comes from the OS keychain with `MC_PASS` as fallback.

use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::{AppError, Result};

/// Delay between a disconnect and the next connect attempt.
///
/// Fixed; not exposed through configuration.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(8);

/// Keychain service name used for the account password.
const KEYRING_SERVICE: &str = "afk-sentinel";

/// Shortest action period handed to the timer; non-positive intervals are not
/// rejected, but a zero period cannot drive a timer.
const MIN_ACTION_INTERVAL: Duration = Duration::from_millis(1);

/// Environment keys recognized by [`AgentConfig::apply_overrides`].
pub mod keys {
    /// Server host name or address.
    pub const HOST: &str = "MC_HOST";
    /// Server port.
    pub const PORT: &str = "MC_PORT";
    /// Account user name.
    pub const USER: &str = "MC_USER";
    /// Account password (fallback when the keychain has none).
    pub const PASSWORD: &str = "MC_PASS";
    /// `"true"` selects offline authentication; anything else selects online.
    pub const OFFLINE: &str = "MC_OFFLINE";
    /// Wander radius in blocks.
    pub const WANDER_RADIUS: &str = "AFK_RADIUS";
    /// Seconds between scheduled actions.
    pub const ACTION_INTERVAL: &str = "AFK_INTERVAL";
}

/// How the transport should authenticate the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Authenticate against the account service with the password.
    Online,
    /// Connect unauthenticated (offline-mode servers).
    Offline,
}

fn default_host() -> String {
    "localhost".into()
}

fn default_port() -> u16 {
    35247
}

fn default_username() -> String {
    "AfkSentinel".into()
}

fn default_true() -> bool {
    true
}

fn default_wander_radius() -> f64 {
    6.0
}

fn default_action_interval() -> f64 {
    18.0
}

/// Immutable agent configuration shared by every session.
#[derive(Clone, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct AgentConfig {
    /// Server host.
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Account user name.
    #[serde(default = "default_username")]
    pub username: String,
    /// Account password (populated at runtime, never read from the file).
    #[serde(skip)]
    pub password: Option<String>,
    /// Whether to connect in offline (unauthenticated) mode.
    #[serde(default = "default_true")]
    pub offline: bool,
    /// How far from home the agent may wander, in blocks.
    #[serde(default = "default_wander_radius")]
    pub wander_radius: f64,
    /// Seconds between scheduled actions.
    #[serde(default = "default_action_interval")]
    pub action_interval_seconds: f64,
}

impl fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("offline", &self.offline)
            .field("wander_radius", &self.wander_radius)
            .field("action_interval_seconds", &self.action_interval_seconds)
            .finish()
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            username: default_username(),
            password: None,
            offline: default_true(),
            wander_radius: default_wander_radius(),
            action_interval_seconds: default_action_interval(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the file cannot be read, or
    /// `AppError::Config` if it contains invalid TOML.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string; missing keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Build configuration from defaults overlaid with the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a numeric key does not parse.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Overlay values from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a numeric key does not parse.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    /// Overlay values from an arbitrary key lookup (environment-style keys).
    ///
    /// Out-of-range radius or interval values are kept as given.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a numeric key does not parse.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(keys::HOST) {
            self.host = host;
        }
        if let Some(port) = lookup(keys::PORT) {
            self.port = parse_key(keys::PORT, &port)?;
        }
        if let Some(user) = lookup(keys::USER) {
            self.username = user;
        }
        if let Some(offline) = lookup(keys::OFFLINE) {
            self.offline = offline == "true";
        }
        if let Some(radius) = lookup(keys::WANDER_RADIUS) {
            self.wander_radius = parse_key(keys::WANDER_RADIUS, &radius)?;
        }
        if let Some(interval) = lookup(keys::ACTION_INTERVAL) {
            self.action_interval_seconds = parse_key(keys::ACTION_INTERVAL, &interval)?;
        }
        Ok(())
    }

    /// Load the account password from the OS keychain with `MC_PASS` fallback.
    ///
    /// A missing password is not an error; the agent then connects offline.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the keychain task panics.
    pub async fn load_credentials(&mut self) -> Result<()> {
        let keychain = tokio::task::spawn_blocking(|| {
            keyring::Entry::new(KEYRING_SERVICE, "mc_password")
                .and_then(|entry| entry.get_password())
        })
        .await
        .map_err(|err| AppError::Config(format!("keychain task panicked: {err}")))?;

        self.password = match keychain {
            Ok(value) if !value.is_empty() => Some(value),
            Ok(_) => {
                debug!("keychain password is empty, trying env var");
                env::var(keys::PASSWORD).ok()
            }
            Err(err) => {
                debug!(?err, "keychain lookup failed, trying env var");
                env::var(keys::PASSWORD).ok()
            }
        };

        if self.password.is_none() && !self.offline {
            warn!("online mode requested but no password found; connecting offline");
        }
        Ok(())
    }

    /// Effective authentication mode.
    #[must_use]
    pub fn auth_mode(&self) -> AuthMode {
        if self.offline || self.password.is_none() {
            AuthMode::Offline
        } else {
            AuthMode::Online
        }
    }

    /// `host:port` string for logging and transports.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Timer period between scheduled actions.
    ///
    /// Zero, negative, and NaN intervals map to the shortest period; values
    /// too large for a `Duration` saturate.
    #[must_use]
    pub fn action_interval(&self) -> Duration {
        let secs = self.action_interval_seconds;
        match Duration::try_from_secs_f64(secs) {
            Ok(period) => period.max(MIN_ACTION_INTERVAL),
            Err(_) if secs > 0.0 => Duration::MAX,
            Err(_) => MIN_ACTION_INTERVAL,
        }
    }
}

fn parse_key<T>(key: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|err| AppError::Config(format!("{key}={raw:?} is invalid: {err}")))
}
