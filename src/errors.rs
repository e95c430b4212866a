//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Configuration parsing or loading failure.
    Config(String),
    /// Connection or session transport failure.
    Transport(String),
    /// Control-state or look request rejected by the session.
    Control(String),
    /// Navigation goal could not be submitted.
    Navigation(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Transport(msg) => write!(f, "transport: {msg}"),
            Self::Control(msg) => write!(f, "control: {msg}"),
            Self::Navigation(msg) => write!(f, "navigation: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
