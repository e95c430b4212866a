#![forbid(unsafe_code)]

//! Presence-keeping agent for a game session.
//!
//! Keeps a connection alive with randomized idle actions, walks back home
//! when the ground below turns hazardous, and reconnects after every
//! disconnect.

pub mod agent;
pub mod config;
pub mod errors;
pub mod models;
pub mod session;

pub use config::AgentConfig;
pub use errors::{AppError, Result};
