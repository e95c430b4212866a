//! Presence-keeping core.
//!
//! Covers the per-session context, the randomized action scheduler, the
//! per-tick hazard monitor, and the connect → spawn → disconnect →
//! reconnect lifecycle that wires them together.

pub mod active;
pub mod context;
pub mod controller;
pub mod dice;
pub mod hazard_monitor;
pub mod release;
pub mod scheduler;
