//! Domain models shared by the scheduler, the hazard monitor, and the
//! session boundary.

pub mod action;
pub mod control;
pub mod hazard;
pub mod position;
