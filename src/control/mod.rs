//! # Control Module
//!
//! The control half of the pilot loop.
//!
//! This module handles:
//! - The per-tick intent vocabulary
//! - Mapping input snapshots to intents (dead-zone, edge-triggering)
//! - Dispatching intents onto the vehicle connection with the
//!   single-in-flight-maneuver discipline
//! - The shared vehicle state and its atomic flags

pub mod dispatch;
pub mod intent;
pub mod mapper;
pub mod state;
