//! # Input Module
//!
//! Operator input sampling.
//!
//! This module handles:
//! - Gamepad detection and event reading via evdev
//! - Keyboard sampling from the window's held-key set
//! - The shared per-tick input snapshot both sources produce

pub mod gamepad;
pub mod keyboard;
pub mod state;
