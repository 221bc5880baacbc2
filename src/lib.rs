//! # Tello Pilot Library
//!
//! Fly a Tello quadcopter with keyboard or joystick, with live
//! object-detection overlays.
//!
//! The core is a real-time control-and-perception loop: a single
//! cooperative tick drives input sampling, intent mapping, command
//! dispatch and the video pipeline against one stateful drone
//! connection that must never see conflicting or overlapping commands.

pub mod app;
pub mod config;
pub mod control;
pub mod detect;
pub mod error;
pub mod input;
pub mod link;
pub mod telemetry;
pub mod ui;
pub mod video;
