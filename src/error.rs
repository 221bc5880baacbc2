//! # Error Types
//!
//! Custom error types for Tello Pilot using `thiserror`.
//!
//! The variants mirror where faults occur: the vehicle transport, the
//! input device, the video pipeline, the detector, the presentation
//! window, and configuration. Faults are contained and logged at the
//! component boundary where they arise; only a failure to establish the
//! initial vehicle connection or to open the window is fatal, and only
//! at startup.

use std::time::Duration;
use thiserror::Error;

/// Main error type for Tello Pilot
#[derive(Debug, Error)]
pub enum PilotError {
    /// Vehicle unreachable or the transport failed mid-command
    #[error("transport error: {0}")]
    Transport(String),

    /// The drone answered a command with something other than "ok"
    #[error("command rejected by drone: {0}")]
    CommandRejected(String),

    /// No acknowledgement within the command timeout
    #[error("command timed out after {0:?}")]
    CommandTimeout(Duration),

    /// No human-interface device present
    #[error("no input device found")]
    DeviceAbsent,

    /// Video frame missing or undecodable
    #[error("frame error: {0}")]
    Frame(String),

    /// Detection model failed on a frame
    #[error("detection error: {0}")]
    Detection(String),

    /// Presentation window errors
    #[error("window error: {0}")]
    Window(String),

    /// Telemetry datagram could not be parsed
    #[error("telemetry parse error: {0}")]
    TelemetryParse(String),

    /// Configuration value out of range
    #[error("configuration error: {0}")]
    Config(String),

    /// Configuration file could not be parsed
    #[error("configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Tello Pilot
pub type Result<T> = std::result::Result<T, PilotError>;
