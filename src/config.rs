//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{PilotError, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub link: LinkConfig,
    pub control: ControlConfig,
    pub gamepad: GamepadConfig,
    pub video: VideoConfig,
    pub detection: DetectionConfig,
    pub flight_log: FlightLogConfig,
}

/// Vehicle link configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LinkConfig {
    #[serde(default = "default_drone_host")]
    pub host: String,

    #[serde(default = "default_control_port")]
    pub control_port: u16,

    #[serde(default = "default_state_port")]
    pub state_port: u16,

    #[serde(default = "default_video_port")]
    pub video_port: u16,

    /// Acknowledgement timeout for one command exchange
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
}

/// Control loop configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ControlConfig {
    /// Tick period for the control/perception loop
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Axis deflection below this magnitude is treated as no input
    #[serde(default = "default_deadzone")]
    pub deadzone: f32,

    /// Speed for continuous movement commands, cm/s
    #[serde(default = "default_cruise_speed")]
    pub cruise_speed_cm_s: i32,

    /// Upper bound on a one-shot maneuver before its in-flight slot is
    /// force-cleared
    #[serde(default = "default_maneuver_timeout_ms")]
    pub maneuver_timeout_ms: u64,
}

/// Gamepad configuration
#[derive(Debug, Deserialize, Clone)]
pub struct GamepadConfig {
    /// Explicit evdev device path; empty means auto-detect
    #[serde(default)]
    pub device_path: String,

    /// Raw axis minimum as reported by the device
    #[serde(default = "default_axis_min")]
    pub axis_min: i32,

    /// Raw axis maximum as reported by the device
    #[serde(default = "default_axis_max")]
    pub axis_max: i32,

    /// Raw axis center (stick at rest)
    #[serde(default = "default_axis_center")]
    pub axis_center: i32,
}

/// Video stream configuration
#[derive(Debug, Deserialize, Clone)]
pub struct VideoConfig {
    #[serde(default = "default_video_width")]
    pub width: u32,

    #[serde(default = "default_video_height")]
    pub height: u32,
}

/// Object detection configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DetectionConfig {
    /// Path to an ONNX detection model; empty disables detection
    #[serde(default)]
    pub model_path: String,

    /// Detections below this confidence are discarded
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,

    /// TTF font for overlay labels; empty draws boxes without text
    #[serde(default)]
    pub font_path: String,
}

/// Flight log configuration
#[derive(Debug, Deserialize, Clone)]
pub struct FlightLogConfig {
    #[serde(default = "default_flight_log_enabled")]
    pub enabled: bool,

    #[serde(default = "default_flight_log_dir")]
    pub dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,
}

// Default value functions
fn default_drone_host() -> String { "192.168.10.1".to_string() }
fn default_control_port() -> u16 { 8889 }
fn default_state_port() -> u16 { 8890 }
fn default_video_port() -> u16 { 11111 }
fn default_command_timeout_ms() -> u64 { 7000 }

fn default_tick_ms() -> u64 { 10 }
fn default_deadzone() -> f32 { 0.2 }
fn default_cruise_speed() -> i32 { 25 }
fn default_maneuver_timeout_ms() -> u64 { 8000 }

fn default_axis_min() -> i32 { 0 }
fn default_axis_max() -> i32 { 255 }
fn default_axis_center() -> i32 { 128 }

fn default_video_width() -> u32 { 960 }
fn default_video_height() -> u32 { 720 }

fn default_confidence_threshold() -> f32 { 0.5 }

fn default_flight_log_enabled() -> bool { true }
fn default_flight_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }

impl Default for Config {
    fn default() -> Self {
        Self {
            link: LinkConfig {
                host: default_drone_host(),
                control_port: default_control_port(),
                state_port: default_state_port(),
                video_port: default_video_port(),
                command_timeout_ms: default_command_timeout_ms(),
            },
            control: ControlConfig {
                tick_ms: default_tick_ms(),
                deadzone: default_deadzone(),
                cruise_speed_cm_s: default_cruise_speed(),
                maneuver_timeout_ms: default_maneuver_timeout_ms(),
            },
            gamepad: GamepadConfig {
                device_path: String::new(),
                axis_min: default_axis_min(),
                axis_max: default_axis_max(),
                axis_center: default_axis_center(),
            },
            video: VideoConfig {
                width: default_video_width(),
                height: default_video_height(),
            },
            detection: DetectionConfig {
                model_path: String::new(),
                confidence_threshold: default_confidence_threshold(),
                font_path: String::new(),
            },
            flight_log: FlightLogConfig {
                enabled: default_flight_log_enabled(),
                dir: default_flight_log_dir(),
                max_records_per_file: default_max_records_per_file(),
                max_files_to_keep: default_max_files_to_keep(),
            },
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, TOML parsing fails,
    /// or validation fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.link.host.is_empty() {
            return Err(PilotError::Config("link host cannot be empty".into()));
        }

        if self.link.command_timeout_ms == 0 || self.link.command_timeout_ms > 30000 {
            return Err(PilotError::Config(
                "command_timeout_ms must be between 1 and 30000".into(),
            ));
        }

        if self.control.tick_ms == 0 || self.control.tick_ms > 1000 {
            return Err(PilotError::Config(
                "tick_ms must be between 1 and 1000".into(),
            ));
        }

        if !(0.0..=0.9).contains(&self.control.deadzone) {
            return Err(PilotError::Config(
                "deadzone must be between 0.0 and 0.9".into(),
            ));
        }

        // Tello rc magnitudes are percentages; cm/s maps 1:1 in this range
        if !(10..=100).contains(&self.control.cruise_speed_cm_s) {
            return Err(PilotError::Config(
                "cruise_speed_cm_s must be between 10 and 100".into(),
            ));
        }

        if self.control.maneuver_timeout_ms < self.link.command_timeout_ms {
            return Err(PilotError::Config(
                "maneuver_timeout_ms must not be shorter than command_timeout_ms".into(),
            ));
        }

        if self.gamepad.axis_min >= self.gamepad.axis_max {
            return Err(PilotError::Config(
                "gamepad axis_min must be less than axis_max".into(),
            ));
        }

        if self.gamepad.axis_center <= self.gamepad.axis_min
            || self.gamepad.axis_center >= self.gamepad.axis_max
        {
            return Err(PilotError::Config(
                "gamepad axis_center must be within the axis range".into(),
            ));
        }

        if self.video.width == 0 || self.video.height == 0 {
            return Err(PilotError::Config(
                "video dimensions must be non-zero".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.detection.confidence_threshold) {
            return Err(PilotError::Config(
                "confidence_threshold must be between 0.0 and 1.0".into(),
            ));
        }

        if self.flight_log.enabled {
            if self.flight_log.dir.is_empty() {
                return Err(PilotError::Config(
                    "flight_log dir cannot be empty when enabled".into(),
                ));
            }
            if self.flight_log.max_records_per_file == 0 {
                return Err(PilotError::Config(
                    "max_records_per_file must be greater than 0".into(),
                ));
            }
            if self.flight_log.max_files_to_keep == 0 {
                return Err(PilotError::Config(
                    "max_files_to_keep must be greater than 0".into(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.link.host, "192.168.10.1");
        assert_eq!(config.link.control_port, 8889);
        assert_eq!(config.link.state_port, 8890);
        assert_eq!(config.link.video_port, 11111);
        assert_eq!(config.control.tick_ms, 10);
        assert_eq!(config.control.cruise_speed_cm_s, 25);
        assert!((config.control.deadzone - 0.2).abs() < f32::EPSILON);
        assert!((config.detection.confidence_threshold - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_parse_empty_toml_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.control.cruise_speed_cm_s, 25);
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml = r#"
            [control]
            cruise_speed_cm_s = 50
            deadzone = 0.1

            [detection]
            model_path = "models/yolov8n.onnx"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.control.cruise_speed_cm_s, 50);
        assert!((config.control.deadzone - 0.1).abs() < f32::EPSILON);
        assert_eq!(config.detection.model_path, "models/yolov8n.onnx");
        // untouched sections keep defaults
        assert_eq!(config.link.control_port, 8889);
    }

    #[test]
    fn test_reject_zero_tick() {
        let mut config = Config::default();
        config.control.tick_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reject_out_of_range_cruise_speed() {
        let mut config = Config::default();
        config.control.cruise_speed_cm_s = 250;
        assert!(config.validate().is_err());

        config.control.cruise_speed_cm_s = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reject_maneuver_timeout_shorter_than_command_timeout() {
        let mut config = Config::default();
        config.control.maneuver_timeout_ms = 1000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reject_inverted_axis_range() {
        let mut config = Config::default();
        config.gamepad.axis_min = 255;
        config.gamepad.axis_max = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reject_bad_confidence_threshold() {
        let mut config = Config::default();
        config.detection.confidence_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reject_empty_flight_log_dir_when_enabled() {
        let mut config = Config::default();
        config.flight_log.dir = String::new();
        assert!(config.validate().is_err());

        // disabled flight log tolerates an empty dir
        config.flight_log.enabled = false;
        assert!(config.validate().is_ok());
    }
}
