//! # Wire Commands
//!
//! Typed vocabulary for the Tello text-command protocol, with the exact
//! wire encoding each command serializes to. Commands fall into three
//! classes: control commands that the drone acknowledges with `ok` or
//! `error`, the unacknowledged `rc` velocity command, and `?`-suffixed
//! read commands that return a value.

use std::fmt;

use crate::control::intent::FlipDirection;

/// A command in the Tello SDK text protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// Enter SDK command mode; must be the first command after connect
    EnterSdkMode,
    TakeOff,
    Land,
    /// Stop all motors immediately; the drone sends no acknowledgement
    Emergency,
    Flip(FlipDirection),
    /// Continuous four-axis velocity, each component -100..100
    Rc {
        left_right: i8,
        forward_back: i8,
        up_down: i8,
        yaw: i8,
    },
    StreamOn,
    StreamOff,
    BatteryQuery,
}

impl ControlCommand {
    /// True if the drone answers this command; `rc` and `emergency` are
    /// fire-and-forget.
    #[must_use]
    pub fn expects_ack(&self) -> bool {
        !matches!(self, Self::Rc { .. } | Self::Emergency)
    }

    /// True for `?`-suffixed read commands whose reply carries a value
    /// instead of `ok`.
    #[must_use]
    pub fn is_query(&self) -> bool {
        matches!(self, Self::BatteryQuery)
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnterSdkMode => write!(f, "command"),
            Self::TakeOff => write!(f, "takeoff"),
            Self::Land => write!(f, "land"),
            Self::Emergency => write!(f, "emergency"),
            Self::Flip(direction) => {
                let code = match direction {
                    FlipDirection::Left => 'l',
                    FlipDirection::Right => 'r',
                    FlipDirection::Forward => 'f',
                    FlipDirection::Back => 'b',
                };
                write!(f, "flip {code}")
            }
            Self::Rc {
                left_right,
                forward_back,
                up_down,
                yaw,
            } => write!(f, "rc {left_right} {forward_back} {up_down} {yaw}"),
            Self::StreamOn => write!(f, "streamon"),
            Self::StreamOff => write!(f, "streamoff"),
            Self::BatteryQuery => write!(f, "battery?"),
        }
    }
}
