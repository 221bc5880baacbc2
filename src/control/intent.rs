//! # Intent Vocabulary
//!
//! The per-tick command vocabulary produced by the mapper and consumed
//! by the dispatcher. Intents are transient values: created from one
//! input snapshot, dispatched within the same tick, never queued.

use std::fmt;

/// A logical movement direction on one of the four control axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionDirection {
    Forward,
    Back,
    Left,
    Right,
    Up,
    Down,
    YawLeft,
    YawRight,
}

impl MotionDirection {
    /// The axis pair this direction belongs to. Opposing directions
    /// share an axis and are mutually exclusive within a tick.
    #[must_use]
    pub fn axis(&self) -> ControlAxis {
        match self {
            Self::Forward | Self::Back => ControlAxis::Longitudinal,
            Self::Left | Self::Right => ControlAxis::Lateral,
            Self::Up | Self::Down => ControlAxis::Vertical,
            Self::YawLeft | Self::YawRight => ControlAxis::Yaw,
        }
    }
}

/// One of the four logical control axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAxis {
    Longitudinal,
    Lateral,
    Vertical,
    Yaw,
}

impl ControlAxis {
    /// Positive direction for this axis (right / forward / up / yaw-right).
    #[must_use]
    pub fn positive(&self) -> MotionDirection {
        match self {
            Self::Longitudinal => MotionDirection::Forward,
            Self::Lateral => MotionDirection::Right,
            Self::Vertical => MotionDirection::Up,
            Self::Yaw => MotionDirection::YawRight,
        }
    }

    /// Negative direction for this axis (left / back / down / yaw-left).
    #[must_use]
    pub fn negative(&self) -> MotionDirection {
        match self {
            Self::Longitudinal => MotionDirection::Back,
            Self::Lateral => MotionDirection::Left,
            Self::Vertical => MotionDirection::Down,
            Self::Yaw => MotionDirection::YawLeft,
        }
    }
}

/// Direction of a flip maneuver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipDirection {
    Left,
    Right,
    Forward,
    Back,
}

impl fmt::Display for FlipDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Forward => "forward",
            Self::Back => "back",
        };
        write!(f, "{s}")
    }
}

/// A one-shot maneuver: a command with a defined start and completion,
/// as opposed to continuous velocity commands that persist until
/// countermanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Maneuver {
    TakeOff,
    Land,
    Flip(FlipDirection),
    EmergencyStop,
}

impl fmt::Display for Maneuver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TakeOff => write!(f, "takeoff"),
            Self::Land => write!(f, "land"),
            Self::Flip(d) => write!(f, "flip {d}"),
            Self::EmergencyStop => write!(f, "emergency stop"),
        }
    }
}

/// An intent produced by the mapper for a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Start (or redirect) continuous movement on one axis.
    Move {
        direction: MotionDirection,
        speed_cm_s: i32,
    },
    /// Explicit stop for one axis, emitted once on the dead-zone
    /// crossing so the vehicle does not coast indefinitely.
    Halt { axis: ControlAxis },
    /// A one-shot maneuver.
    Maneuver(Maneuver),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_axis_pairs() {
        assert_eq!(MotionDirection::Forward.axis(), ControlAxis::Longitudinal);
        assert_eq!(MotionDirection::Back.axis(), ControlAxis::Longitudinal);
        assert_eq!(MotionDirection::Left.axis(), ControlAxis::Lateral);
        assert_eq!(MotionDirection::Right.axis(), ControlAxis::Lateral);
        assert_eq!(MotionDirection::Up.axis(), ControlAxis::Vertical);
        assert_eq!(MotionDirection::Down.axis(), ControlAxis::Vertical);
        assert_eq!(MotionDirection::YawLeft.axis(), ControlAxis::Yaw);
        assert_eq!(MotionDirection::YawRight.axis(), ControlAxis::Yaw);
    }

    #[test]
    fn test_axis_signed_directions_round_trip() {
        for axis in [
            ControlAxis::Longitudinal,
            ControlAxis::Lateral,
            ControlAxis::Vertical,
            ControlAxis::Yaw,
        ] {
            assert_eq!(axis.positive().axis(), axis);
            assert_eq!(axis.negative().axis(), axis);
            assert_ne!(axis.positive(), axis.negative());
        }
    }

    #[test]
    fn test_maneuver_display() {
        assert_eq!(Maneuver::TakeOff.to_string(), "takeoff");
        assert_eq!(Maneuver::Land.to_string(), "land");
        assert_eq!(Maneuver::Flip(FlipDirection::Left).to_string(), "flip left");
        assert_eq!(Maneuver::EmergencyStop.to_string(), "emergency stop");
    }
}
