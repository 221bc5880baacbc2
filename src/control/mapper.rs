//! # Intent Mapper
//!
//! Translates a pair of input snapshots — this tick's and the previous
//! tick's — into an ordered sequence of [`Intent`]s. The mapper is
//! stateless: edge detection works entirely off the explicit
//! previous/current pair passed in each tick.
//!
//! ## Mapping rules
//!
//! - An axis deflection beyond the dead-zone starts continuous movement
//!   at the configured cruise speed. The `Move` fires on the crossing
//!   into the dead-zone's outside (or on a sign flip), not on every
//!   tick the stick is held — the vehicle holds its last velocity until
//!   countermanded.
//! - Crossing back below the dead-zone emits exactly one `Halt` for
//!   that axis so the vehicle does not coast indefinitely.
//! - One-shot buttons are edge-triggered: pressed this tick, not
//!   pressed the previous tick. Holding a button does not re-fire it.
//! - Maneuvers are emitted ahead of movement intents, emergency stop
//!   first of all.

use crate::input::state::RawInputState;

use super::intent::{ControlAxis, FlipDirection, Intent, Maneuver, MotionDirection};

/// Stateless intent mapper.
#[derive(Debug, Clone, Copy)]
pub struct IntentMapper {
    deadzone: f32,
}

impl IntentMapper {
    #[must_use]
    pub fn new(deadzone: f32) -> Self {
        Self {
            deadzone: deadzone.clamp(0.0, 0.9),
        }
    }

    /// Map one tick of input into intents, in dispatch order.
    #[must_use]
    pub fn map(
        &self,
        current: &RawInputState,
        previous: &RawInputState,
        cruise_speed_cm_s: i32,
    ) -> Vec<Intent> {
        let mut intents = Vec::new();

        // one-shots first, emergency ahead of everything
        if current.emergency && !previous.emergency {
            intents.push(Intent::Maneuver(Maneuver::EmergencyStop));
        }
        if current.takeoff && !previous.takeoff {
            intents.push(Intent::Maneuver(Maneuver::TakeOff));
        }
        if current.land && !previous.land {
            intents.push(Intent::Maneuver(Maneuver::Land));
        }
        for (held, was_held, direction) in [
            (current.flip_left, previous.flip_left, FlipDirection::Left),
            (current.flip_right, previous.flip_right, FlipDirection::Right),
            (
                current.flip_forward,
                previous.flip_forward,
                FlipDirection::Forward,
            ),
            (current.flip_back, previous.flip_back, FlipDirection::Back),
        ] {
            if held && !was_held {
                intents.push(Intent::Maneuver(Maneuver::Flip(direction)));
            }
        }

        for (axis, value, prev_value) in [
            (
                ControlAxis::Longitudinal,
                current.longitudinal,
                previous.longitudinal,
            ),
            (ControlAxis::Lateral, current.lateral, previous.lateral),
            (ControlAxis::Vertical, current.vertical, previous.vertical),
            (ControlAxis::Yaw, current.yaw, previous.yaw),
        ] {
            if let Some(intent) = self.map_axis(axis, value, prev_value, cruise_speed_cm_s) {
                intents.push(intent);
            }
        }

        intents
    }

    fn map_axis(
        &self,
        axis: ControlAxis,
        value: f32,
        prev_value: f32,
        cruise_speed_cm_s: i32,
    ) -> Option<Intent> {
        let active = value.abs() > self.deadzone;
        let was_active = prev_value.abs() > self.deadzone;

        if active {
            let direction = if value > 0.0 {
                axis.positive()
            } else {
                axis.negative()
            };
            let prev_direction = if prev_value > 0.0 {
                axis.positive()
            } else {
                axis.negative()
            };

            // fire on the crossing into active, or on a direction flip
            if !was_active || direction != prev_direction {
                return Some(Intent::Move {
                    direction,
                    speed_cm_s: cruise_speed_cm_s,
                });
            }
            None
        } else if was_active {
            Some(Intent::Halt { axis })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CRUISE: i32 = 25;

    fn mapper() -> IntentMapper {
        IntentMapper::new(0.2)
    }

    fn with_yaw(value: f32) -> RawInputState {
        RawInputState {
            yaw: value,
            ..RawInputState::neutral()
        }
    }

    // ==================== Axis Edge Tests ====================

    #[test]
    fn test_deflection_sequence_emits_one_move_and_one_halt() {
        // axis 0.0 -> 0.5 -> 0.1 -> 0.0 across four ticks
        let m = mapper();
        let states = [with_yaw(0.0), with_yaw(0.5), with_yaw(0.1), with_yaw(0.0)];

        let mut emitted = Vec::new();
        for pair in states.windows(2) {
            emitted.push(m.map(&pair[1], &pair[0], CRUISE));
        }

        assert_eq!(
            emitted[0],
            vec![Intent::Move {
                direction: MotionDirection::YawRight,
                speed_cm_s: CRUISE
            }]
        );
        // 0.1 is back inside the dead-zone: exactly one stop
        assert_eq!(emitted[1], vec![Intent::Halt { axis: ControlAxis::Yaw }]);
        // settling to 0.0 emits nothing further — no stream of stops
        assert!(emitted[2].is_empty());
    }

    #[test]
    fn test_held_deflection_does_not_refire() {
        let m = mapper();
        let intents = m.map(&with_yaw(0.8), &with_yaw(0.7), CRUISE);
        assert!(intents.is_empty());
    }

    #[test]
    fn test_direction_flip_reissues_move() {
        let m = mapper();
        let intents = m.map(&with_yaw(-0.8), &with_yaw(0.8), CRUISE);
        assert_eq!(
            intents,
            vec![Intent::Move {
                direction: MotionDirection::YawLeft,
                speed_cm_s: CRUISE
            }]
        );
    }

    #[test]
    fn test_deflection_below_deadzone_from_rest_is_silent() {
        let m = mapper();
        let intents = m.map(&with_yaw(0.15), &with_yaw(0.0), CRUISE);
        assert!(intents.is_empty());
    }

    #[test]
    fn test_each_axis_maps_to_its_directions() {
        let m = mapper();
        let neutral = RawInputState::neutral();

        let cases: [(fn(&mut RawInputState), MotionDirection); 8] = [
            (|s| s.longitudinal = 1.0, MotionDirection::Forward),
            (|s| s.longitudinal = -1.0, MotionDirection::Back),
            (|s| s.lateral = 1.0, MotionDirection::Right),
            (|s| s.lateral = -1.0, MotionDirection::Left),
            (|s| s.vertical = 1.0, MotionDirection::Up),
            (|s| s.vertical = -1.0, MotionDirection::Down),
            (|s| s.yaw = 1.0, MotionDirection::YawRight),
            (|s| s.yaw = -1.0, MotionDirection::YawLeft),
        ];

        for (setter, expected) in cases {
            let mut state = RawInputState::neutral();
            setter(&mut state);
            let intents = m.map(&state, &neutral, CRUISE);
            assert_eq!(
                intents,
                vec![Intent::Move {
                    direction: expected,
                    speed_cm_s: CRUISE
                }]
            );
        }
    }

    #[test]
    fn test_independent_axes_emit_together() {
        let m = mapper();
        let state = RawInputState {
            longitudinal: 1.0,
            yaw: -1.0,
            ..RawInputState::neutral()
        };
        let intents = m.map(&state, &RawInputState::neutral(), CRUISE);
        assert_eq!(intents.len(), 2);
        assert!(intents.contains(&Intent::Move {
            direction: MotionDirection::Forward,
            speed_cm_s: CRUISE
        }));
        assert!(intents.contains(&Intent::Move {
            direction: MotionDirection::YawLeft,
            speed_cm_s: CRUISE
        }));
    }

    // ==================== Button Edge Tests ====================

    #[test]
    fn test_buttons_are_edge_triggered() {
        let m = mapper();
        let pressed = RawInputState {
            takeoff: true,
            ..RawInputState::neutral()
        };

        let intents = m.map(&pressed, &RawInputState::neutral(), CRUISE);
        assert_eq!(intents, vec![Intent::Maneuver(Maneuver::TakeOff)]);

        // held across the next tick: no re-fire
        let intents = m.map(&pressed, &pressed, CRUISE);
        assert!(intents.is_empty());

        // release and press again fires again
        let intents = m.map(&pressed, &RawInputState::neutral(), CRUISE);
        assert_eq!(intents, vec![Intent::Maneuver(Maneuver::TakeOff)]);
    }

    #[test]
    fn test_flip_buttons() {
        let m = mapper();
        let state = RawInputState {
            flip_back: true,
            ..RawInputState::neutral()
        };
        let intents = m.map(&state, &RawInputState::neutral(), CRUISE);
        assert_eq!(
            intents,
            vec![Intent::Maneuver(Maneuver::Flip(FlipDirection::Back))]
        );
    }

    #[test]
    fn test_emergency_is_ordered_first() {
        let m = mapper();
        let state = RawInputState {
            emergency: true,
            takeoff: true,
            yaw: 1.0,
            ..RawInputState::neutral()
        };
        let intents = m.map(&state, &RawInputState::neutral(), CRUISE);
        assert_eq!(intents[0], Intent::Maneuver(Maneuver::EmergencyStop));
        assert_eq!(intents[1], Intent::Maneuver(Maneuver::TakeOff));
        assert_eq!(intents.len(), 3);
    }

    #[test]
    fn test_neutral_ticks_emit_nothing() {
        let m = mapper();
        let neutral = RawInputState::neutral();
        assert!(m.map(&neutral, &neutral, CRUISE).is_empty());
    }
}
