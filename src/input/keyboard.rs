//! # Keyboard Input
//!
//! Maps the presentation window's currently-held key set into a
//! [`RawInputState`]. A held movement key deflects its axis fully, so
//! key-down starts continuous movement and key-up produces the stop
//! edge through the mapper, with the same discipline as a stick
//! crossing the dead-zone. Opposing keys held together sum to zero and
//! cancel.
//!
//! ## Bindings
//!
//! | Key | Action |
//! |-----|--------|
//! | W / S | Up / Down |
//! | A / D | Yaw left / Yaw right |
//! | ↑ / ↓ | Forward / Back |
//! | ← / → | Strafe left / Strafe right |
//! | T | Take off |
//! | L | Land |
//! | Backspace | Emergency stop |
//! | U / O / I / K | Flip left / right / forward / back |

use minifb::Key;

use super::state::RawInputState;

/// Build an input snapshot from the window's held keys.
#[must_use]
pub fn sample(held: &[Key]) -> RawInputState {
    let mut state = RawInputState::neutral();

    for key in held {
        match key {
            Key::W => state.vertical += 1.0,
            Key::S => state.vertical -= 1.0,
            Key::A => state.yaw -= 1.0,
            Key::D => state.yaw += 1.0,
            Key::Up => state.longitudinal += 1.0,
            Key::Down => state.longitudinal -= 1.0,
            Key::Left => state.lateral -= 1.0,
            Key::Right => state.lateral += 1.0,

            Key::T => state.takeoff = true,
            Key::L => state.land = true,
            Key::Backspace => state.emergency = true,
            Key::U => state.flip_left = true,
            Key::O => state.flip_right = true,
            Key::I => state.flip_forward = true,
            Key::K => state.flip_back = true,

            _ => {}
        }
    }

    state.longitudinal = state.longitudinal.clamp(-1.0, 1.0);
    state.lateral = state.lateral.clamp(-1.0, 1.0);
    state.vertical = state.vertical.clamp(-1.0, 1.0);
    state.yaw = state.yaw.clamp(-1.0, 1.0);
    state
}
