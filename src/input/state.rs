//! # Raw Input State
//!
//! A per-tick snapshot of operator input, shared by the gamepad and
//! keyboard samplers. Axis deflections are normalized to -1.0..1.0;
//! one-shot buttons are plain booleans whose edges the mapper detects
//! by comparing the current snapshot against the previous one.

/// Snapshot of all operator input for one control tick.
///
/// Axis sign conventions: positive `longitudinal` is forward, positive
/// `lateral` is right, positive `vertical` is up, positive `yaw` is
/// clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawInputState {
    /// Forward/back deflection, -1.0..1.0
    pub longitudinal: f32,
    /// Strafe left/right deflection, -1.0..1.0
    pub lateral: f32,
    /// Up/down deflection, -1.0..1.0
    pub vertical: f32,
    /// Rotation deflection, -1.0..1.0
    pub yaw: f32,

    // One-shot buttons (level state; the mapper edge-triggers them)
    pub takeoff: bool,
    pub land: bool,
    pub emergency: bool,
    pub flip_left: bool,
    pub flip_right: bool,
    pub flip_forward: bool,
    pub flip_back: bool,
}

impl RawInputState {
    /// A snapshot with all axes centered and all buttons released.
    /// This is what a missing input device reports.
    #[must_use]
    pub fn neutral() -> Self {
        Self::default()
    }

    /// True if any axis deflection exceeds the dead-zone.
    #[must_use]
    pub fn any_axis_active(&self, deadzone: f32) -> bool {
        self.longitudinal.abs() > deadzone
            || self.lateral.abs() > deadzone
            || self.vertical.abs() > deadzone
            || self.yaw.abs() > deadzone
    }

    /// True if any one-shot button is held.
    #[must_use]
    pub fn any_button_pressed(&self) -> bool {
        self.takeoff
            || self.land
            || self.emergency
            || self.flip_left
            || self.flip_right
            || self.flip_forward
            || self.flip_back
    }

    /// Combine two input sources (gamepad and keyboard) into one
    /// snapshot. Axes sum and clamp, so opposing inputs on the same
    /// axis cancel to zero; buttons OR together.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        Self {
            longitudinal: (self.longitudinal + other.longitudinal).clamp(-1.0, 1.0),
            lateral: (self.lateral + other.lateral).clamp(-1.0, 1.0),
            vertical: (self.vertical + other.vertical).clamp(-1.0, 1.0),
            yaw: (self.yaw + other.yaw).clamp(-1.0, 1.0),
            takeoff: self.takeoff || other.takeoff,
            land: self.land || other.land,
            emergency: self.emergency || other.emergency,
            flip_left: self.flip_left || other.flip_left,
            flip_right: self.flip_right || other.flip_right,
            flip_forward: self.flip_forward || other.flip_forward,
            flip_back: self.flip_back || other.flip_back,
        }
    }
}
