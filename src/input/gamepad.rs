//! # Gamepad Sampler
//!
//! Reads a gamepad through the Linux evdev interface. A dedicated
//! reader thread performs the blocking event reads and folds them into
//! a shared snapshot; [`GamepadSampler::sample`] is a pure,
//! non-blocking state read that returns immediately with whatever the
//! device reports "now". No gamepad present degrades to a neutral
//! snapshot — it never fails the control loop.
//!
//! ## Default mapping
//!
//! | Input | evdev code | Action |
//! |-------|-----------|--------|
//! | Left stick X | ABS_X | Yaw |
//! | Left stick Y | ABS_Y | Up/Down (up = stick forward) |
//! | Right stick X | ABS_Z | Strafe left/right |
//! | Right stick Y | ABS_RZ | Forward/Back (forward = stick forward) |
//! | South button (A/×) | BTN_SOUTH | Take off |
//! | East button (B/○) | BTN_EAST | Land |
//! | North button (Y/△) | BTN_NORTH | Emergency stop |
//! | D-Pad | ABS_HAT0X/Y | Flips |

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use evdev::{AbsoluteAxisType, Device, InputEventKind, Key};
use tracing::{debug, info, warn};

use crate::config::GamepadConfig;
use crate::error::{PilotError, Result};
use super::state::RawInputState;

/// Normalizes raw absolute-axis values into -1.0..1.0.
#[derive(Debug, Clone, Copy)]
struct AxisRange {
    min: i32,
    max: i32,
    center: i32,
}

impl AxisRange {
    fn normalize(&self, value: i32) -> f32 {
        let clamped = value.clamp(self.min, self.max);
        if clamped >= self.center {
            (clamped - self.center) as f32 / (self.max - self.center) as f32
        } else {
            (clamped - self.center) as f32 / (self.center - self.min) as f32
        }
    }
}

/// Non-blocking view onto the gamepad's current state.
#[derive(Debug)]
pub struct GamepadSampler {
    shared: Arc<Mutex<RawInputState>>,
    connected: Arc<AtomicBool>,
}

impl GamepadSampler {
    /// Open the configured (or first detected) gamepad and start its
    /// reader thread. An absent device is logged and tolerated; the
    /// sampler then reports a neutral state forever.
    #[must_use]
    pub fn start(config: &GamepadConfig) -> Self {
        let shared = Arc::new(Mutex::new(RawInputState::neutral()));
        let connected = Arc::new(AtomicBool::new(false));

        match open_gamepad(config) {
            Ok(device) => {
                let name = device.name().unwrap_or("unknown").to_string();
                let id = device.input_id();
                info!(
                    "Using gamepad \"{}\" (vendor: 0x{:04x}, product: 0x{:04x})",
                    name,
                    id.vendor(),
                    id.product()
                );

                let range = AxisRange {
                    min: config.axis_min,
                    max: config.axis_max,
                    center: config.axis_center,
                };
                let shared_for_reader = Arc::clone(&shared);
                let connected_for_reader = Arc::clone(&connected);
                let spawned = std::thread::Builder::new()
                    .name("gamepad-reader".into())
                    .spawn(move || {
                        reader_loop(device, range, &shared_for_reader);
                        // reader only returns on device loss
                        connected_for_reader.store(false, Ordering::Release);
                        *shared_for_reader.lock().unwrap() = RawInputState::neutral();
                        warn!("Gamepad \"{}\" disconnected, input reverts to keyboard", name);
                    });
                match spawned {
                    Ok(_) => connected.store(true, Ordering::Release),
                    Err(err) => warn!("Gamepad reader thread failed to start: {err}"),
                }
            }
            Err(err) => {
                info!("No gamepad available ({err}), keyboard control only");
            }
        }

        Self { shared, connected }
    }

    /// Current input snapshot. Pure state read, returns immediately.
    #[must_use]
    pub fn sample(&self) -> RawInputState {
        *self.shared.lock().unwrap()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// A sampler with no device behind it, for tests and headless runs.
    #[must_use]
    pub fn disconnected() -> Self {
        Self {
            shared: Arc::new(Mutex::new(RawInputState::neutral())),
            connected: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// Open the configured device path, or scan `/dev/input` for the first
/// device that reports a gamepad south button.
fn open_gamepad(config: &GamepadConfig) -> Result<Device> {
    if !config.device_path.is_empty() {
        return Ok(Device::open(&config.device_path)?);
    }

    let input_dir = Path::new("/dev/input");
    let mut entries: Vec<PathBuf> = std::fs::read_dir(input_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy().starts_with("event"))
                .unwrap_or(false)
        })
        .collect();

    // deterministic selection when several devices are connected
    entries.sort();

    for path in entries {
        match Device::open(&path) {
            Ok(device) => {
                let is_gamepad = device
                    .supported_keys()
                    .map(|keys| keys.contains(Key::BTN_SOUTH))
                    .unwrap_or(false);
                if is_gamepad {
                    debug!("Found gamepad at {}", path.display());
                    return Ok(device);
                }
            }
            Err(err) => {
                // permission denied or not an input device, skip
                debug!("Could not open {}: {}", path.display(), err);
            }
        }
    }

    Err(PilotError::DeviceAbsent)
}

/// Blocking read loop folding device events into the shared snapshot.
fn reader_loop(mut device: Device, range: AxisRange, shared: &Mutex<RawInputState>) {
    loop {
        let events = match device.fetch_events() {
            Ok(events) => events,
            Err(err) => {
                debug!("Gamepad read failed: {err}");
                return;
            }
        };

        let mut state = shared.lock().unwrap();
        for event in events {
            match event.kind() {
                InputEventKind::AbsAxis(axis) => {
                    apply_axis_event(&mut state, range, axis, event.value());
                }
                InputEventKind::Key(key) => {
                    apply_key_event(&mut state, key, event.value() != 0);
                }
                _ => {
                    // sync and misc events carry no input
                }
            }
        }
    }
}

fn apply_axis_event(
    state: &mut RawInputState,
    range: AxisRange,
    axis: AbsoluteAxisType,
    value: i32,
) {
    match axis {
        AbsoluteAxisType::ABS_X => state.yaw = range.normalize(value),
        // sticks report "forward" as the low end of the range
        AbsoluteAxisType::ABS_Y => state.vertical = -range.normalize(value),
        AbsoluteAxisType::ABS_Z => state.lateral = range.normalize(value),
        AbsoluteAxisType::ABS_RZ => state.longitudinal = -range.normalize(value),

        AbsoluteAxisType::ABS_HAT0X => {
            state.flip_left = value < 0;
            state.flip_right = value > 0;
        }
        AbsoluteAxisType::ABS_HAT0Y => {
            state.flip_forward = value < 0;
            state.flip_back = value > 0;
        }

        _ => {
            // gyro, touchpad and trigger axes are unmapped
        }
    }
}

fn apply_key_event(state: &mut RawInputState, key: Key, pressed: bool) {
    match key {
        Key::BTN_SOUTH => state.takeoff = pressed,
        Key::BTN_EAST => state.land = pressed,
        Key::BTN_NORTH => state.emergency = pressed,
        _ => {
            // unmapped buttons
        }
    }
}
