//! # Vehicle State
//!
//! The single piece of shared mutable state in the system. The tick
//! loop reads it before every dispatch decision; maneuver workers write
//! the completion flags. All fields are atomics behind narrow
//! accessors, so a takeoff/land decision can never race an in-progress
//! flip on stale plain-field reads.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};

/// Shared vehicle state owned by the command dispatcher.
///
/// Invariant: at most one one-shot maneuver is in flight at a time.
/// The in-flight slot is claimed with [`VehicleState::begin_maneuver`]
/// (a compare-exchange, so two claimants can never both win) and
/// released unconditionally by the worker on completion.
#[derive(Debug, Default)]
pub struct VehicleState {
    flying: AtomicBool,
    maneuvering: AtomicBool,
    lockout: AtomicBool,
    lockout_seq: AtomicU64,
    cruise_speed_cm_s: AtomicI32,
}

impl VehicleState {
    #[must_use]
    pub fn new(cruise_speed_cm_s: i32) -> Self {
        Self {
            cruise_speed_cm_s: AtomicI32::new(cruise_speed_cm_s),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_flying(&self) -> bool {
        self.flying.load(Ordering::Acquire)
    }

    pub fn set_flying(&self, flying: bool) {
        self.flying.store(flying, Ordering::Release);
    }

    #[must_use]
    pub fn is_maneuvering(&self) -> bool {
        self.maneuvering.load(Ordering::Acquire)
    }

    /// Claim the single in-flight maneuver slot. Returns false if a
    /// maneuver is already executing, in which case the caller must
    /// drop its intent rather than queue it.
    #[must_use]
    pub fn begin_maneuver(&self) -> bool {
        self.maneuvering
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Release the in-flight slot. Called unconditionally by the worker
    /// whether the maneuver succeeded, faulted, or timed out, so a
    /// single failure can never lock out future maneuvers.
    pub fn end_maneuver(&self) {
        self.maneuvering.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn is_locked_out(&self) -> bool {
        self.lockout.load(Ordering::Acquire)
    }

    /// Latch the post-emergency lockout, remembering the telemetry
    /// sequence number current at latch time. Only a report newer than
    /// this may release the lockout.
    pub fn latch_lockout(&self, telemetry_seq: u64) {
        self.lockout_seq.store(telemetry_seq, Ordering::Release);
        self.lockout.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn lockout_seq(&self) -> u64 {
        self.lockout_seq.load(Ordering::Acquire)
    }

    pub fn release_lockout(&self) {
        self.lockout.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn cruise_speed_cm_s(&self) -> i32 {
        self.cruise_speed_cm_s.load(Ordering::Relaxed)
    }

    pub fn set_cruise_speed_cm_s(&self, speed: i32) {
        self.cruise_speed_cm_s.store(speed, Ordering::Relaxed);
    }
}
