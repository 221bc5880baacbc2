//! # Command Dispatcher
//!
//! Serializes intents onto the single vehicle connection.
//!
//! Continuous movement intents are forwarded on the calling task; the
//! Tello `rc` command carries no acknowledgement, so the tick loop is
//! never blocked beyond a socket send. One-shot maneuvers are
//! long-running relative to the tick cadence and run on their own
//! spawned worker, bounded by a timeout, with the in-flight slot
//! claimed before the spawn and released unconditionally on completion.
//!
//! Policies:
//! - **One in-flight maneuver at a time.** A one-shot arriving while
//!   another executes is dropped (logged), never queued — a backlog
//!   would execute stale maneuvers against the vehicle.
//! - **Emergency stop preempts.** It is dispatched regardless of the
//!   in-flight slot and latches a lockout; no further one-shot is
//!   accepted until telemetry newer than the latch reports the vehicle
//!   grounded.
//! - **Takeoff/land toggle.** Takeoff while flying and land while
//!   grounded are no-ops, guarded before the slot is claimed.
//! - **Fault containment.** Worker faults and timeouts are logged and
//!   recorded; they never propagate into the control loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::link::state::TelemetryReport;
use crate::link::vehicle::Vehicle;
use crate::telemetry::{FlightEvent, FlightLogHandle};

use super::intent::{Intent, Maneuver};
use super::state::VehicleState;

/// The concurrency core: owns the vehicle state and the single
/// in-flight maneuver slot.
pub struct CommandDispatcher {
    vehicle: Arc<dyn Vehicle>,
    state: Arc<VehicleState>,
    telemetry: watch::Receiver<TelemetryReport>,
    flight_log: FlightLogHandle,
    maneuver_timeout: Duration,
}

impl CommandDispatcher {
    #[must_use]
    pub fn new(
        vehicle: Arc<dyn Vehicle>,
        state: Arc<VehicleState>,
        telemetry: watch::Receiver<TelemetryReport>,
        flight_log: FlightLogHandle,
        maneuver_timeout: Duration,
    ) -> Self {
        Self {
            vehicle,
            state,
            telemetry,
            flight_log,
            maneuver_timeout,
        }
    }

    /// Shared vehicle state, for the control loop's shutdown sequencing.
    #[must_use]
    pub fn state(&self) -> Arc<VehicleState> {
        Arc::clone(&self.state)
    }

    /// Dispatch one intent. Never blocks on vehicle acknowledgement.
    pub async fn dispatch(&self, intent: Intent) {
        match intent {
            Intent::Move {
                direction,
                speed_cm_s,
            } => {
                if let Err(err) = self.vehicle.move_continuous(direction, speed_cm_s).await {
                    warn!("Continuous move failed: {err}");
                }
            }
            Intent::Halt { axis } => {
                if let Err(err) = self.vehicle.halt(axis).await {
                    warn!("Axis halt failed: {err}");
                }
            }
            Intent::Maneuver(maneuver) => self.dispatch_maneuver(maneuver),
        }
    }

    fn dispatch_maneuver(&self, maneuver: Maneuver) {
        if maneuver == Maneuver::EmergencyStop {
            self.dispatch_emergency();
            return;
        }

        if self.state.is_locked_out() && !self.try_release_lockout() {
            warn!("Dropped {maneuver}: emergency lockout active");
            self.flight_log.record(FlightEvent::ManeuverDropped {
                maneuver: maneuver.to_string(),
                reason: "emergency lockout".into(),
            });
            return;
        }

        // takeoff/land toggle on the flying flag
        match maneuver {
            Maneuver::TakeOff if self.state.is_flying() => {
                debug!("Ignoring takeoff: already flying");
                return;
            }
            Maneuver::Land if !self.state.is_flying() => {
                debug!("Ignoring land: already grounded");
                return;
            }
            _ => {}
        }

        if !self.state.begin_maneuver() {
            info!("Dropped {maneuver}: another maneuver is in flight");
            self.flight_log.record(FlightEvent::ManeuverDropped {
                maneuver: maneuver.to_string(),
                reason: "maneuver in flight".into(),
            });
            return;
        }

        info!("Dispatching {maneuver}");
        self.flight_log.record(FlightEvent::ManeuverDispatched {
            maneuver: maneuver.to_string(),
        });

        let vehicle = Arc::clone(&self.vehicle);
        let state = Arc::clone(&self.state);
        let flight_log = self.flight_log.clone();
        let timeout = self.maneuver_timeout;

        tokio::spawn(async move {
            let outcome =
                tokio::time::timeout(timeout, run_maneuver(vehicle.as_ref(), maneuver)).await;

            match outcome {
                Ok(Ok(())) => {
                    match maneuver {
                        Maneuver::TakeOff => state.set_flying(true),
                        Maneuver::Land => state.set_flying(false),
                        _ => {}
                    }
                    info!("Completed {maneuver}");
                    flight_log.record(FlightEvent::ManeuverCompleted {
                        maneuver: maneuver.to_string(),
                    });
                }
                Ok(Err(err)) => {
                    warn!("{maneuver} failed: {err}");
                    flight_log.record(FlightEvent::ManeuverFailed {
                        maneuver: maneuver.to_string(),
                        error: err.to_string(),
                    });
                }
                Err(_) => {
                    warn!("{maneuver} did not complete within {timeout:?}, releasing slot");
                    flight_log.record(FlightEvent::ManeuverFailed {
                        maneuver: maneuver.to_string(),
                        error: format!("timed out after {timeout:?}"),
                    });
                }
            }

            // unconditional: a failed maneuver must never lock out the next one
            state.end_maneuver();
        });
    }

    /// Emergency stop bypasses the in-flight slot entirely: it must
    /// reach the vehicle even while another maneuver executes.
    fn dispatch_emergency(&self) {
        warn!("EMERGENCY STOP");
        self.state.latch_lockout(self.telemetry.borrow().seq);
        self.flight_log.record(FlightEvent::EmergencyStop);

        let vehicle = Arc::clone(&self.vehicle);
        let state = Arc::clone(&self.state);
        let flight_log = self.flight_log.clone();

        tokio::spawn(async move {
            match vehicle.emergency_stop().await {
                Ok(()) => state.set_flying(false),
                Err(err) => {
                    warn!("Emergency stop transport fault: {err}");
                    flight_log.record(FlightEvent::ManeuverFailed {
                        maneuver: "emergency stop".into(),
                        error: err.to_string(),
                    });
                }
            }
        });
    }

    /// The lockout clears only once a telemetry report newer than the
    /// latch shows the vehicle on the ground.
    fn try_release_lockout(&self) -> bool {
        let report = self.telemetry.borrow();
        if report.seq > self.state.lockout_seq() && report.is_grounded() {
            info!("Emergency lockout released: vehicle reports grounded");
            self.state.release_lockout();
            self.state.set_flying(false);
            true
        } else {
            false
        }
    }

    /// Bounded wait for the in-flight worker during shutdown. Returns
    /// true if the slot drained in time.
    pub async fn drain(&self) -> bool {
        let deadline = tokio::time::Instant::now() + self.maneuver_timeout;
        while self.state.is_maneuvering() {
            if tokio::time::Instant::now() >= deadline {
                warn!("In-flight maneuver did not finish before shutdown");
                return false;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        true
    }
}

async fn run_maneuver(vehicle: &dyn Vehicle, maneuver: Maneuver) -> crate::error::Result<()> {
    match maneuver {
        Maneuver::TakeOff => vehicle.take_off().await,
        Maneuver::Land => vehicle.land().await,
        Maneuver::Flip(direction) => vehicle.flip(direction).await,
        // handled by dispatch_emergency, kept total for safety
        Maneuver::EmergencyStop => vehicle.emergency_stop().await,
    }
}
