//! # Pilot Application
//!
//! The top-level control loop: wires the samplers, mapper, dispatcher,
//! frame pipeline and window together, drives them from one fixed-rate
//! tick, and owns startup and shutdown sequencing.
//!
//! Startup order: connect vehicle → telemetry listener → video stream →
//! window → input samplers → tick loop. Shutdown runs whether the loop
//! ends by operator request, Ctrl+C, or a fault: stop accepting
//! intents, wait (bounded) for any in-flight maneuver, stop the video
//! stream, end the vehicle connection (landing first if still
//! airborne), and close out the flight log.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{info, warn};

use crate::config::Config;
use crate::control::dispatch::CommandDispatcher;
use crate::control::mapper::IntentMapper;
use crate::control::state::VehicleState;
use crate::detect::yolo::YoloDetector;
use crate::detect::Detector;
use crate::error::Result;
use crate::input::keyboard;
use crate::input::gamepad::GamepadSampler;
use crate::input::state::RawInputState;
use crate::link::state::{StateListener, TelemetryReport};
use crate::link::vehicle::Vehicle;
use crate::link::TelloLink;
use crate::telemetry::{FlightEvent, FlightLog, FlightLogHandle};
use crate::ui::PilotWindow;
use crate::video::overlay::OverlayPainter;
use crate::video::stream::VideoStream;
use crate::video::FramePipeline;

/// Period between telemetry snapshots in the flight log.
const TELEMETRY_LOG_PERIOD: Duration = Duration::from_secs(1);

/// Run the pilot until the operator quits.
pub async fn run(config: Config) -> Result<()> {
    let (flight_log, log_handle) = FlightLog::start(&config.flight_log)?;

    // vehicle connection: the one fatal link error, at startup only
    let link = Arc::new(TelloLink::connect(&config.link).await?);

    match link.query_battery().await {
        Ok(battery) => {
            info!("Battery level: {battery}%");
            log_handle.record(FlightEvent::Connected {
                battery_pct: battery,
            });
        }
        Err(err) => warn!("Battery query failed: {err}"),
    }

    let (state_listener, telemetry_rx) = StateListener::start(config.link.state_port).await?;

    // video is best-effort: a refused streamon leaves a black window
    if let Err(err) = link.stream_on().await {
        warn!("streamon failed, flying without video: {err}");
    }
    let (video_stream, frames_rx) = VideoStream::start(config.link.video_port)?;

    let detector = load_detector(&config);
    let pipeline = FramePipeline::new(
        frames_rx,
        detector,
        OverlayPainter::new(&config.detection.font_path),
        config.detection.confidence_threshold,
    );

    // the presentation surface is the other fatal startup dependency
    let mut window = PilotWindow::open(
        "Tello Pilot",
        config.video.width as usize,
        config.video.height as usize,
    )?;

    let gamepad = GamepadSampler::start(&config.gamepad);

    let vehicle_state = Arc::new(VehicleState::new(config.control.cruise_speed_cm_s));
    let dispatcher = CommandDispatcher::new(
        Arc::clone(&link) as Arc<dyn Vehicle>,
        Arc::clone(&vehicle_state),
        telemetry_rx.clone(),
        log_handle.clone(),
        Duration::from_millis(config.control.maneuver_timeout_ms),
    );

    info!(
        "Airborne controls ready (tick {}ms, cruise {}cm/s)",
        config.control.tick_ms, config.control.cruise_speed_cm_s
    );

    tick_loop(
        &config,
        &mut window,
        gamepad,
        &dispatcher,
        pipeline,
        telemetry_rx,
        &log_handle,
    )
    .await;

    // shutdown sequencing, idempotent by construction: each resource is
    // consumed or signalled exactly once
    info!("Shutting down");
    dispatcher.drain().await;
    video_stream.stop();
    state_listener.stop();
    link.end(vehicle_state.is_flying()).await;

    log_handle.record(FlightEvent::Shutdown);
    drop(log_handle);
    drop(dispatcher);
    if let Some(log) = flight_log {
        if tokio::time::timeout(Duration::from_secs(2), log.finish())
            .await
            .is_err()
        {
            warn!("Flight log did not drain in time");
        }
    }

    // presentation resources released last
    drop(window);

    info!("Shutdown complete");
    Ok(())
}

/// The cooperative tick loop: input sampling, intent mapping and
/// dispatch, then one frame-pipeline tick, every `tick_ms`. Exits on
/// window close, Escape, or Ctrl+C.
async fn tick_loop(
    config: &Config,
    window: &mut PilotWindow,
    gamepad: GamepadSampler,
    dispatcher: &CommandDispatcher,
    mut pipeline: FramePipeline,
    telemetry_rx: watch::Receiver<TelemetryReport>,
    log_handle: &FlightLogHandle,
) {
    let mapper = IntentMapper::new(config.control.deadzone);
    let vehicle_state = dispatcher.state();

    let mut ticker = interval(Duration::from_millis(config.control.tick_ms));
    // a slow detect pass drops ticks instead of accumulating a backlog
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut previous = RawInputState::neutral();
    let mut last_telemetry_log = Instant::now();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if window.close_requested() {
                    info!("Shutdown requested from window");
                    break;
                }

                let current = gamepad
                    .sample()
                    .merged(&keyboard::sample(&window.held_keys()));

                for intent in mapper.map(&current, &previous, vehicle_state.cruise_speed_cm_s()) {
                    dispatcher.dispatch(intent).await;
                }
                previous = current;

                match pipeline.tick() {
                    Some(image) => {
                        if let Err(err) = window.present(&image) {
                            warn!("Frame present failed: {err}");
                        }
                    }
                    // no new frame: keep the last image up
                    None => window.pump(),
                }

                if last_telemetry_log.elapsed() >= TELEMETRY_LOG_PERIOD {
                    let report = telemetry_rx.borrow().clone();
                    if report.seq > 0 {
                        log_handle.record(FlightEvent::Telemetry { report });
                    }
                    last_telemetry_log = Instant::now();
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }
}

fn load_detector(config: &Config) -> Option<Box<dyn Detector>> {
    if config.detection.model_path.is_empty() {
        info!("No detection model configured, overlay disabled");
        return None;
    }
    match YoloDetector::load(&config.detection.model_path) {
        Ok(detector) => Some(Box::new(detector)),
        Err(err) => {
            // flying without overlays beats not flying
            warn!("Detector unavailable: {err}");
            None
        }
    }
}
