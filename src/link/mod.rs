//! # Vehicle Link Module
//!
//! The connection to the drone over its WiFi network.
//!
//! This module handles:
//! - The UDP command socket (port 8889): acknowledged command exchange
//!   with a timeout, and fire-and-forget `rc` velocity updates
//! - Telemetry datagrams (port 8890) parsed into [`state::TelemetryReport`]
//! - The typed wire-command vocabulary in [`command`]
//! - The [`vehicle::Vehicle`] trait seam the control core dispatches
//!   against

pub mod command;
pub mod state;
pub mod vehicle;

use std::sync::Mutex as StdMutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::LinkConfig;
use crate::control::intent::{ControlAxis, FlipDirection, MotionDirection};
use crate::error::{PilotError, Result};

use command::ControlCommand;
use vehicle::Vehicle;

/// The four-axis velocity vector carried by the `rc` command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RcVector {
    left_right: i8,
    forward_back: i8,
    up_down: i8,
    yaw: i8,
}

/// Connection to a Tello drone.
///
/// The drone is a single stateful endpoint: acknowledged commands are
/// serialized behind an async mutex so two exchanges can never
/// interleave their replies. `rc` updates expect no reply and bypass
/// the mutex, which keeps the control tick free of transport latency.
pub struct TelloLink {
    sock: UdpSocket,
    exchange_lock: Mutex<()>,
    rc: StdMutex<RcVector>,
    command_timeout: Duration,
}

impl std::fmt::Debug for TelloLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelloLink")
            .field("command_timeout", &self.command_timeout)
            .finish_non_exhaustive()
    }
}

impl TelloLink {
    /// Bind the local command port, connect to the drone, and put it in
    /// SDK command mode.
    ///
    /// # Errors
    ///
    /// Returns a `Transport` error if the socket cannot be set up or the
    /// drone does not acknowledge the SDK-mode handshake — this is the
    /// one fatal startup error of the link.
    pub async fn connect(config: &LinkConfig) -> Result<Self> {
        let local_address = format!("0.0.0.0:{}", config.control_port);
        let drone_address = format!("{}:{}", config.host, config.control_port);

        debug!("Binding command socket at {local_address}");
        let sock = UdpSocket::bind(&local_address)
            .await
            .map_err(|e| PilotError::Transport(format!("bind {local_address}: {e}")))?;

        sock.connect(&drone_address)
            .await
            .map_err(|e| PilotError::Transport(format!("connect {drone_address}: {e}")))?;

        let link = Self {
            sock,
            exchange_lock: Mutex::new(()),
            rc: StdMutex::new(RcVector::default()),
            command_timeout: Duration::from_millis(config.command_timeout_ms),
        };

        info!("Connecting to drone at {drone_address}");
        link.exchange(ControlCommand::EnterSdkMode).await?;
        info!("Drone connected and in SDK mode");

        Ok(link)
    }

    /// Send an acknowledged command and wait for its reply.
    ///
    /// Replies are matched to requests by serializing exchanges; the
    /// wait is bounded by the configured command timeout.
    async fn exchange(&self, cmd: ControlCommand) -> Result<String> {
        let _guard = self.exchange_lock.lock().await;

        let wire = cmd.to_string();
        debug!("SEND {wire}");
        self.sock
            .send(wire.as_bytes())
            .await
            .map_err(|e| PilotError::Transport(format!("send {wire:?}: {e}")))?;

        let mut buf = [0u8; 256];
        let n = timeout(self.command_timeout, self.sock.recv(&mut buf))
            .await
            .map_err(|_| PilotError::CommandTimeout(self.command_timeout))?
            .map_err(|e| PilotError::Transport(format!("recv for {wire:?}: {e}")))?;

        let reply = String::from_utf8_lossy(&buf[..n]).trim().to_string();
        debug!("RECV {reply}");

        if cmd.is_query() {
            return Ok(reply);
        }
        if reply.eq_ignore_ascii_case("ok") {
            Ok(reply)
        } else {
            Err(PilotError::CommandRejected(reply))
        }
    }

    /// Send a command the drone does not acknowledge.
    async fn send_only(&self, cmd: ControlCommand) -> Result<()> {
        let wire = cmd.to_string();
        self.sock
            .send(wire.as_bytes())
            .await
            .map_err(|e| PilotError::Transport(format!("send {wire:?}: {e}")))?;
        Ok(())
    }

    /// Push the current rc vector to the drone.
    async fn drive(&self) -> Result<()> {
        let rc = *self.rc.lock().unwrap();
        self.send_only(ControlCommand::Rc {
            left_right: rc.left_right,
            forward_back: rc.forward_back,
            up_down: rc.up_down,
            yaw: rc.yaw,
        })
        .await
    }

    fn set_rc_component(&self, direction: MotionDirection, speed_cm_s: i32) {
        let magnitude = speed_cm_s.clamp(0, 100) as i8;
        let mut rc = self.rc.lock().unwrap();
        match direction {
            MotionDirection::Forward => rc.forward_back = magnitude,
            MotionDirection::Back => rc.forward_back = -magnitude,
            MotionDirection::Right => rc.left_right = magnitude,
            MotionDirection::Left => rc.left_right = -magnitude,
            MotionDirection::Up => rc.up_down = magnitude,
            MotionDirection::Down => rc.up_down = -magnitude,
            MotionDirection::YawRight => rc.yaw = magnitude,
            MotionDirection::YawLeft => rc.yaw = -magnitude,
        }
    }

    fn clear_rc_axis(&self, axis: ControlAxis) {
        let mut rc = self.rc.lock().unwrap();
        match axis {
            ControlAxis::Longitudinal => rc.forward_back = 0,
            ControlAxis::Lateral => rc.left_right = 0,
            ControlAxis::Vertical => rc.up_down = 0,
            ControlAxis::Yaw => rc.yaw = 0,
        }
    }

    fn clear_rc(&self) {
        *self.rc.lock().unwrap() = RcVector::default();
    }

    /// Battery level in percent.
    pub async fn query_battery(&self) -> Result<u8> {
        let reply = self.exchange(ControlCommand::BatteryQuery).await?;
        reply
            .parse::<u8>()
            .map_err(|_| PilotError::Transport(format!("bad battery reply {reply:?}")))
    }

    /// Terminate the connection: land if still airborne, then stop the
    /// video stream. Faults here are logged, not propagated — shutdown
    /// must complete regardless.
    pub async fn end(&self, flying: bool) {
        if flying {
            info!("Still airborne at shutdown, landing");
            if let Err(err) = self.land().await {
                warn!("Landing during shutdown failed: {err}");
            }
        }
        if let Err(err) = self.stream_off().await {
            warn!("streamoff during shutdown failed: {err}");
        }
    }
}

#[async_trait]
impl Vehicle for TelloLink {
    async fn take_off(&self) -> Result<()> {
        self.exchange(ControlCommand::TakeOff).await?;
        Ok(())
    }

    async fn land(&self) -> Result<()> {
        self.clear_rc();
        self.exchange(ControlCommand::Land).await?;
        Ok(())
    }

    async fn emergency_stop(&self) -> Result<()> {
        self.clear_rc();
        self.send_only(ControlCommand::Emergency).await
    }

    async fn flip(&self, direction: FlipDirection) -> Result<()> {
        self.exchange(ControlCommand::Flip(direction)).await?;
        Ok(())
    }

    async fn move_continuous(&self, direction: MotionDirection, speed_cm_s: i32) -> Result<()> {
        self.set_rc_component(direction, speed_cm_s);
        self.drive().await
    }

    async fn halt(&self, axis: ControlAxis) -> Result<()> {
        self.clear_rc_axis(axis);
        self.drive().await
    }

    async fn stream_on(&self) -> Result<()> {
        self.exchange(ControlCommand::StreamOn).await?;
        Ok(())
    }

    async fn stream_off(&self) -> Result<()> {
        self.exchange(ControlCommand::StreamOff).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    /// A fake drone on localhost answering the SDK protocol.
    async fn fake_drone() -> (UdpSocket, u16) {
        let sock = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = sock.local_addr().unwrap().port();
        (sock, port)
    }

    async fn test_link(drone_port: u16, timeout_ms: u64) -> TelloLink {
        let sock = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sock.connect(("127.0.0.1", drone_port)).await.unwrap();
        TelloLink {
            sock,
            exchange_lock: Mutex::new(()),
            rc: StdMutex::new(RcVector::default()),
            command_timeout: Duration::from_millis(timeout_ms),
        }
    }

    async fn drone_answer(drone: &UdpSocket, reply: &str) -> String {
        let mut buf = [0u8; 256];
        let (n, peer) = drone.recv_from(&mut buf).await.unwrap();
        drone.send_to(reply.as_bytes(), peer).await.unwrap();
        String::from_utf8_lossy(&buf[..n]).to_string()
    }

    #[tokio::test]
    async fn test_exchange_accepts_ok() {
        let (drone, port) = fake_drone().await;
        let link = test_link(port, 1000).await;

        let drone_task = tokio::spawn(async move { drone_answer(&drone, "ok").await });
        link.exchange(ControlCommand::TakeOff).await.unwrap();
        assert_eq!(drone_task.await.unwrap(), "takeoff");
    }

    #[tokio::test]
    async fn test_exchange_rejects_error_reply() {
        let (drone, port) = fake_drone().await;
        let link = test_link(port, 1000).await;

        tokio::spawn(async move { drone_answer(&drone, "error Motor stop").await });
        let err = link.exchange(ControlCommand::Land).await.unwrap_err();
        assert!(matches!(err, PilotError::CommandRejected(_)));
    }

    #[tokio::test]
    async fn test_exchange_times_out_without_reply() {
        let (_drone, port) = fake_drone().await;
        let link = test_link(port, 50).await;

        let err = link.exchange(ControlCommand::TakeOff).await.unwrap_err();
        assert!(matches!(err, PilotError::CommandTimeout(_)));
    }

    #[tokio::test]
    async fn test_battery_query_parses_value() {
        let (drone, port) = fake_drone().await;
        let link = test_link(port, 1000).await;

        let drone_task = tokio::spawn(async move { drone_answer(&drone, "87").await });
        assert_eq!(link.query_battery().await.unwrap(), 87);
        assert_eq!(drone_task.await.unwrap(), "battery?");
    }

    #[tokio::test]
    async fn test_move_composes_rc_vector() {
        let (drone, port) = fake_drone().await;
        let link = test_link(port, 1000).await;

        link.move_continuous(MotionDirection::Forward, 25)
            .await
            .unwrap();
        let mut buf = [0u8; 64];
        let n = drone.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"rc 0 25 0 0");

        // a second axis keeps the first one's velocity
        link.move_continuous(MotionDirection::YawLeft, 50)
            .await
            .unwrap();
        let n = drone.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"rc 0 25 0 -50");

        link.halt(ControlAxis::Longitudinal).await.unwrap();
        let n = drone.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"rc 0 0 0 -50");
    }

    #[tokio::test]
    async fn test_emergency_clears_rc_and_sends_without_ack() {
        let (drone, port) = fake_drone().await;
        let link = test_link(port, 1000).await;

        link.move_continuous(MotionDirection::Up, 40).await.unwrap();
        let mut buf = [0u8; 64];
        let n = drone.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"rc 0 0 40 0");

        // no reply is ever sent, yet the call completes
        link.emergency_stop().await.unwrap();
        let n = drone.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"emergency");
        assert_eq!(*link.rc.lock().unwrap(), RcVector::default());
    }

    #[tokio::test]
    async fn test_speed_is_clamped_to_protocol_range() {
        let (drone, port) = fake_drone().await;
        let link = test_link(port, 1000).await;

        link.move_continuous(MotionDirection::Back, 500)
            .await
            .unwrap();
        let mut buf = [0u8; 64];
        let n = drone.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"rc 0 -100 0 0");
    }

    #[test]
    fn test_default_link_config_matches_tello() {
        let config = Config::default();
        assert_eq!(config.link.host, "192.168.10.1");
        assert_eq!(config.link.control_port, 8889);
    }
}
