//! # Telemetry
//!
//! The drone pushes state datagrams to UDP port 8890 at its own
//! cadence, as `key:value;` pairs:
//!
//! ```text
//! pitch:0;roll:0;yaw:-3;vgx:0;vgy:0;vgz:1;templ:58;temph:60;tof:71;h:50;bat:82;baro:-57.14;time:14;agx:17.00;agy:-4.00;agz:-956.00;
//! ```
//!
//! The listener parses each datagram into a [`TelemetryReport`] and
//! publishes it latest-wins through a watch channel. Consumers: the
//! dispatcher (post-emergency lockout release) and the flight log.

use serde::Serialize;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{PilotError, Result};

/// One parsed state datagram, tagged with a monotonic sequence number
/// so consumers can distinguish fresh reports from stale ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TelemetryReport {
    pub seq: u64,
    pub pitch_deg: i16,
    pub roll_deg: i16,
    pub yaw_deg: i16,
    /// Height above the takeoff point, cm; 0 when grounded
    pub height_cm: i16,
    pub battery_pct: u8,
    pub barometer_cm: f32,
    pub time_of_flight_cm: u16,
    pub motor_time_s: u16,
    pub speed_x: i16,
    pub speed_y: i16,
    pub speed_z: i16,
}

impl TelemetryReport {
    /// Parse a raw `key:value;` state datagram. Unknown keys are
    /// ignored so SDK additions do not break the parser.
    pub fn from_datagram(raw: &str) -> Result<Self> {
        let mut report = TelemetryReport::default();

        for field in raw.trim().split(';') {
            if field.is_empty() {
                continue;
            }
            let (key, value) = field.split_once(':').ok_or_else(|| {
                PilotError::TelemetryParse(format!("malformed field {field:?}"))
            })?;

            match key {
                "pitch" => report.pitch_deg = parse_value(value)?,
                "roll" => report.roll_deg = parse_value(value)?,
                "yaw" => report.yaw_deg = parse_value(value)?,
                "h" => report.height_cm = parse_value(value)?,
                "bat" => report.battery_pct = parse_value(value)?,
                "baro" => report.barometer_cm = parse_value(value)?,
                "tof" => report.time_of_flight_cm = parse_value(value)?,
                "time" => report.motor_time_s = parse_value(value)?,
                "vgx" => report.speed_x = parse_value(value)?,
                "vgy" => report.speed_y = parse_value(value)?,
                "vgz" => report.speed_z = parse_value(value)?,
                _ => {}
            }
        }

        Ok(report)
    }

    /// Whether the drone reports itself on the ground.
    #[must_use]
    pub fn is_grounded(&self) -> bool {
        self.height_cm <= 0
    }
}

fn parse_value<T: std::str::FromStr>(s: &str) -> Result<T> {
    s.parse::<T>()
        .map_err(|_| PilotError::TelemetryParse(format!("bad value {s:?}")))
}

/// Background task receiving and publishing telemetry datagrams.
#[derive(Debug)]
pub struct StateListener {
    task: JoinHandle<()>,
}

impl StateListener {
    /// Bind the state port and start listening. Returns the listener
    /// handle and the latest-wins receiver.
    pub async fn start(port: u16) -> Result<(Self, watch::Receiver<TelemetryReport>)> {
        let local_address = format!("0.0.0.0:{port}");
        let sock = UdpSocket::bind(&local_address)
            .await
            .map_err(|e| PilotError::Transport(format!("bind {local_address}: {e}")))?;
        info!("Telemetry listener on {local_address}");

        let (tx, rx) = watch::channel(TelemetryReport::default());

        let task = tokio::spawn(async move {
            let mut buf = vec![0u8; 1024];
            let mut seq: u64 = 0;
            loop {
                let n = match sock.recv(&mut buf).await {
                    Ok(n) => n,
                    Err(err) => {
                        warn!("Telemetry receive failed: {err}");
                        continue;
                    }
                };

                let raw = String::from_utf8_lossy(&buf[..n]);
                match TelemetryReport::from_datagram(&raw) {
                    Ok(mut report) => {
                        seq += 1;
                        report.seq = seq;
                        // receiver side may be gone during shutdown
                        let _ = tx.send(report);
                    }
                    Err(err) => {
                        debug!("Dropped telemetry datagram: {err}");
                    }
                }
            }
        });

        Ok((Self { task }, rx))
    }

    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for StateListener {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "mid:-1;x:-100;y:-100;z:-100;mpry:-1,-1,-1;pitch:2;roll:-1;yaw:-3;vgx:0;vgy:0;vgz:1;templ:58;temph:60;tof:71;h:50;bat:82;baro:-57.14;time:14;agx:17.00;agy:-4.00;agz:-956.00;";

    #[test]
    fn test_parse_full_datagram() {
        let report = TelemetryReport::from_datagram(SAMPLE).unwrap();
        assert_eq!(report.pitch_deg, 2);
        assert_eq!(report.roll_deg, -1);
        assert_eq!(report.yaw_deg, -3);
        assert_eq!(report.height_cm, 50);
        assert_eq!(report.battery_pct, 82);
        assert!((report.barometer_cm + 57.14).abs() < 1e-3);
        assert_eq!(report.time_of_flight_cm, 71);
        assert_eq!(report.motor_time_s, 14);
        assert_eq!(report.speed_z, 1);
    }

    #[test]
    fn test_parse_ignores_unknown_keys() {
        let report = TelemetryReport::from_datagram("h:10;newfield:abc;bat:50;").unwrap();
        assert_eq!(report.height_cm, 10);
        assert_eq!(report.battery_pct, 50);
    }

    #[test]
    fn test_parse_rejects_malformed_field() {
        assert!(TelemetryReport::from_datagram("h:10;garbage;").is_err());
    }

    #[test]
    fn test_parse_rejects_bad_value() {
        assert!(TelemetryReport::from_datagram("h:notanumber;").is_err());
    }

    #[test]
    fn test_grounded_threshold() {
        let report = TelemetryReport::from_datagram("h:0;").unwrap();
        assert!(report.is_grounded());

        let report = TelemetryReport::from_datagram("h:50;").unwrap();
        assert!(!report.is_grounded());

        // the sensor can report slightly negative heights on the pad
        let report = TelemetryReport::from_datagram("h:-2;").unwrap();
        assert!(report.is_grounded());
    }

    #[test]
    fn test_trailing_whitespace_tolerated() {
        let report = TelemetryReport::from_datagram("h:25;bat:90;\r\n").unwrap();
        assert_eq!(report.height_cm, 25);
        assert_eq!(report.battery_pct, 90);
    }
}
