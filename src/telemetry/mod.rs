//! # Flight Log Module
//!
//! Records flight events to JSONL files with rotation.
//!
//! This module handles:
//! - Receiving flight events from the dispatcher and control loop
//! - Formatting as JSONL (JSON Lines) with UTC timestamps
//! - Writing to rotating log files (max N records per file)
//! - Retaining only the last M files
//!
//! Recording is fire-and-forget through an unbounded channel into a
//! writer task, so the control loop never waits on disk I/O. A
//! disabled handle swallows events without a running writer.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::FlightLogConfig;
use crate::error::Result;
use crate::link::state::TelemetryReport;

/// One recordable flight event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FlightEvent {
    Connected { battery_pct: u8 },
    ManeuverDispatched { maneuver: String },
    ManeuverCompleted { maneuver: String },
    ManeuverFailed { maneuver: String, error: String },
    ManeuverDropped { maneuver: String, reason: String },
    EmergencyStop,
    Telemetry { report: TelemetryReport },
    Shutdown,
}

/// A JSONL record: the event plus its wall-clock timestamp.
#[derive(Debug, Serialize)]
struct FlightRecord<'a> {
    ts: String,
    #[serde(flatten)]
    event: &'a FlightEvent,
}

/// Cheap cloneable recorder handed to the dispatcher and control loop.
#[derive(Debug, Clone)]
pub struct FlightLogHandle {
    tx: Option<mpsc::UnboundedSender<FlightEvent>>,
}

impl FlightLogHandle {
    /// A handle that drops every event; used when the flight log is
    /// disabled by configuration and in tests.
    #[must_use]
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Record an event. Never blocks, never fails the caller.
    pub fn record(&self, event: FlightEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}

/// The background writer for the flight log.
#[derive(Debug)]
pub struct FlightLog {
    task: JoinHandle<()>,
}

impl FlightLog {
    /// Start the writer task. Returns the log and its recorder handle.
    /// With `enabled = false` no file is touched and the handle is a
    /// no-op.
    pub fn start(config: &FlightLogConfig) -> Result<(Option<Self>, FlightLogHandle)> {
        if !config.enabled {
            return Ok((None, FlightLogHandle::disabled()));
        }

        let mut writer = RotatingWriter::create(
            PathBuf::from(&config.dir),
            config.max_records_per_file,
            config.max_files_to_keep,
        )?;
        info!("Flight log in {}", config.dir);

        let (tx, mut rx) = mpsc::unbounded_channel::<FlightEvent>();
        let task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let record = FlightRecord {
                    ts: chrono::Utc::now().to_rfc3339(),
                    event: &event,
                };
                match serde_json::to_string(&record) {
                    Ok(line) => {
                        if let Err(err) = writer.write_line(&line) {
                            warn!("Flight log write failed: {err}");
                        }
                    }
                    Err(err) => warn!("Flight log serialization failed: {err}"),
                }
            }
        });

        Ok((Some(Self { task }), FlightLogHandle { tx: Some(tx) }))
    }

    /// Wait for the writer to drain. Call after the last handle clone
    /// has been dropped.
    pub async fn finish(self) {
        let _ = self.task.await;
    }
}

/// Sequentially named JSONL files with record-count rotation and
/// file-count retention.
#[derive(Debug)]
struct RotatingWriter {
    dir: PathBuf,
    max_records: usize,
    max_files: usize,
    current: Option<BufWriter<File>>,
    records_in_current: usize,
    next_index: u32,
}

impl RotatingWriter {
    fn create(dir: PathBuf, max_records: usize, max_files: usize) -> Result<Self> {
        fs::create_dir_all(&dir)?;
        let next_index = Self::existing_indices(&dir)?
            .last()
            .map_or(1, |last| last + 1);
        Ok(Self {
            dir,
            max_records,
            max_files,
            current: None,
            records_in_current: 0,
            next_index,
        })
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        if self.current.is_none() || self.records_in_current >= self.max_records {
            self.rotate()?;
        }
        let writer = self.current.as_mut().expect("rotate opened a file");
        writeln!(writer, "{line}")?;
        writer.flush()?;
        self.records_in_current += 1;
        Ok(())
    }

    fn rotate(&mut self) -> Result<()> {
        let path = self.file_path(self.next_index);
        self.current = Some(BufWriter::new(File::create(&path)?));
        self.records_in_current = 0;
        self.next_index += 1;
        self.prune()?;
        Ok(())
    }

    fn prune(&self) -> Result<()> {
        let indices = Self::existing_indices(&self.dir)?;
        if indices.len() > self.max_files {
            for index in &indices[..indices.len() - self.max_files] {
                let path = self.file_path(*index);
                if let Err(err) = fs::remove_file(&path) {
                    warn!("Could not prune {}: {err}", path.display());
                }
            }
        }
        Ok(())
    }

    fn file_path(&self, index: u32) -> PathBuf {
        self.dir.join(format!("flight-{index:05}.jsonl"))
    }

    fn existing_indices(dir: &Path) -> Result<Vec<u32>> {
        let mut indices: Vec<u32> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                name.strip_prefix("flight-")?
                    .strip_suffix(".jsonl")?
                    .parse()
                    .ok()
            })
            .collect();
        indices.sort_unstable();
        Ok(indices)
    }
}
