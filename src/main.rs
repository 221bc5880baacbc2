//! # Tello Pilot
//!
//! Fly a Tello quadcopter with keyboard or joystick, with live
//! object-detection overlays.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Set up logging (console + daily-rolling file)
//!    - Load configuration, falling back to defaults if no file exists
//! 2. **Flight**
//!    - Connect to the drone and start the video stream
//!    - Run the 100Hz control/perception tick loop
//! 3. **Shutdown**
//!    - Triggered by window close, Escape, or Ctrl+C
//!    - Lands the drone if it is still airborne

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::fmt::writer::MakeWriterExt;

use tello_pilot::app;
use tello_pilot::config::Config;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // console plus a daily-rolling file, env-filterable
    std::fs::create_dir_all("logs")?;
    let file_appender = tracing_appender::rolling::daily("logs", "tello-pilot.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stdout.and(file_writer))
        .init();

    info!("Tello Pilot v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let config = if std::path::Path::new(&config_path).exists() {
        info!("Loading configuration from {config_path}");
        Config::load(&config_path)?
    } else {
        warn!("No configuration at {config_path}, using defaults");
        Config::default()
    };

    app::run(config).await?;
    Ok(())
}
