//! # Joy Bridge
//!
//! Bridge a joystick or gamepad to an MQTT broker.
//!
//! Polls the input device, maps configured button presses and hat motions
//! to semantic values, and publishes each as a timestamped text payload.
//! Two modes share the same polling and shutdown machinery:
//!
//! - `describe`: log every input event, publish nothing (diagnostics)
//! - `publish`: the full pipeline (default)

use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::info;

use joy_bridge::bridge::Bridge;
use joy_bridge::config::Config;
use joy_bridge::controller::JoystickDevice;
use joy_bridge::mqtt::MqttConnection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Log every controller event without publishing
    Describe,
    /// Publish mapped events to the broker
    Publish,
}

/// Publish joystick and gamepad input events to an MQTT broker
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Operating mode
    #[arg(value_enum, default_value_t = Mode::Publish)]
    mode: Mode,

    /// Path to the configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    config: PathBuf,
}

/// Main entry point for Joy Bridge
///
/// Initializes logging, loads the configuration, opens the controller and
/// runs the selected mode until a termination signal or a fatal device
/// error stops the loop.
///
/// # Errors
///
/// Returns error if:
/// - The configuration cannot be loaded or is invalid
/// - No controller device can be opened
/// - The device fails while draining events
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    info!("Joy Bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::load(&args.config)?;
    info!("initialized {}", config.name);

    let joystick = JoystickDevice::open(&config.controller)?;
    info!("controller opened at {}", joystick.device_path());

    match args.mode {
        Mode::Describe => {
            Bridge::new(config, Box::new(joystick))
                .describe_events()
                .await?;
        }
        Mode::Publish => {
            let connection = MqttConnection::connect(&config.mqtt).await?;
            Bridge::new(config, Box::new(joystick))
                .publish_events(connection)
                .await?;
        }
    }

    Ok(())
}
