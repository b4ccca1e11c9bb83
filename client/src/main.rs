//! Coolwatch - device reader
//!
//! Reads JSON samples from the sensor board over serial (or stdin) and
//! forwards each one to the Coolwatch server.

mod config;
mod device;
mod forward;

use anyhow::{Context, Result};
use clap::Parser;
use config::ConfigSource;
use device::LineReader;
use forward::Forwarder;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Pause after a failed read before trying again
const READ_ERROR_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Parser, Debug)]
#[command(name = "coolwatch")]
#[command(version)]
#[command(about = "Forward cooling water sensor samples to the Coolwatch server", long_about = None)]
struct Args {
    /// Configuration file path [default: client.conf, if present]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial device, overrides [device] port
    #[arg(long)]
    port: Option<String>,

    /// Read samples from stdin instead of the serial port
    #[arg(long)]
    stdin: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let (mut config, source) = config::Config::locate(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.device.port = port;
    }

    let level: tracing::Level = config
        .logging
        .level
        .parse()
        .with_context(|| format!("Invalid log level '{}'", config.logging.level))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    info!("Coolwatch v{} - device reader", env!("CARGO_PKG_VERSION"));
    match &source {
        ConfigSource::File(path) => info!("Loaded configuration from {:?}", path),
        ConfigSource::Defaults => warn!(
            "No {} found, using built-in defaults",
            config::DEFAULT_CONFIG_PATH
        ),
    }

    let forwarder = Forwarder::new(&config.server)?;
    info!("Forwarding to {}", forwarder.url());

    let on_sample = |sample: policy::SensorInput| forward::forward_and_log(&forwarder, &sample);

    if args.stdin {
        info!("Reading samples from stdin");
        device::run(LineReader::new(std::io::stdin().lock()), READ_ERROR_BACKOFF, on_sample);
    } else {
        let port = device::open_serial(&config.device)?;
        info!("Reading samples (Press Ctrl+C to stop)");
        device::run(LineReader::new(port), READ_ERROR_BACKOFF, on_sample);
    }

    Ok(())
}
