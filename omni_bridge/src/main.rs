//! Haptic bridge daemon.
//!
//! Starts the device sampling task, opens the shared segment and runs the
//! control loop until Ctrl-C. Configuration comes from an optional TOML
//! file with CLI flags layered on top.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use omni_bridge::cycle::ControlLoop;
use omni_bridge::driver::SimDriver;
use omni_bridge::shutdown::ShutdownToken;
use omni_common::config::BridgeConfig;
use omni_common::regions::ShmVector3d;

#[derive(Debug, Parser)]
#[command(name = "omni_bridge", about = "Haptic device shared-memory bridge")]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Shared segment key (overrides the config file).
    #[arg(long)]
    key: Option<i32>,

    /// Control loop rate in Hz (overrides the config file).
    #[arg(long)]
    hz: Option<f64>,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json: bool,
}

fn setup_tracing(verbose: bool, json: bool) {
    let level = if verbose { "debug" } else { "info" };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(args: &Args) -> Result<BridgeConfig, omni_common::config::ConfigError> {
    let mut config = match &args.config {
        Some(path) => BridgeConfig::from_file(path)?,
        None => BridgeConfig::default(),
    };
    if let Some(key) = args.key {
        config.key = key;
    }
    if let Some(hz) = args.hz {
        config.rate_hz = hz;
    }
    config.validate()?;
    Ok(config)
}

fn main() -> ExitCode {
    let args = Args::parse();
    setup_tracing(args.verbose, args.json);

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    info!(key = config.key, rate_hz = config.rate_hz, "starting bridge");

    let shutdown = ShutdownToken::new();
    {
        let shutdown = shutdown.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            info!("termination requested");
            shutdown.request();
        }) {
            error!(error = %e, "failed to install signal handler");
            return ExitCode::FAILURE;
        }
    }

    let driver = Box::new(SimDriver::new(ShmVector3d::default()));
    let mut control = match ControlLoop::new(config, driver, shutdown) {
        Ok(control) => control,
        Err(e) => {
            error!(error = %e, "bridge startup failed");
            return ExitCode::FAILURE;
        }
    };

    control.run();
    info!("bridge terminated");
    ExitCode::SUCCESS
}
