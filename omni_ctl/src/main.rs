//! One-shot client for the bridge segment.
//!
//! Attaches to an existing segment, runs a single command and detaches:
//!
//! ```text
//! omni_ctl read position
//! omni_ctl --key 4242 write force 0.5 0.0 -0.5
//! omni_ctl info
//! ```

use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use omni_common::consts::DEFAULT_SHM_KEY;
use omni_shm::client::Command;
use omni_shm::{discovery, ShmChannel};

#[derive(Debug, Parser)]
#[command(name = "omni_ctl", about = "One-shot client for the haptic bridge segment")]
struct Args {
    /// Shared segment key.
    #[arg(long, default_value_t = DEFAULT_SHM_KEY)]
    key: i32,

    /// Command words, e.g. `read position` or `write force 0.5 0 -0.5`.
    #[arg(required = true, num_args = 1..)]
    command: Vec<String>,
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    // `info` reads the discovery metadata and never touches the segment.
    if args.command.len() == 1 && args.command[0] == "info" {
        let info = discovery::read_segment_info(args.key)?;
        println!("key {} size {} pid {}", info.key, info.size, info.pid);
        return Ok(());
    }

    let command = Command::parse(&args.command)?;
    let mut channel = ShmChannel::new(args.key);
    channel.attach()?;
    let output = command.execute(&mut channel)?;
    channel.close();

    let text = output.to_string();
    if !text.is_empty() {
        println!("{text}");
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            ExitCode::FAILURE
        }
    }
}
