//! Rigbot camera server entry point.
//!
//! Starts the capture subprocess supervisor and an Axum HTTP server that
//! serves the viewer page and the MJPEG stream.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use rigbot_camera::CameraServer;
use rigbot_core::config::RigConfig;
use rigbot_core::logging;

#[derive(Parser, Debug)]
#[command(author, version, about = "MJPEG camera streaming server", long_about = None)]
struct Cli {
    /// Logging verbosity
    #[arg(short, long, default_value_t = 0, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file path
    #[arg(short, long, env = "RIGBOT_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on (overrides the config file)
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Capture program to run (overrides the config file)
    #[arg(long)]
    capture_program: Option<String>,
}

/// Main entry point.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = RigConfig::load_or_default(cli.config.as_deref())?;
    logging::init(cli.verbose, &config.logging);

    if let Some(bind) = cli.bind {
        config.camera.bind_addr = bind;
    }
    if let Some(program) = cli.capture_program {
        config.camera.capture.program = program;
    }

    info!(
        "Starting camera server ({} {}x{} @ {} fps)",
        config.camera.capture.program,
        config.camera.capture.width,
        config.camera.capture.height,
        config.camera.capture.framerate
    );

    CameraServer::new(config.camera).run().await?;

    Ok(())
}
