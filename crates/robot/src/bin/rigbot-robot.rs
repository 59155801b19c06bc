//! Rigbot robot control server entry point.
//!
//! Opens the serial link to the motor controller (or falls back to demo
//! mode), starts the telemetry publisher and serves the control panel API.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use rigbot_core::config::RigConfig;
use rigbot_core::logging;
use rigbot_robot::RobotServer;

#[derive(Parser, Debug)]
#[command(author, version, about = "Robot control server", long_about = None)]
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

    /// Serial device of the motor controller (overrides the config file)
    #[arg(long)]
    serial_port: Option<String>,

    /// Run without a serial device
    #[arg(long, default_value_t = false)]
    demo: bool,
}

/// Main entry point.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = RigConfig::load_or_default(cli.config.as_deref())?;
    logging::init(cli.verbose, &config.logging);

    if let Some(bind) = cli.bind {
        config.robot.bind_addr = bind;
    }
    if let Some(port) = cli.serial_port {
        config.robot.serial.port = port;
    }
    if cli.demo {
        config.robot.serial.enabled = false;
    }

    info!("Starting robot control server...");
    if config.telemetry.resolved_api_key().is_some() {
        info!(
            "Telemetry will be published every {} seconds",
            config.telemetry.interval().as_secs()
        );
    }

    RobotServer::new(config.robot, config.telemetry).run().await?;

    Ok(())
}
