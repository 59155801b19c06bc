//! Robot control service for the rigbot rig.
//!
//! Relays drive commands from an HTTP control panel to the motor
//! microcontroller over a serial line, tracks the last known robot state and
//! publishes it to a telemetry endpoint on a fixed period.

#![deny(unsafe_code)]

pub mod assets;
pub mod command;
pub mod error;
pub mod relay;
pub mod router;
pub mod serial;
pub mod server;
pub mod telemetry;

pub use command::DriveCommand;
pub use error::{RobotError, RobotResult};
pub use relay::{CommandOutcome, CommandRelay, StatusOutcome, StateHandle};
pub use router::{build_router, AppState};
pub use serial::SerialLink;
pub use server::RobotServer;
pub use telemetry::{TelemetryInfo, TelemetryPoint, TelemetryPublisher};
