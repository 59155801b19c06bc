//! Core types, errors, and configuration for rigbot
//!
//! This crate holds what the camera streaming service and the robot control
//! service share: the TOML configuration document, the error type, the
//! tracing bootstrap, and the robot state model.

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod shutdown;
pub mod types;

// Re-exports for convenience
pub use config::RigConfig;
pub use error::{Error, Result};
pub use types::*;
