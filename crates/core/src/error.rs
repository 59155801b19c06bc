//! Error types shared by the rigbot services.

use thiserror::Error;

/// Main error type for rigbot core functionality.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("File system error: {0}")]
    FileSystem(String),
    #[error("Data parsing error: {0}")]
    Parse(String),
}

/// Result type for rigbot core operations.
pub type Result<T> = std::result::Result<T, Error>;
