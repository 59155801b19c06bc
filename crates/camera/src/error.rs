//! Error types for the camera streaming service.

use thiserror::Error;

/// Main error type for camera operations.
#[derive(Error, Debug)]
pub enum CameraError {
    /// The capture program could not be started.
    #[error("Failed to spawn capture program {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The capture subprocess misbehaved after starting.
    #[error("Capture error: {0}")]
    Capture(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP server error.
    #[error("Server error: {0}")]
    Server(String),
}

/// Result alias for camera operations.
pub type CameraResult<T> = Result<T, CameraError>;
