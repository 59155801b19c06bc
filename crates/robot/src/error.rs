//! Error types for the robot control server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Main error type for robot operations.
#[derive(Error, Debug)]
pub enum RobotError {
    /// Request carried no usable command.
    #[error("No command provided")]
    MissingCommand,

    /// Command token did not parse.
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// Serial device could not be opened.
    #[error("Failed to open serial port {port}: {source}")]
    SerialOpen {
        port: String,
        #[source]
        source: tokio_serial::Error,
    },

    /// No reply line arrived within the read timeout.
    #[error("Serial read timed out after {0} ms")]
    SerialTimeout(u128),

    /// Device closed the link.
    #[error("Serial link closed")]
    SerialClosed,

    /// Telemetry endpoint rejected the point or could not be reached.
    #[error("Telemetry error: {0}")]
    Telemetry(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP server error.
    #[error("Server error: {0}")]
    Server(String),
}

/// Result alias for robot operations.
pub type RobotResult<T> = Result<T, RobotError>;

impl RobotError {
    /// Convert to HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RobotError::MissingCommand => StatusCode::BAD_REQUEST,
            RobotError::InvalidCommand(_) => StatusCode::BAD_REQUEST,
            RobotError::SerialOpen { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            RobotError::SerialTimeout(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RobotError::SerialClosed => StatusCode::INTERNAL_SERVER_ERROR,
            RobotError::Telemetry(_) => StatusCode::BAD_GATEWAY,
            RobotError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RobotError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RobotError> for Response {
    fn from(error: RobotError) -> Self {
        let status = error.status_code();
        let body = serde_json::json!({
            "status": "error",
            "message": error.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for RobotError {
    fn into_response(self) -> Response {
        self.into()
    }
}
