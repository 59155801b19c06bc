//! MJPEG camera streaming service for the rigbot rig.
//!
//! A capture subprocess writes raw MJPEG to stdout; this crate cuts that byte
//! stream into JPEG frames, keeps the newest one in a shared slot and pushes
//! it to every HTTP client as a `multipart/x-mixed-replace` stream.

#![deny(unsafe_code)]

/// Static viewer page and fallback handler.
pub mod assets;

/// Capture subprocess supervision.
pub mod capture;

/// Error types for camera operations.
pub mod error;

/// Latest-frame slot shared between capture and streaming.
pub mod frame;

/// JPEG frame extraction from raw stream bytes.
pub mod mjpeg;

/// HTTP router and server.
pub mod server;

/// Multipart streaming to clients.
pub mod stream;

pub use capture::{CaptureStats, FrameSource};
pub use error::{CameraError, CameraResult};
pub use frame::{Frame, FrameReader, FrameSlot};
pub use mjpeg::FrameExtractor;
pub use server::{build_router, CameraServer, CameraState};
pub use stream::StreamDispatcher;
