//! Line-oriented link to the motor microcontroller.

use std::time::Duration;

use rigbot_core::config::SerialConfig;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info};

use crate::error::{RobotError, RobotResult};

/// Byte transport the link runs over: a serial port, or an in-memory pipe in tests.
pub trait SerialIo: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> SerialIo for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

/// Request/reply channel to the microcontroller.
///
/// One exchange runs at a time; concurrent callers queue on the inner lock so
/// replies are never interleaved.
pub struct SerialLink {
    io: Mutex<BufReader<Box<dyn SerialIo>>>,
    read_timeout: Duration,
    label: String,
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("label", &self.label)
            .field("read_timeout", &self.read_timeout)
            .finish_non_exhaustive()
    }
}

impl SerialLink {
    /// Open the configured device and wait for the board to finish resetting.
    pub async fn open(config: &SerialConfig) -> RobotResult<Self> {
        let port = tokio_serial::new(&config.port, config.baud_rate)
            .open_native_async()
            .map_err(|source| RobotError::SerialOpen {
                port: config.port.clone(),
                source,
            })?;
        info!(
            "Connected to microcontroller on {} ({} baud)",
            config.port, config.baud_rate
        );

        tokio::time::sleep(config.settle_delay()).await;

        Ok(Self::from_io(port, config.read_timeout()).with_label(config.port.clone()))
    }

    /// Wrap an already open transport.
    pub fn from_io(io: impl SerialIo + 'static, read_timeout: Duration) -> Self {
        Self {
            io: Mutex::new(BufReader::new(Box::new(io))),
            read_timeout,
            label: "custom".to_string(),
        }
    }

    fn with_label(mut self, label: String) -> Self {
        self.label = label;
        self
    }

    /// Device name for log lines.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Write `line` plus a newline and return the next reply line, trimmed.
    pub async fn transact(&self, line: &str) -> RobotResult<String> {
        let mut io = self.io.lock().await;

        // A reply that arrived after an earlier timeout must not answer this line.
        loop {
            let stale = match tokio::time::timeout(Duration::ZERO, io.fill_buf()).await {
                Ok(Ok(buf)) if !buf.is_empty() => buf.len(),
                _ => break,
            };
            debug!(bytes = stale, "discarding stale serial input");
            io.consume(stale);
        }

        let frame = format!("{}\n", line);
        io.get_mut().write_all(frame.as_bytes()).await?;
        io.get_mut().flush().await?;
        debug!("serial tx: {}", line);

        let mut reply = String::new();
        let read = tokio::time::timeout(self.read_timeout, io.read_line(&mut reply))
            .await
            .map_err(|_| RobotError::SerialTimeout(self.read_timeout.as_millis()))??;
        if read == 0 {
            return Err(RobotError::SerialClosed);
        }

        let reply = reply.trim().to_string();
        debug!("serial rx: {}", reply);
        Ok(reply)
    }
}
