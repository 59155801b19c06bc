use crate::constants::*;
use crate::Error;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Main configuration for both rigbot services.
///
/// Every section falls back to its defaults, so a file only needs to carry
/// the values that differ from the stock rig.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RigConfig {
    /// Camera streaming service configuration.
    pub camera: CameraConfig,

    /// Robot control service configuration.
    pub robot: RobotConfig,

    /// Telemetry publishing configuration.
    pub telemetry: TelemetryConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Camera streaming service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Socket address to bind to.
    pub bind_addr: SocketAddr,

    /// Capture subprocess configuration.
    pub capture: CaptureConfig,

    /// Interval between multipart pushes in milliseconds.
    pub stream_interval_ms: u64,

    /// Enable request logging.
    pub enable_request_logging: bool,
}

/// Capture subprocess configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Program producing MJPEG on stdout.
    pub program: String,

    /// Frame width.
    pub width: u32,

    /// Frame height.
    pub height: u32,

    /// Frames per second requested from the camera.
    pub framerate: u32,

    /// Codec name passed to the capture program.
    pub codec: String,

    /// Extra arguments appended after the fixed capture parameters.
    pub extra_args: Vec<String>,

    /// When set, replaces the generated argument list entirely.
    pub args_override: Option<Vec<String>>,

    /// Bytes requested per read.
    pub read_chunk_bytes: usize,

    /// Delay before respawning the subprocess, in milliseconds.
    pub restart_delay_ms: u64,

    /// Largest in-progress frame before the scanner gives up on it.
    pub max_frame_bytes: usize,
}

/// Robot control service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    /// Socket address to bind to.
    pub bind_addr: SocketAddr,

    /// Serial link configuration.
    pub serial: SerialConfig,

    /// Enable request logging.
    pub enable_request_logging: bool,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

/// Serial link to the microcontroller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Try to open the device at all. When false the relay runs in demo mode.
    pub enabled: bool,

    /// Device path.
    pub port: String,

    /// Baud rate.
    pub baud_rate: u32,

    /// Timeout for one response line, in milliseconds.
    pub read_timeout_ms: u64,

    /// Pause after opening the device, in milliseconds.
    pub settle_ms: u64,

    /// Token sent by the status check.
    pub online_check_token: String,
}

/// Telemetry publishing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Run the periodic publisher.
    pub enabled: bool,

    /// Ingestion endpoint accepting form-encoded fields.
    pub endpoint: String,

    /// Write API key. Falls back to `RIGBOT_TELEMETRY_API_KEY`.
    pub api_key: Option<String>,

    /// Public channel id, if known.
    pub channel_id: Option<String>,

    /// Seconds between publishes.
    pub interval_seconds: u64,

    /// Per-request timeout in seconds.
    pub request_timeout_seconds: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level used when no `-v` flag is given.
    pub level: LogLevel,

    /// Include the event target (module path) in log lines.
    pub with_target: bool,
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Error level.
    Error,

    /// Warning level.
    Warn,

    /// Info level.
    Info,

    /// Debug level.
    Debug,

    /// Trace level.
    Trace,
}

impl RigConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::FileSystem(format!("Failed to read config file: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::Parse(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the services cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.camera.capture.program.trim().is_empty() {
            return Err(Error::Config("camera.capture.program is empty".to_string()));
        }
        if self.robot.serial.baud_rate == 0 {
            return Err(Error::Config("robot.serial.baud_rate must be positive".to_string()));
        }
        if self.telemetry.enabled && self.telemetry.endpoint.trim().is_empty() {
            return Err(Error::Config("telemetry.endpoint is empty".to_string()));
        }
        Ok(())
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Parse(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| Error::FileSystem(format!("Failed to write config file: {}", e)))
    }

    /// Load from `path` when given, otherwise use defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

impl CameraConfig {
    /// Interval between multipart pushes.
    pub fn stream_interval(&self) -> Duration {
        Duration::from_millis(self.stream_interval_ms.max(1))
    }
}

impl CaptureConfig {
    /// Command-line arguments for the capture program.
    pub fn args(&self) -> Vec<String> {
        if let Some(args) = &self.args_override {
            return args.clone();
        }

        let mut args = vec![
            "--width".to_string(),
            self.width.to_string(),
            "--height".to_string(),
            self.height.to_string(),
            "--framerate".to_string(),
            self.framerate.to_string(),
            "--codec".to_string(),
            self.codec.clone(),
            "--inline".to_string(),
            "--output".to_string(),
            "-".to_string(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args
    }

    /// Delay before respawning the subprocess.
    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }
}

impl SerialConfig {
    /// Timeout for one response line.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms.max(1))
    }

    /// Pause after opening the device.
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl TelemetryConfig {
    /// Resolve the API key from the config file or the environment.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(TELEMETRY_API_KEY_ENV).ok())
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }

    /// Channel id from config, else the key prefix before `-`, else `"unknown"`.
    pub fn resolved_channel_id(&self) -> String {
        if let Some(id) = self.channel_id.as_ref().filter(|id| !id.trim().is_empty()) {
            return id.trim().to_string();
        }
        match self.resolved_api_key() {
            Some(key) if key.contains('-') => key.split('-').next().unwrap_or("unknown").to_string(),
            _ => "unknown".to_string(),
        }
    }

    /// Seconds between publishes, never zero.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds.max(1))
    }

    /// Per-request timeout, never zero.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds.max(1))
    }
}

impl LogLevel {
    /// Raise the level by `steps` (info + 1 = debug), saturating at trace.
    pub fn raised(self, steps: u8) -> Self {
        let order = [
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ];
        let current = order.iter().position(|level| *level == self).unwrap_or(2);
        let index = (current + steps as usize).min(order.len() - 1);
        order[index]
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_CAMERA_PORT)),
            capture: CaptureConfig::default(),
            stream_interval_ms: DEFAULT_STREAM_INTERVAL_MS,
            enable_request_logging: false,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_CAPTURE_PROGRAM.to_string(),
            width: DEFAULT_CAPTURE_WIDTH,
            height: DEFAULT_CAPTURE_HEIGHT,
            framerate: DEFAULT_CAPTURE_FRAMERATE,
            codec: "mjpeg".to_string(),
            extra_args: Vec::new(),
            args_override: None,
            read_chunk_bytes: DEFAULT_READ_CHUNK_BYTES,
            restart_delay_ms: DEFAULT_RESTART_DELAY_MS,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_ROBOT_PORT)),
            serial: SerialConfig::default(),
            enable_request_logging: true,
            max_body_size: 16 * 1024,
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: DEFAULT_SERIAL_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_SERIAL_TIMEOUT_MS,
            settle_ms: DEFAULT_SERIAL_SETTLE_MS,
            online_check_token: ONLINE_CHECK_TOKEN.to_string(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: DEFAULT_TELEMETRY_ENDPOINT.to_string(),
            api_key: None,
            channel_id: None,
            interval_seconds: DEFAULT_TELEMETRY_INTERVAL_SECS,
            request_timeout_seconds: DEFAULT_TELEMETRY_TIMEOUT_SECS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            with_target: false,
        }
    }
}
