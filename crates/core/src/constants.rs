//! Defaults shared by configuration and the services.

/// Default camera service port.
pub const DEFAULT_CAMERA_PORT: u16 = 8080;

/// Default robot control service port.
pub const DEFAULT_ROBOT_PORT: u16 = 5000;

/// Capture program producing an MJPEG byte stream on stdout.
pub const DEFAULT_CAPTURE_PROGRAM: &str = "libcamera-vid";

/// Capture frame width in pixels.
pub const DEFAULT_CAPTURE_WIDTH: u32 = 640;

/// Capture frame height in pixels.
pub const DEFAULT_CAPTURE_HEIGHT: u32 = 480;

/// Capture frame rate. Kept low for stability on small boards.
pub const DEFAULT_CAPTURE_FRAMERATE: u32 = 15;

/// Bytes requested per read from the capture subprocess.
pub const DEFAULT_READ_CHUNK_BYTES: usize = 4096;

/// Delay before respawning a capture subprocess.
pub const DEFAULT_RESTART_DELAY_MS: u64 = 1000;

/// Interval between multipart pushes to a stream client (~30 fps).
pub const DEFAULT_STREAM_INTERVAL_MS: u64 = 33;

/// Largest in-progress frame kept before the scanner resynchronises.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 8 * 1024 * 1024;

/// Multipart boundary used by the stream endpoint.
pub const STREAM_BOUNDARY: &str = "FRAME";

/// Default microcontroller serial device.
pub const DEFAULT_SERIAL_PORT: &str = "/dev/ttyUSB0";

/// Default serial baud rate.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Serial read timeout in milliseconds.
pub const DEFAULT_SERIAL_TIMEOUT_MS: u64 = 1000;

/// Wait after opening the port; the microcontroller resets on connect.
pub const DEFAULT_SERIAL_SETTLE_MS: u64 = 2000;

/// Token the firmware answers to signal it is online.
pub const ONLINE_CHECK_TOKEN: &str = "O";

/// Telemetry ingestion endpoint.
pub const DEFAULT_TELEMETRY_ENDPOINT: &str = "https://api.thingspeak.com/update";

/// Base URL of the public channel page.
pub const TELEMETRY_CHANNEL_BASE_URL: &str = "https://thingspeak.com/channels";

/// Seconds between telemetry publishes (free accounts accept one point per 15 s).
pub const DEFAULT_TELEMETRY_INTERVAL_SECS: u64 = 15;

/// Telemetry HTTP client timeout in seconds.
pub const DEFAULT_TELEMETRY_TIMEOUT_SECS: u64 = 10;

/// Environment variable that supplies the telemetry API key.
pub const TELEMETRY_API_KEY_ENV: &str = "RIGBOT_TELEMETRY_API_KEY";

/// Speed the robot reports before the first command.
pub const DEFAULT_SPEED: u8 = 128;
