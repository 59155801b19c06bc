//! Tracing subscriber bootstrap for the service binaries.

use crate::config::{LogLevel, LoggingConfig};
use tracing::Level;
use tracing_subscriber::fmt;

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

/// Effective level: the configured one raised by each `-v`.
pub fn effective_level(verbosity: u8, config: &LoggingConfig) -> Level {
    config.level.raised(verbosity).into()
}

/// Install the global fmt subscriber.
///
/// Calling this twice is harmless; the second subscriber is ignored.
pub fn init(verbosity: u8, config: &LoggingConfig) {
    let _ = fmt()
        .with_max_level(effective_level(verbosity, config))
        .with_target(config.with_target)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_configured_level() {
        let config = LoggingConfig::default();
        assert_eq!(effective_level(0, &config), Level::INFO);
        assert_eq!(effective_level(1, &config), Level::DEBUG);
        assert_eq!(effective_level(5, &config), Level::TRACE);
    }
}
