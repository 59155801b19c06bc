//! Periodic telemetry publishing to a ThingSpeak-style ingestion endpoint.
//!
//! Each point is one form-encoded POST of the current robot state. Points are
//! best effort: a failed publish is logged and the next tick simply tries
//! again with whatever the state is by then.

use std::sync::Arc;

use rigbot_core::config::TelemetryConfig;
use rigbot_core::constants::TELEMETRY_CHANNEL_BASE_URL;
use rigbot_core::RobotState;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{RobotError, RobotResult};
use crate::relay::StateHandle;

/// Numeric encoding of one state snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryPoint {
    pub direction: u8,
    pub speed: u8,
    pub voltage: f64,
    pub connected: u8,
}

impl From<&RobotState> for TelemetryPoint {
    fn from(state: &RobotState) -> Self {
        Self {
            direction: state.direction.code(),
            speed: state.speed,
            voltage: if state.voltage.is_finite() {
                state.voltage
            } else {
                0.0
            },
            connected: state.connection_status.as_flag(),
        }
    }
}

impl TelemetryPoint {
    /// Form fields for the update request.
    pub fn form_fields(&self, api_key: &str) -> Vec<(&'static str, String)> {
        vec![
            ("api_key", api_key.to_string()),
            ("field1", self.direction.to_string()),
            ("field2", self.speed.to_string()),
            ("field3", self.voltage.to_string()),
            ("field4", self.connected.to_string()),
        ]
    }
}

/// Entry id from an update response body; anything but a positive integer is a rejection.
pub fn parse_entry_id(body: &str) -> Option<u64> {
    body.trim().parse::<u64>().ok().filter(|id| *id > 0)
}

/// Field descriptions served by the info endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryFields {
    pub field1: &'static str,
    pub field2: &'static str,
    pub field3: &'static str,
    pub field4: &'static str,
}

impl Default for TelemetryFields {
    fn default() -> Self {
        Self {
            field1: "Direction (0=Stop, 1=Forward, 2=Back, 3=Left, 4=Right)",
            field2: "Speed (0-255)",
            field3: "Voltage",
            field4: "Connection Status (0=Disconnected, 1=Connected)",
        }
    }
}

/// Channel description for the control panel.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryInfo {
    pub channel_id: String,
    pub update_interval: u64,
    pub thingspeak_url: String,
    pub fields: TelemetryFields,
}

#[derive(Debug)]
pub struct TelemetryPublisher {
    client: reqwest::Client,
    config: TelemetryConfig,
    api_key: Option<String>,
    state: StateHandle,
}

impl TelemetryPublisher {
    pub fn new(config: TelemetryConfig, state: StateHandle) -> RobotResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| RobotError::Telemetry(format!("failed to build HTTP client: {}", e)))?;
        let api_key = config.resolved_api_key();
        Ok(Self {
            client,
            config,
            api_key,
            state,
        })
    }

    pub fn info(&self) -> TelemetryInfo {
        let channel_id = self.config.resolved_channel_id();
        TelemetryInfo {
            thingspeak_url: format!("{}/{}", TELEMETRY_CHANNEL_BASE_URL, channel_id),
            channel_id,
            update_interval: self.config.interval().as_secs(),
            fields: TelemetryFields::default(),
        }
    }

    /// Publish the current state once and return the entry id the endpoint assigned.
    pub async fn publish(&self) -> RobotResult<u64> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| RobotError::Telemetry("no API key configured".to_string()))?;

        let point = TelemetryPoint::from(&self.state.snapshot().await);
        debug!("Sending telemetry point: {:?}", point);

        let response = self
            .client
            .post(&self.config.endpoint)
            .form(&point.form_fields(api_key))
            .send()
            .await
            .map_err(|e| RobotError::Telemetry(format!("request failed: {}", e)))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RobotError::Telemetry(format!("failed to read response: {}", e)))?;

        match parse_entry_id(&body) {
            Some(entry) => {
                info!("Logged telemetry entry #{}", entry);
                Ok(entry)
            }
            None => {
                if body.trim() == "0" {
                    warn!("Telemetry point rejected; free accounts accept one update every 15 s");
                }
                Err(RobotError::Telemetry(format!(
                    "endpoint answered {} with body '{}'",
                    status,
                    body.trim()
                )))
            }
        }
    }

    /// Spawn the periodic publisher.
    ///
    /// Returns `None` when telemetry is disabled or no API key is available.
    pub fn spawn(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> Option<JoinHandle<()>> {
        if !self.config.enabled {
            info!("telemetry publisher is disabled");
            return None;
        }
        if self.api_key.is_none() {
            info!("telemetry publisher is disabled: no API key configured");
            return None;
        }

        let period = self.config.interval();
        Some(tokio::spawn(async move {
            info!(
                "telemetry publisher started (endpoint={}, interval={}s)",
                self.config.endpoint,
                period.as_secs()
            );

            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(err) = self.publish().await {
                            warn!("telemetry publish failed: {}", err);
                        }
                    }
                    _ = shutdown.changed() => {
                        info!("telemetry publisher stopped");
                        return;
                    }
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::CommandRelay;
    use rigbot_core::{ConnectionStatus, Direction};

    fn config_with_key(key: Option<&str>) -> TelemetryConfig {
        TelemetryConfig {
            api_key: key.map(str::to_string),
            ..TelemetryConfig::default()
        }
    }

    #[test]
    fn point_encodes_state() {
        let state = RobotState {
            direction: Direction::Left,
            speed: 180,
            voltage: 7.25,
            connection_status: ConnectionStatus::Connected,
            ..RobotState::default()
        };
        let point = TelemetryPoint::from(&state);
        assert_eq!(
            point,
            TelemetryPoint {
                direction: 3,
                speed: 180,
                voltage: 7.25,
                connected: 1,
            }
        );

        let fields = point.form_fields("KEY");
        assert_eq!(fields[0], ("api_key", "KEY".to_string()));
        assert_eq!(fields[1], ("field1", "3".to_string()));
        assert_eq!(fields[3], ("field3", "7.25".to_string()));
        assert_eq!(fields[4], ("field4", "1".to_string()));
    }

    #[test]
    fn non_finite_voltage_falls_back_to_zero() {
        let state = RobotState {
            voltage: f64::NAN,
            connection_status: ConnectionStatus::Demo,
            ..RobotState::default()
        };
        let point = TelemetryPoint::from(&state);
        assert_eq!(point.voltage, 0.0);
        assert_eq!(point.connected, 0);
    }

    #[test]
    fn only_positive_integers_are_entries() {
        assert_eq!(parse_entry_id("42"), Some(42));
        assert_eq!(parse_entry_id(" 7\n"), Some(7));
        assert_eq!(parse_entry_id("0"), None);
        assert_eq!(parse_entry_id("-1"), None);
        assert_eq!(parse_entry_id("error"), None);
        assert_eq!(parse_entry_id(""), None);
    }

    #[test]
    fn info_derives_channel_from_key_prefix() {
        let relay = CommandRelay::new(None, "O");
        let publisher =
            TelemetryPublisher::new(config_with_key(Some("12345-ABCDEF")), relay.state_handle())
                .unwrap();
        let info = publisher.info();
        assert_eq!(info.channel_id, "12345");
        assert_eq!(info.thingspeak_url, "https://thingspeak.com/channels/12345");
        assert_eq!(info.update_interval, 15);
        assert!(info.fields.field1.starts_with("Direction"));
    }

    #[tokio::test]
    async fn spawn_is_skipped_when_disabled() {
        let relay = CommandRelay::new(None, "O");
        let (_tx, rx) = watch::channel(false);

        let disabled = TelemetryConfig {
            enabled: false,
            ..config_with_key(Some("KEY"))
        };
        let publisher = Arc::new(TelemetryPublisher::new(disabled, relay.state_handle()).unwrap());
        assert!(publisher.spawn(rx).is_none());
    }
}
