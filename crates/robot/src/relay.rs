//! Command relay: owns the robot state and the serial link.
//!
//! Every drive command updates [`RobotState`] before any serial I/O, so the
//! recorded direction and speed reflect what was requested even when the
//! device is unreachable. Without a link the relay runs in demo mode: commands
//! are accepted and recorded but never transmitted.

use std::sync::Arc;

use chrono::Local;
use rigbot_core::config::SerialConfig;
use rigbot_core::{ConnectionStatus, RobotState};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use crate::command::{parse_voltage, DriveCommand};
use crate::error::RobotResult;
use crate::serial::SerialLink;

/// Read-only view of the robot state for other components.
#[derive(Debug, Clone)]
pub struct StateHandle {
    inner: Arc<RwLock<RobotState>>,
}

impl StateHandle {
    /// Copy of the current state.
    pub async fn snapshot(&self) -> RobotState {
        self.inner.read().await.clone()
    }
}

/// Result of a relayed drive command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CommandOutcome {
    /// The device acknowledged; `response` is its reply line.
    Success { response: String },
    /// No device attached.
    Demo { message: String },
}

/// Result of a status check.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StatusOutcome {
    Connected { response: String },
    Demo { message: String },
}

#[derive(Debug)]
pub struct CommandRelay {
    state: Arc<RwLock<RobotState>>,
    link: Option<SerialLink>,
    online_check_token: String,
}

impl CommandRelay {
    /// Relay over an open link, or in demo mode when `link` is `None`.
    pub fn new(link: Option<SerialLink>, online_check_token: impl Into<String>) -> Self {
        let connection_status = match link {
            Some(_) => ConnectionStatus::Connected,
            None => ConnectionStatus::Demo,
        };
        let state = RobotState {
            connection_status,
            ..RobotState::default()
        };
        Self {
            state: Arc::new(RwLock::new(state)),
            link,
            online_check_token: online_check_token.into(),
        }
    }

    /// Open the configured device, falling back to demo mode on failure.
    pub async fn connect(config: &SerialConfig) -> Self {
        if !config.enabled {
            info!("Serial link disabled, running in demo mode");
            return Self::new(None, config.online_check_token.clone());
        }

        match SerialLink::open(config).await {
            Ok(link) => Self::new(Some(link), config.online_check_token.clone()),
            Err(err) => {
                warn!("Error connecting to microcontroller: {}", err);
                warn!("Running in demo mode - commands will be logged but not sent");
                Self::new(None, config.online_check_token.clone())
            }
        }
    }

    pub fn is_demo(&self) -> bool {
        self.link.is_none()
    }

    /// Read-only handle sharing this relay's state.
    pub fn state_handle(&self) -> StateHandle {
        StateHandle {
            inner: Arc::clone(&self.state),
        }
    }

    pub async fn snapshot(&self) -> RobotState {
        self.state.read().await.clone()
    }

    /// Parse, record and forward one drive command.
    #[instrument(skip(self))]
    pub async fn send(&self, raw: &str) -> RobotResult<CommandOutcome> {
        let command: DriveCommand = raw.parse()?;

        {
            let mut state = self.state.write().await;
            state.direction = command.direction();
            if let Some(speed) = command.speed() {
                state.speed = speed;
            }
            state.timestamp = Local::now();
        }

        let Some(link) = &self.link else {
            info!("Would send command: {}", command);
            return Ok(CommandOutcome::Demo {
                message: format!("Demo mode: {}", command),
            });
        };

        let response = link.transact(command.token()).await?;
        self.record_reply(&response).await;
        Ok(CommandOutcome::Success { response })
    }

    /// Send the online-check token and record whether the device answered.
    #[instrument(skip(self))]
    pub async fn check_status(&self) -> RobotResult<StatusOutcome> {
        let Some(link) = &self.link else {
            self.state.write().await.connection_status = ConnectionStatus::Demo;
            return Ok(StatusOutcome::Demo {
                message: "Running in demo mode".to_string(),
            });
        };

        match link.transact(&self.online_check_token).await {
            Ok(response) => {
                self.state.write().await.connection_status = ConnectionStatus::Connected;
                self.record_reply(&response).await;
                Ok(StatusOutcome::Connected { response })
            }
            Err(err) => {
                warn!("Status check on {} failed: {}", link.label(), err);
                self.state.write().await.connection_status = ConnectionStatus::Disconnected;
                Err(err)
            }
        }
    }

    async fn record_reply(&self, reply: &str) {
        if let Some(voltage) = parse_voltage(reply) {
            self.state.write().await.voltage = voltage;
        }
    }
}
