//! Axum router for the robot control API.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::Extension;
use axum::routing::{get, post};
use axum::{Json, Router};
use rigbot_core::config::RobotConfig;
use rigbot_core::RobotState;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::assets;
use crate::error::{RobotError, RobotResult};
use crate::relay::{CommandOutcome, CommandRelay, StatusOutcome};
use crate::telemetry::{TelemetryInfo, TelemetryPublisher};

/// Shared state handed to every robot route.
#[derive(Debug, Clone)]
pub struct AppState {
    pub relay: Arc<CommandRelay>,
    pub telemetry: Arc<TelemetryPublisher>,
}

#[derive(Debug, Deserialize)]
struct CommandRequest {
    command: Option<String>,
}

/// Body of the manual telemetry trigger.
#[derive(Debug, Serialize)]
pub struct TelemetryUpdateResponse {
    pub status: &'static str,
    pub message: &'static str,
}

/// Build the robot router.
pub fn build_router(state: AppState, config: &RobotConfig) -> Router {
    let mut router = Router::new()
        .route("/", get(assets::control_panel))
        .route("/api/command", post(send_command))
        .route("/api/status", get(get_status))
        .route("/api/thingspeak/update", get(force_telemetry_update))
        .route("/api/thingspeak/info", get(telemetry_info))
        .route("/api/robot/state", get(robot_state))
        .route("/health", get(health_check))
        .layer(Extension(state));

    if config.enable_request_logging {
        router = router.layer(tower_http::trace::TraceLayer::new_for_http());
    }

    router.layer(tower_http::limit::RequestBodyLimitLayer::new(
        config.max_body_size,
    ))
}

/// Any body that is not a JSON object with a string `command` counts as no command.
#[instrument(skip(state, body))]
async fn send_command(
    Extension(state): Extension<AppState>,
    body: Bytes,
) -> RobotResult<Json<CommandOutcome>> {
    let command = serde_json::from_slice::<CommandRequest>(&body)
        .ok()
        .and_then(|request| request.command)
        .ok_or(RobotError::MissingCommand)?;

    let outcome = state.relay.send(&command).await?;
    Ok(Json(outcome))
}

#[instrument(skip(state))]
async fn get_status(Extension(state): Extension<AppState>) -> RobotResult<Json<StatusOutcome>> {
    Ok(Json(state.relay.check_status().await?))
}

#[instrument(skip(state))]
async fn force_telemetry_update(
    Extension(state): Extension<AppState>,
) -> Json<TelemetryUpdateResponse> {
    let response = match state.telemetry.publish().await {
        Ok(_) => TelemetryUpdateResponse {
            status: "success",
            message: "ThingSpeak updated",
        },
        Err(err) => {
            tracing::warn!("manual telemetry update failed: {}", err);
            TelemetryUpdateResponse {
                status: "error",
                message: "Failed to update ThingSpeak",
            }
        }
    };
    Json(response)
}

async fn telemetry_info(Extension(state): Extension<AppState>) -> Json<TelemetryInfo> {
    Json(state.telemetry.info())
}

async fn robot_state(Extension(state): Extension<AppState>) -> Json<RobotState> {
    Json(state.relay.snapshot().await)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
