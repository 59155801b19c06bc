//! HTTP server for the robot control service.

use std::sync::Arc;

use rigbot_core::config::{RobotConfig, TelemetryConfig};
use rigbot_core::shutdown::{shutdown_signal, Shutdown};
use tokio::net::TcpListener;
use tracing::info;

use crate::error::{RobotError, RobotResult};
use crate::relay::CommandRelay;
use crate::router::{build_router, AppState};
use crate::telemetry::TelemetryPublisher;

/// Robot control server: command relay, telemetry publisher and HTTP listener.
pub struct RobotServer {
    config: RobotConfig,
    telemetry: TelemetryConfig,
}

impl RobotServer {
    /// Create a new robot server with the given configuration.
    pub fn new(config: RobotConfig, telemetry: TelemetryConfig) -> Self {
        Self { config, telemetry }
    }

    /// Bind the configured address and serve until Ctrl+C or SIGTERM.
    pub async fn run(self) -> RobotResult<()> {
        let addr = self.config.bind_addr;
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            RobotError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to bind to {}: {}", addr, e),
            ))
        })?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on `listener` until `signal` resolves.
    pub async fn serve(
        self,
        listener: TcpListener,
        signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> RobotResult<()> {
        let relay = Arc::new(CommandRelay::connect(&self.config.serial).await);
        let telemetry = Arc::new(TelemetryPublisher::new(
            self.telemetry.clone(),
            relay.state_handle(),
        )?);

        let shutdown = Shutdown::new();
        let worker = Arc::clone(&telemetry).spawn(shutdown.subscribe());

        let router = build_router(
            AppState {
                relay: Arc::clone(&relay),
                telemetry,
            },
            &self.config,
        );

        info!(
            "Robot server listening on http://{} ({})",
            listener.local_addr()?,
            if relay.is_demo() { "demo mode" } else { "serial connected" }
        );

        let served = axum::serve(listener, router)
            .with_graceful_shutdown(signal)
            .await;

        shutdown.trigger();
        if let Some(handle) = worker {
            handle.abort();
            let _ = handle.await;
        }

        served.map_err(|e| RobotError::Server(format!("Server error: {}", e)))?;
        info!("Robot server shutdown complete");
        Ok(())
    }
}
