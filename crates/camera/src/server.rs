//! HTTP server for the camera service.

use std::sync::Arc;

use axum::extract::Extension;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use rigbot_core::config::CameraConfig;
use rigbot_core::shutdown::{shutdown_signal, Shutdown};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{info, instrument, warn};

use crate::assets;
use crate::capture::{CaptureStats, FrameSource};
use crate::error::{CameraError, CameraResult};
use crate::frame::FrameReader;
use crate::stream::StreamDispatcher;

/// Shared state handed to every camera route.
#[derive(Debug, Clone)]
pub struct CameraState {
    pub dispatcher: StreamDispatcher,
    pub frames: FrameReader,
    pub stats: Arc<CaptureStats>,
}

/// Capture and streaming counters served by `/status`.
#[derive(Debug, Serialize)]
pub struct CameraStatus {
    pub capture_running: bool,
    pub frames_published: u64,
    pub restarts: u64,
    pub dropped_frames: u64,
    pub clients: usize,
    pub last_frame_bytes: Option<usize>,
    pub last_frame_sequence: Option<u64>,
}

/// Build the camera router.
pub fn build_router(state: CameraState, config: &CameraConfig) -> Router {
    let mut router = Router::new()
        .route("/", get(assets::viewer_page))
        .route("/stream", get(stream))
        .route("/status", get(status))
        .route("/health", get(health_check))
        .fallback(assets::not_found)
        .layer(Extension(Arc::new(state)));

    if config.enable_request_logging {
        router = router.layer(tower_http::trace::TraceLayer::new_for_http());
    }

    router
}

async fn stream(Extension(state): Extension<Arc<CameraState>>) -> Response {
    state.dispatcher.response()
}

#[instrument(skip(state))]
async fn status(Extension(state): Extension<Arc<CameraState>>) -> Json<CameraStatus> {
    let latest = state.frames.latest().await;
    Json(CameraStatus {
        capture_running: state.stats.is_running(),
        frames_published: state.frames.published().await,
        restarts: state.stats.restarts(),
        dropped_frames: state.stats.dropped_frames(),
        clients: state.dispatcher.clients(),
        last_frame_bytes: latest.as_ref().map(|frame| frame.len()),
        last_frame_sequence: latest.as_ref().map(|frame| frame.sequence()),
    })
}

async fn health_check() -> impl IntoResponse {
    "OK"
}

/// Camera streaming server: capture supervisor plus HTTP listener.
pub struct CameraServer {
    config: CameraConfig,
}

impl CameraServer {
    /// Create a new camera server with the given configuration.
    pub fn new(config: CameraConfig) -> Self {
        Self { config }
    }

    /// Bind the configured address and serve until Ctrl+C or SIGTERM.
    pub async fn run(self) -> CameraResult<()> {
        let addr = self.config.bind_addr;
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            CameraError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to bind to {}: {}", addr, e),
            ))
        })?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on `listener` until `signal` resolves.
    ///
    /// Capture, every open stream, and the listener stop together.
    pub async fn serve(
        self,
        listener: TcpListener,
        signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> CameraResult<()> {
        let shutdown = Shutdown::new();
        let source = FrameSource::new(self.config.capture.clone());
        let frames = source.reader();
        let stats = source.stats();
        let capture = source.spawn(shutdown.subscribe());

        let dispatcher = StreamDispatcher::new(
            frames.clone(),
            self.config.stream_interval(),
            shutdown.subscribe(),
        );
        let router = build_router(
            CameraState {
                dispatcher,
                frames,
                stats,
            },
            &self.config,
        );

        info!("Camera server listening on http://{}", listener.local_addr()?);

        let stop = Arc::new(shutdown);
        let stop_on_signal = Arc::clone(&stop);
        let served = axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                signal.await;
                stop_on_signal.trigger();
            })
            .await;

        stop.trigger();
        let capture_abort = capture.abort_handle();
        if tokio::time::timeout(std::time::Duration::from_secs(5), capture)
            .await
            .is_err()
        {
            warn!("capture task did not stop in time, aborting");
            capture_abort.abort();
        }

        served.map_err(|e| CameraError::Server(format!("Server error: {}", e)))?;
        info!("Camera server shutdown complete");
        Ok(())
    }
}
