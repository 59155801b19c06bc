use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use bytes::Bytes;
use futures::StreamExt;
use rigbot_camera::{build_router, CameraState, CaptureStats, FrameSlot, StreamDispatcher};
use rigbot_core::config::CameraConfig;
use rigbot_core::shutdown::Shutdown;
use tower::util::ServiceExt;

const JPEG: &[u8] = &[0xFF, 0xD8, 0x10, 0x20, 0x30, 0xFF, 0xD9];

struct Harness {
    app: axum::Router,
    slot: FrameSlot,
    shutdown: Shutdown,
}

fn harness() -> Harness {
    let shutdown = Shutdown::new();
    let slot = FrameSlot::new();
    let frames = slot.reader();
    let dispatcher =
        StreamDispatcher::new(frames.clone(), Duration::from_millis(10), shutdown.subscribe());
    let state = CameraState {
        dispatcher,
        frames,
        stats: Arc::new(CaptureStats::default()),
    };
    let app = build_router(state, &CameraConfig::default());
    Harness {
        app,
        slot,
        shutdown,
    }
}

async fn get(
    app: &axum::Router,
    path: &str,
) -> Result<axum::response::Response, Box<dyn std::error::Error>> {
    let request = Request::builder().uri(path).body(Body::empty())?;
    Ok(app.clone().oneshot(request).await?)
}

#[tokio::test]
async fn test_root_serves_viewer_page() -> Result<(), Box<dyn std::error::Error>> {
    let harness = harness();
    let response = get(&harness.app, "/").await?;
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/html"));

    let body = to_bytes(response.into_body(), usize::MAX).await?;
    let html = String::from_utf8(body.to_vec())?;
    assert!(html.contains(r#"<img src="/stream""#));
    Ok(())
}

#[tokio::test]
async fn test_index_html_and_unknown_paths_return_404() -> Result<(), Box<dyn std::error::Error>> {
    let harness = harness();
    for path in ["/index.html", "/missing", "/stream/extra"] {
        let response = get(&harness.app, path).await?;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "path {}", path);
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        assert!(body.is_empty());
    }
    Ok(())
}

#[tokio::test]
async fn test_health_and_status() -> Result<(), Box<dyn std::error::Error>> {
    let harness = harness();

    let response = get(&harness.app, "/health").await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    assert_eq!(&body[..], b"OK");

    harness.slot.publish(Bytes::from_static(JPEG)).await;

    let response = get(&harness.app, "/status").await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    let status: serde_json::Value = serde_json::from_slice(&body)?;
    assert_eq!(status["frames_published"], 1);
    assert_eq!(status["last_frame_bytes"], JPEG.len());
    assert_eq!(status["last_frame_sequence"], 1);
    assert_eq!(status["clients"], 0);
    assert_eq!(status["capture_running"], false);
    Ok(())
}

#[tokio::test]
async fn test_stream_headers_and_first_part() -> Result<(), Box<dyn std::error::Error>> {
    let harness = harness();
    harness.slot.publish(Bytes::from_static(JPEG)).await;

    let response = get(&harness.app, "/stream?t=123").await?;
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert_eq!(
        headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()),
        Some("multipart/x-mixed-replace; boundary=FRAME")
    );
    assert_eq!(
        headers.get(header::CACHE_CONTROL).and_then(|v| v.to_str().ok()),
        Some("no-cache, private")
    );
    assert_eq!(
        headers.get(header::PRAGMA).and_then(|v| v.to_str().ok()),
        Some("no-cache")
    );
    assert_eq!(headers.get(header::AGE).and_then(|v| v.to_str().ok()), Some("0"));

    let mut parts = response.into_body().into_data_stream();
    let first = tokio::time::timeout(Duration::from_secs(2), parts.next())
        .await?
        .ok_or("stream ended before the first part")??;

    let mut expected = format!(
        "--FRAME\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        JPEG.len()
    )
    .into_bytes();
    expected.extend_from_slice(JPEG);
    expected.extend_from_slice(b"\r\n");
    assert_eq!(first.to_vec(), expected);

    harness.shutdown.trigger();
    let rest = tokio::time::timeout(Duration::from_secs(2), async {
        while let Some(part) = parts.next().await {
            part?;
        }
        Ok::<_, axum::Error>(())
    })
    .await?;
    rest?;
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_server_streams_frames_from_capture_process() -> Result<(), Box<dyn std::error::Error>>
{
    use rigbot_camera::CameraServer;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let mut config = CameraConfig::default();
    config.capture.program = "sh".to_string();
    config.capture.args_override = Some(vec![
        "-c".to_string(),
        r"printf '\377\330\001\002\377\331'; exec sleep 30".to_string(),
    ]);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(CameraServer::new(config).serve(listener, async move {
        let _ = stop_rx.await;
    }));

    let mut published = false;
    for _ in 0..100 {
        let mut stream = tokio::net::TcpStream::connect(addr).await?;
        stream
            .write_all(b"GET /status HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await?;
        let mut raw = String::new();
        stream.read_to_string(&mut raw).await?;
        if raw.contains("\"frames_published\":1") {
            published = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(published, "capture process never published a frame");

    let _ = stop_tx.send(());
    tokio::time::timeout(Duration::from_secs(10), server).await???;
    Ok(())
}
