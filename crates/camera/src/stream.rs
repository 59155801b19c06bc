//! Multipart MJPEG streaming to HTTP clients.
//!
//! Every client gets its own loop that wakes on a fixed interval and sends
//! the current frame as one `multipart/x-mixed-replace` part. Loops only
//! read the shared slot, so a slow client receives fewer frames but never
//! holds up capture or other clients.

use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::{BufMut, BytesMut};
use futures::stream::{self, Stream};
use rigbot_core::constants::STREAM_BOUNDARY;
use tokio::sync::watch;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::frame::{Frame, FrameReader};

/// Serves the latest frame to any number of stream clients.
#[derive(Debug, Clone)]
pub struct StreamDispatcher {
    frames: FrameReader,
    interval: Duration,
    clients: Arc<AtomicUsize>,
    shutdown: watch::Receiver<bool>,
}

impl StreamDispatcher {
    /// Create a dispatcher. Client loops end when `shutdown` flips to true.
    pub fn new(frames: FrameReader, interval: Duration, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            frames,
            interval,
            clients: Arc::new(AtomicUsize::new(0)),
            shutdown,
        }
    }

    /// Connected stream clients.
    pub fn clients(&self) -> usize {
        self.clients.load(Ordering::Relaxed)
    }

    /// Encode one multipart part: boundary, headers, JPEG bytes, CRLF.
    pub fn encode_part(frame: &Frame) -> Bytes {
        let head = format!(
            "--{}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
            STREAM_BOUNDARY,
            frame.len()
        );
        let mut part = BytesMut::with_capacity(head.len() + frame.len() + 2);
        part.put_slice(head.as_bytes());
        part.put_slice(frame.data());
        part.put_slice(b"\r\n");
        part.freeze()
    }

    /// Endless stream of multipart parts for one client.
    ///
    /// Ticks with an empty slot emit nothing. The stream ends on shutdown;
    /// when the client goes away the stream is simply dropped.
    pub fn parts(&self) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let client = ClientLoop {
            frames: self.frames.clone(),
            ticker,
            shutdown: self.shutdown.clone(),
            _guard: ClientGuard::register(Arc::clone(&self.clients)),
        };

        stream::unfold(client, |mut client| async move {
            loop {
                if *client.shutdown.borrow() {
                    return None;
                }
                tokio::select! {
                    _ = client.ticker.tick() => {}
                    _ = client.shutdown.changed() => return None,
                }
                if let Some(frame) = client.frames.latest().await {
                    return Some((Ok::<_, Infallible>(Self::encode_part(&frame)), client));
                }
            }
        })
    }

    /// Full HTTP response for a stream request.
    pub fn response(&self) -> Response {
        let content_type = format!("multipart/x-mixed-replace; boundary={}", STREAM_BOUNDARY);
        let mut response = (StatusCode::OK, Body::from_stream(self.parts())).into_response();
        let headers = response.headers_mut();
        headers.insert(header::AGE, HeaderValue::from_static("0"));
        headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache, private"),
        );
        headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
        if let Ok(value) = HeaderValue::from_str(&content_type) {
            headers.insert(header::CONTENT_TYPE, value);
        }
        response
    }
}

struct ClientLoop {
    frames: FrameReader,
    ticker: Interval,
    shutdown: watch::Receiver<bool>,
    _guard: ClientGuard,
}

/// Tracks one connected client for the lifetime of its stream.
struct ClientGuard {
    clients: Arc<AtomicUsize>,
}

impl ClientGuard {
    fn register(clients: Arc<AtomicUsize>) -> Self {
        let total = clients.fetch_add(1, Ordering::Relaxed) + 1;
        info!("Stream client connected. Total clients: {}", total);
        Self { clients }
    }
}

impl Drop for ClientGuard {
    fn drop(&mut self) {
        let total = self.clients.fetch_sub(1, Ordering::Relaxed).saturating_sub(1);
        debug!("Stream client disconnected. Total clients: {}", total);
    }
}
