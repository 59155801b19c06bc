//! Capture subprocess supervision.
//!
//! [`FrameSource`] keeps at most one capture process alive, feeds its stdout
//! through a [`FrameExtractor`] and publishes every completed frame to its
//! [`FrameSlot`]. When the process exits, fails to start, or its pipe errors,
//! the failure is logged and the process is respawned after a fixed delay.

use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rigbot_core::config::CaptureConfig;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{CameraError, CameraResult};
use crate::frame::{FrameReader, FrameSlot};
use crate::mjpeg::FrameExtractor;

/// How long a process that closed stdout gets to exit before it is killed.
const EXIT_GRACE: Duration = Duration::from_millis(500);

/// Counters describing the capture loop.
#[derive(Debug, Default)]
pub struct CaptureStats {
    running: AtomicBool,
    spawns: AtomicU64,
    dropped_frames: AtomicU64,
}

impl CaptureStats {
    /// Whether a capture process is currently alive.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Number of processes started after the first one.
    pub fn restarts(&self) -> u64 {
        self.spawns.load(Ordering::Relaxed).saturating_sub(1)
    }

    /// Frames abandoned by the extractor for being oversized.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }
}

/// How one capture process ended.
#[derive(Debug)]
enum CaptureEnd {
    /// Stdout closed; the process exited with this status.
    Exited(ExitStatus),
    /// Stdout closed but the process kept running and was killed.
    StdoutClosed,
    /// Shutdown was requested.
    Shutdown,
}

/// Owns the capture subprocess and the latest-frame slot.
pub struct FrameSource {
    config: CaptureConfig,
    slot: FrameSlot,
    stats: Arc<CaptureStats>,
}

impl FrameSource {
    /// Create a frame source; nothing is spawned until [`FrameSource::run`].
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            slot: FrameSlot::new(),
            stats: Arc::new(CaptureStats::default()),
        }
    }

    /// Read-only handle onto the latest frame.
    pub fn reader(&self) -> FrameReader {
        self.slot.reader()
    }

    /// Shared capture counters.
    pub fn stats(&self) -> Arc<CaptureStats> {
        Arc::clone(&self.stats)
    }

    /// Run the capture loop on a background task.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Capture until `shutdown` flips to true or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut extractor = FrameExtractor::new(self.config.max_frame_bytes);
        let restart_delay = self.config.restart_delay();

        info!(
            "frame capture started (program={}, restart_delay={:?})",
            self.config.program, restart_delay
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            info!("Starting camera capture...");
            match self.capture_once(&mut extractor, &mut shutdown).await {
                Ok(CaptureEnd::Shutdown) => {
                    self.stats.running.store(false, Ordering::Relaxed);
                    break;
                }
                Ok(CaptureEnd::Exited(status)) => {
                    info!("camera process ended ({}), restarting", status);
                }
                Ok(CaptureEnd::StdoutClosed) => {
                    warn!("camera process closed its output without exiting, killed it");
                }
                Err(err) => {
                    warn!("frame capture error: {}", err);
                }
            }

            self.stats.running.store(false, Ordering::Relaxed);
            self.stats
                .dropped_frames
                .fetch_add(extractor.dropped(), Ordering::Relaxed);
            // Never stitch a frame together from two processes.
            extractor = FrameExtractor::new(self.config.max_frame_bytes);

            tokio::select! {
                _ = tokio::time::sleep(restart_delay) => {}
                _ = shutdown.changed() => break,
            }
        }

        info!("frame capture stopped");
    }

    async fn capture_once(
        &self,
        extractor: &mut FrameExtractor,
        shutdown: &mut watch::Receiver<bool>,
    ) -> CameraResult<CaptureEnd> {
        let mut child = Command::new(&self.config.program)
            .args(self.config.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CameraError::Spawn {
                program: self.config.program.clone(),
                source,
            })?;

        self.stats.spawns.fetch_add(1, Ordering::Relaxed);
        self.stats.running.store(true, Ordering::Relaxed);
        debug!(pid = ?child.id(), "capture process spawned");

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| CameraError::Capture("capture stdout was not piped".to_string()))?;
        let mut chunk = vec![0u8; self.config.read_chunk_bytes.max(1)];

        loop {
            let read = tokio::select! {
                read = stdout.read(&mut chunk) => read,
                _ = shutdown.changed() => {
                    if let Err(err) = child.kill().await {
                        warn!("failed to kill capture process: {}", err);
                    }
                    return Ok(CaptureEnd::Shutdown);
                }
            };

            let n = read.map_err(|e| CameraError::Capture(format!("read failed: {}", e)))?;
            if n == 0 {
                return match tokio::time::timeout(EXIT_GRACE, child.wait()).await {
                    Ok(status) => Ok(CaptureEnd::Exited(status?)),
                    Err(_) => {
                        if let Err(err) = child.kill().await {
                            warn!("failed to kill capture process: {}", err);
                        }
                        Ok(CaptureEnd::StdoutClosed)
                    }
                };
            }

            extractor.extend(&chunk[..n]);
            while let Some(frame) = extractor.next_frame() {
                let sequence = self.slot.publish(frame).await;
                if sequence % 300 == 1 {
                    debug!(sequence, "frame published");
                }
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell_source(script: &str, restart_delay_ms: u64) -> FrameSource {
        let config = CaptureConfig {
            program: "sh".to_string(),
            args_override: Some(vec!["-c".to_string(), script.to_string()]),
            restart_delay_ms,
            ..CaptureConfig::default()
        };
        FrameSource::new(config)
    }

    async fn wait_for<F: Fn() -> bool>(check: F) {
        for _ in 0..200 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not met in time");
    }

    #[tokio::test]
    async fn publishes_frames_and_restarts_exited_process() {
        let source = shell_source(r"printf '\377\330\001\002\377\331\377\330\003\377\331'", 20);
        let reader = source.reader();
        let stats = source.stats();
        let (tx, rx) = watch::channel(false);
        let handle = source.spawn(rx);

        let stats_check = Arc::clone(&stats);
        wait_for(move || stats_check.restarts() >= 2).await;

        let frame = reader.latest().await.expect("frame published");
        let first: &[u8] = &[0xFF, 0xD8, 0x01, 0x02, 0xFF, 0xD9];
        let second: &[u8] = &[0xFF, 0xD8, 0x03, 0xFF, 0xD9];
        assert!(&frame.data()[..] == first || &frame.data()[..] == second);
        assert!(reader.published().await >= 4);

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("capture loop exits on shutdown")
            .unwrap();
    }

    #[tokio::test]
    async fn truncated_frame_from_dead_process_is_never_published() {
        // Each process ends mid-frame and begins with what would close it.
        let source = shell_source(r"printf '\001\377\331\377\330\002'", 20);
        let reader = source.reader();
        let stats = source.stats();
        let (tx, rx) = watch::channel(false);
        let handle = source.spawn(rx);

        let stats_check = Arc::clone(&stats);
        wait_for(move || stats_check.restarts() >= 2).await;
        assert!(reader.latest().await.is_none());

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn missing_program_is_retried_not_fatal() {
        let config = CaptureConfig {
            program: "/nonexistent/rigbot-capture".to_string(),
            restart_delay_ms: 10,
            ..CaptureConfig::default()
        };
        let source = FrameSource::new(config);
        let stats = source.stats();
        let (tx, rx) = watch::channel(false);
        let handle = source.spawn(rx);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!handle.is_finished());
        assert!(!stats.is_running());

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn process_that_closes_stdout_but_lingers_is_replaced() {
        let source = shell_source("exec >&-; sleep 30", 10);
        let stats = source.stats();
        let (tx, rx) = watch::channel(false);
        let handle = source.spawn(rx);

        let stats_check = Arc::clone(&stats);
        wait_for(move || stats_check.restarts() >= 1).await;

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("capture loop exits promptly")
            .unwrap();
    }

    #[tokio::test]
    async fn shutdown_kills_a_live_process() {
        let source = shell_source("exec sleep 30", 10);
        let stats = source.stats();
        let (tx, rx) = watch::channel(false);
        let handle = source.spawn(rx);

        let stats_check = Arc::clone(&stats);
        wait_for(move || stats_check.is_running()).await;

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("capture loop exits promptly")
            .unwrap();
        assert!(!stats.is_running());
    }
}
