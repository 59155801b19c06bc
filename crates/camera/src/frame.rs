//! The shared latest-frame slot.
//!
//! The capture loop owns a [`FrameSlot`] and is the only writer. Stream
//! handlers get [`FrameReader`] handles that can only take snapshots.

use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::RwLock;

/// One complete JPEG image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    data: Bytes,
    sequence: u64,
}

impl Frame {
    /// Encoded JPEG bytes, `FF D8` through `FF D9`.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// 1-based publish order of this frame.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[derive(Debug, Default)]
struct SlotState {
    current: Option<Frame>,
    published: u64,
}

/// Writer side of the latest-frame slot.
#[derive(Debug, Default)]
pub struct FrameSlot {
    inner: Arc<RwLock<SlotState>>,
}

impl FrameSlot {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current frame wholesale. Returns its sequence number.
    pub async fn publish(&self, data: Bytes) -> u64 {
        let mut state = self.inner.write().await;
        state.published += 1;
        let sequence = state.published;
        state.current = Some(Frame { data, sequence });
        sequence
    }

    /// Read-only handle onto this slot.
    pub fn reader(&self) -> FrameReader {
        FrameReader {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Reader side of the latest-frame slot.
#[derive(Debug, Clone)]
pub struct FrameReader {
    inner: Arc<RwLock<SlotState>>,
}

impl FrameReader {
    /// Snapshot of the current frame, if one has been published.
    pub async fn latest(&self) -> Option<Frame> {
        self.inner.read().await.current.clone()
    }

    /// Number of frames published so far.
    pub async fn published(&self) -> u64 {
        self.inner.read().await.published
    }
}
