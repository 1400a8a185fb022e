//! Single-stream progress channel backed by a `tokio::sync::mpsc` queue.
//!
//! Writers (the pipeline, the queue worker) publish integer progress values
//! in `0..=100`; the `/progress` endpoint drains them with a short bounded
//! wait per poll. This is a best-effort indicator, not an event log: one
//! logical stream exists process-wide, values may be coalesced by a slow
//! reader, and a new upload clears whatever the previous run left behind.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::Mutex;

/// Sentinel rendered to clients when no update arrived within the poll
/// window: "no update yet, keep waiting".
pub const NO_UPDATE: i16 = -1;

/// Terminal progress value; observing it ends the stream.
pub const COMPLETE: u8 = 100;

/// Shared publish/poll channel for job progress.
///
/// Designed to be held as `Arc<ProgressChannel>` in application state. The
/// receiver sits behind a `Mutex` because only the single poll endpoint
/// drains it; publishing never blocks.
#[derive(Debug)]
pub struct ProgressChannel {
    tx: mpsc::UnboundedSender<u8>,
    rx: Mutex<mpsc::UnboundedReceiver<u8>>,
}

impl ProgressChannel {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// Publish a progress value, clamped to [`COMPLETE`].
    ///
    /// Never blocks and never fails: the receiver half lives as long as the
    /// channel itself, so the send can only succeed.
    pub fn publish(&self, value: u8) {
        let value = value.min(COMPLETE);
        let _ = self.tx.send(value);
    }

    /// Wait up to `timeout` for the next progress value.
    ///
    /// Returns `None` when nothing arrived within the window; callers
    /// render that as the [`NO_UPDATE`] sentinel.
    pub async fn next(&self, timeout: Duration) -> Option<u8> {
        let mut rx = self.rx.lock().await;
        tokio::time::timeout(timeout, rx.recv()).await.ok().flatten()
    }

    /// Drop any stale queued values. Called before a new upload starts so
    /// the poller never sees the tail of a previous run.
    pub async fn clear(&self) {
        let mut rx = self.rx.lock().await;
        let mut dropped = 0usize;
        while rx.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            tracing::debug!(dropped, "Cleared stale progress values");
        }
    }
}

impl Default for ProgressChannel {
    fn default() -> Self {
        Self::new()
    }
}
