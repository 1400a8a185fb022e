//! FIFO job queue for deferred video processing, with a single drain worker.
//!
//! Requests enqueue `(video, options)` pairs; `/process_queue` starts the
//! worker, which runs the pipeline item by item and appends each result to
//! an accumulating list. The worker never replaces the live batch — queue
//! results are retrieved separately via `/get_results`.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use benthos_core::detection::{BatchCounts, Detection};
use benthos_events::COMPLETE;
use serde::Serialize;

use crate::pipeline;
use crate::state::AppState;

/// Per-item processing options captured at enqueue time.
#[derive(Debug, Clone)]
pub struct ProcessingOptions {
    /// Stored annotation CSV to reconcile against, when one was uploaded.
    pub annotation_path: Option<PathBuf>,
    /// Whether engine labels are kept in the results.
    pub show_labels: bool,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            annotation_path: None,
            show_labels: true,
        }
    }
}

/// One deferred unit of work.
#[derive(Debug, Clone)]
pub struct QueueItem {
    pub video_path: PathBuf,
    pub options: ProcessingOptions,
}

/// The outcome of one successfully processed queue item.
#[derive(Debug, Clone, Serialize)]
pub struct QueueResult {
    pub video: String,
    pub detections: Vec<Detection>,
    pub counts: BatchCounts,
}

/// FIFO backlog plus the accumulating results list.
///
/// `running` guards the drain loop: at most one worker consumes the queue
/// at a time, enforced with a compare-and-swap on start. Results accumulate
/// for the process lifetime (demo-scale; no eviction).
#[derive(Debug, Default)]
pub struct JobQueue {
    items: Mutex<VecDeque<QueueItem>>,
    results: Mutex<Vec<QueueResult>>,
    running: AtomicBool,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item; returns the new queue length. Never blocks.
    pub fn enqueue(&self, item: QueueItem) -> usize {
        let mut items = self.items.lock().expect("queue lock poisoned");
        items.push_back(item);
        items.len()
    }

    pub fn len(&self) -> usize {
        self.items.lock().expect("queue lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a drain worker currently holds the queue.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Snapshot of all accumulated results.
    pub fn results(&self) -> Vec<QueueResult> {
        self.results.lock().expect("results lock poisoned").clone()
    }

    fn pop(&self) -> Option<QueueItem> {
        self.items.lock().expect("queue lock poisoned").pop_front()
    }

    fn push_result(&self, result: QueueResult) {
        self.results.lock().expect("results lock poisoned").push(result);
    }

    /// Claim the drain loop. Returns false when a worker is already active.
    fn try_begin_drain(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn finish_drain(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Start the drain worker unless one is already running.
///
/// Returns true when a new worker was spawned. Idempotent: a second call
/// while the first worker is active is a no-op, so no two workers ever
/// consume the same queue concurrently.
pub fn start_worker(state: AppState) -> bool {
    if !state.queue.try_begin_drain() {
        tracing::debug!("Queue worker already running; start request ignored");
        return false;
    }

    tokio::spawn(async move {
        drain(&state).await;
        state.queue.finish_drain();
    });
    true
}

/// Consume the queue to exhaustion, one item at a time.
///
/// A failed item is logged and dropped; the worker moves on. Progress for
/// the in-flight item goes to the shared progress channel.
async fn drain(state: &AppState) {
    tracing::info!(backlog = state.queue.len(), "Queue worker started");

    while let Some(item) = state.queue.pop() {
        let video = item
            .video_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| item.video_path.display().to_string());
        tracing::info!(video = %video, "Processing queued item");

        // The item's files are consumed here: the CSV is spent either way,
        // the video survives only a successful run.
        let mut video_cleanup = pipeline::RemoveOnDrop::new(item.video_path.clone());
        let _annotation_cleanup = item
            .options
            .annotation_path
            .clone()
            .map(pipeline::RemoveOnDrop::new);

        let channel = Arc::clone(&state.progress);
        let observer: benthos_detect::ProgressObserver =
            Arc::new(move |value| channel.publish(value));

        match pipeline::run(
            &state.config,
            &state.detector,
            &item.video_path,
            item.options.annotation_path.as_deref(),
            item.options.show_labels,
            Some(observer),
        )
        .await
        {
            Ok(output) => {
                video_cleanup.disarm();
                tracing::info!(
                    video = %video,
                    detections = output.batch.detections.len(),
                    "Queued item done"
                );
                state.queue.push_result(QueueResult {
                    video,
                    detections: output.batch.detections,
                    counts: output.batch.counts,
                });
            }
            Err(e) => {
                // One bad item must not halt the queue.
                tracing::error!(video = %video, error = %e, "Queued item failed; skipping");
                state.progress.publish(COMPLETE);
            }
        }
    }

    tracing::info!("Queue worker drained the backlog");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str) -> QueueItem {
        QueueItem {
            video_path: PathBuf::from(name),
            options: ProcessingOptions::default(),
        }
    }

    #[test]
    fn enqueue_returns_growing_length_and_pop_is_fifo() {
        let queue = JobQueue::new();
        assert_eq!(queue.enqueue(item("a.mp4")), 1);
        assert_eq!(queue.enqueue(item("b.mp4")), 2);
        assert_eq!(queue.enqueue(item("c.mp4")), 3);

        let order: Vec<String> = std::iter::from_fn(|| queue.pop())
            .map(|i| i.video_path.display().to_string())
            .collect();
        assert_eq!(order, vec!["a.mp4", "b.mp4", "c.mp4"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn only_one_drain_can_be_claimed_at_a_time() {
        let queue = JobQueue::new();
        assert!(queue.try_begin_drain());
        assert!(!queue.try_begin_drain(), "second claim must fail");
        assert!(queue.is_running());

        queue.finish_drain();
        assert!(queue.try_begin_drain(), "claim succeeds again after finish");
    }

    #[test]
    fn results_accumulate_in_completion_order() {
        let queue = JobQueue::new();
        for name in ["first", "second"] {
            queue.push_result(QueueResult {
                video: name.to_string(),
                detections: Vec::new(),
                counts: BatchCounts::default(),
            });
        }
        let videos: Vec<String> = queue.results().into_iter().map(|r| r.video).collect();
        assert_eq!(videos, vec!["first", "second"]);
    }
}
