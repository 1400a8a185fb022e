use std::sync::Arc;

use benthos_core::store::DetectionStore;
use benthos_detect::Detector;
use benthos_events::ProgressChannel;

use crate::background::queue::JobQueue;
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (all inner data is behind `Arc`). Nothing here
/// is a module-level global: tests build isolated instances.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// The single live detection batch.
    pub store: Arc<DetectionStore>,
    /// FIFO backlog for deferred video processing plus its results list.
    pub queue: Arc<JobQueue>,
    /// Process-wide progress stream feeding `/progress`.
    pub progress: Arc<ProgressChannel>,
    /// Detection backend, selected once at startup.
    pub detector: Arc<dyn Detector>,
}
