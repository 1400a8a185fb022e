//! Detection sources for the benthos service.
//!
//! [`Detector`] is the capability boundary over "run detection over a video,
//! produce timestamped findings". Two implementations conform:
//!
//! - [`MockDetector`] — deterministic or seeded-random timecodes, used by
//!   tests and demos. No external process, no images.
//! - [`OwlDetector`] — delegates to the external `owl-highlighter` vision
//!   engine via a subprocess, forwarding its progress reports.
//!
//! The implementation is chosen once at construction/configuration time;
//! calling code only ever sees `Arc<dyn Detector>`.

pub mod mock;
pub mod owl;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use benthos_core::detection::RawFinding;
use benthos_core::CoreResult;

/// Observer invoked with monotonically non-decreasing values in `0..=100`
/// as detection advances.
pub type ProgressObserver = Arc<dyn Fn(u8) + Send + Sync>;

/// A detection backend.
#[async_trait]
pub trait Detector: Send + Sync {
    /// Run detection over the video at `video_path`.
    ///
    /// Failures from the underlying engine surface as
    /// [`CoreError::DetectionFailure`] carrying the engine's message; they
    /// never panic the calling task.
    ///
    /// [`CoreError::DetectionFailure`]: benthos_core::CoreError::DetectionFailure
    async fn detect(
        &self,
        video_path: &Path,
        progress: Option<ProgressObserver>,
    ) -> CoreResult<Vec<RawFinding>>;
}

pub use mock::MockDetector;
pub use owl::OwlDetector;
