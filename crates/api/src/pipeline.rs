//! The upload-processing pipeline: normalize → detect → reconcile.
//!
//! Shared by the synchronous upload path and the background queue worker.
//! Intermediate files are removed on success and failure alike; the
//! canonical MP4 is kept (it is what `/uploads/{path}` serves back).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use benthos_core::annotation::read_annotation_times;
use benthos_core::detection::{Batch, RawFinding, VideoInfo};
use benthos_core::reconcile::reconcile;
use benthos_core::{ffmpeg, timeline, CoreResult};
use benthos_detect::{Detector, ProgressObserver};

use crate::config::ServerConfig;

/// Everything one processing run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub batch: Batch,
    pub video_info: VideoInfo,
    /// Rendered timeline chart, PNG bytes.
    pub timeline_png: Vec<u8>,
}

/// Removes the wrapped file when dropped. Used so stored inputs and
/// intermediates disappear on every failure path, early returns included;
/// callers disarm the guard for files that outlive a successful run.
pub(crate) struct RemoveOnDrop(Option<PathBuf>);

impl RemoveOnDrop {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self(Some(path))
    }

    /// Keep the file after all: the guard becomes a no-op.
    pub(crate) fn disarm(&mut self) {
        self.0.take();
    }
}

impl Drop for RemoveOnDrop {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::debug!(path = %path.display(), error = %e, "Intermediate cleanup skipped");
            }
        }
    }
}

/// Hide detector-provided labels, leaving the default description.
fn strip_labels(findings: &mut [RawFinding]) {
    for finding in findings {
        finding.label = None;
    }
}

/// Run the full pipeline over a stored upload.
///
/// `annotation_path` is an optional CSV of human timecodes; `show_labels =
/// false` hides engine labels from the resulting batch. Progress lands on
/// `progress` while detection runs, with a final `100` published on
/// success.
pub async fn run(
    config: &ServerConfig,
    detector: &Arc<dyn Detector>,
    video_path: &Path,
    annotation_path: Option<&Path>,
    show_labels: bool,
    progress: Option<ProgressObserver>,
) -> CoreResult<PipelineOutput> {
    // --- Normalize ---
    let normalized = match ffmpeg::normalize_to_mp4(video_path).await {
        Ok(path) => path,
        Err(e) => {
            // A failed transcode may leave a partial output behind.
            let partial = video_path.with_extension(ffmpeg::CANONICAL_EXTENSION);
            if partial != video_path {
                drop(RemoveOnDrop(Some(partial)));
            }
            return Err(e);
        }
    };

    // When a transcode happened, the original container is now an
    // intermediate; it goes away whatever happens below.
    let _original_cleanup = RemoveOnDrop((normalized != video_path).then(|| video_path.to_path_buf()));

    // The canonical file is only kept when the whole run succeeds; any
    // later failure removes it too.
    let mut normalized_cleanup = RemoveOnDrop::new(normalized.clone());

    // --- Probe ---
    let video_info = ffmpeg::video_info(&normalized).await?;

    // --- Detect ---
    let mut findings = detector.detect(&normalized, progress.clone()).await?;
    if !show_labels {
        strip_labels(&mut findings);
    }

    // --- Annotations ---
    let annotation_times = match annotation_path {
        Some(path) => {
            let bytes = tokio::fs::read(path).await?;
            read_annotation_times(bytes.as_slice(), &config.annotation_config())?
        }
        None => Vec::new(),
    };

    // --- Reconcile + render ---
    let batch = reconcile(findings, &annotation_times, config.tolerance_secs);
    let timeline_png =
        timeline::render_timeline(&batch.detections, &batch.annotation_times, video_info.duration)?;

    tracing::info!(
        video = %video_info.name,
        detections = batch.detections.len(),
        annotations = batch.counts.total_annotations,
        annotated = batch.counts.total_annotated,
        "Pipeline run complete"
    );

    if let Some(observe) = progress {
        observe(100);
    }

    // Success: the canonical MP4 stays (it is what `/uploads` serves back).
    normalized_cleanup.disarm();

    Ok(PipelineOutput {
        batch,
        video_info,
        timeline_png,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use benthos_core::CoreError;
    use benthos_detect::MockDetector;

    fn test_config(dir: &Path) -> ServerConfig {
        let mut config = crate::config::test_support::baseline();
        config.upload_dir = dir.to_path_buf();
        config
    }

    #[test]
    fn strip_labels_clears_every_label() {
        let mut findings = vec![
            RawFinding {
                label: Some("eelpout".into()),
                ..RawFinding::at(1.0)
            },
            RawFinding::at(2.0),
        ];
        strip_labels(&mut findings);
        assert!(findings.iter().all(|f| f.label.is_none()));
    }

    #[tokio::test]
    async fn missing_video_surfaces_as_unsupported_format() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let detector: Arc<dyn Detector> = Arc::new(MockDetector::fixed_default());

        let err = run(
            &config,
            &detector,
            &dir.path().join("missing.mp4"),
            None,
            true,
            None,
        )
        .await
        .unwrap_err();

        assert_matches!(err, CoreError::UnsupportedFormat(_));
    }

    #[tokio::test]
    async fn remove_on_drop_deletes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("intermediate.avi");
        std::fs::write(&path, b"x").unwrap();

        drop(RemoveOnDrop(Some(path.clone())));
        assert!(!path.exists());
    }

    #[test]
    fn disarmed_guard_keeps_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kept.mp4");
        std::fs::write(&path, b"x").unwrap();

        let mut guard = RemoveOnDrop::new(path.clone());
        guard.disarm();
        drop(guard);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn failed_run_removes_the_canonical_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let detector: Arc<dyn Detector> = Arc::new(MockDetector::fixed_default());

        // Already-canonical container, so no transcode happens; the probe
        // stage fails on the garbage payload and the file must not survive.
        let video = dir.path().join("dive.mp4");
        std::fs::write(&video, b"not a video").unwrap();

        run(&config, &detector, &video, None, true, None)
            .await
            .unwrap_err();

        assert!(!video.exists(), "failed run must not keep the canonical file");
    }
}
