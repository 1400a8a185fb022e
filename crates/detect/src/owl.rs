//! Delegating detection source: drives the external `owl-highlighter`
//! vision engine as a subprocess.
//!
//! Wire protocol: the engine writes `PROGRESS <0-100>` lines to stdout while
//! it works, then a single JSON report as the final output. Anything it
//! writes to stderr is only surfaced when the process exits non-zero.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use benthos_core::detection::RawFinding;
use benthos_core::{CoreError, CoreResult};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};

use crate::{Detector, ProgressObserver};

/// Default engine binary name, resolved via `PATH`.
pub const DEFAULT_BINARY: &str = "owl-highlighter";

/// Default minimum score for a finding to be reported.
pub const DEFAULT_SCORE_THRESHOLD: f64 = 0.3;

/// Detection source that forwards to the external vision engine.
///
/// Score threshold and label visibility are fixed at construction and passed
/// through on the command line; they are never decided per-call.
#[derive(Debug, Clone)]
pub struct OwlDetector {
    binary: PathBuf,
    score_threshold: f64,
    show_labels: bool,
}

impl OwlDetector {
    pub fn new(binary: impl Into<PathBuf>, score_threshold: f64, show_labels: bool) -> Self {
        Self {
            binary: binary.into(),
            score_threshold,
            show_labels,
        }
    }
}

impl Default for OwlDetector {
    fn default() -> Self {
        Self::new(DEFAULT_BINARY, DEFAULT_SCORE_THRESHOLD, true)
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

/// The engine's JSON report.
#[derive(Debug, Deserialize)]
struct OwlReport {
    findings: Vec<OwlFinding>,
}

/// One finding as the engine reports it.
#[derive(Debug, Deserialize)]
struct OwlFinding {
    timestamp: f64,
    label: Option<String>,
    score: Option<f64>,
    bbox: Option<[f64; 4]>,
    frame: Option<i64>,
    /// Base64-encoded cropped patch.
    image: Option<String>,
}

/// Parse a `PROGRESS <n>` stdout line; `None` for anything else.
fn parse_progress_line(line: &str) -> Option<u8> {
    line.strip_prefix("PROGRESS ")?.trim().parse::<u8>().ok()
}

/// Parse the engine's final JSON report into raw findings.
///
/// An undecodable image patch drops the patch, not the finding.
fn parse_report(json: &str) -> CoreResult<Vec<RawFinding>> {
    let report: OwlReport = serde_json::from_str(json).map_err(|e| {
        CoreError::DetectionFailure(format!("unparseable engine report: {e}"))
    })?;

    Ok(report
        .findings
        .into_iter()
        .map(|f| {
            let image = f.image.and_then(|encoded| match BASE64.decode(encoded.as_bytes()) {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    tracing::debug!(error = %e, time = f.timestamp, "Dropping undecodable image patch");
                    None
                }
            });
            RawFinding {
                time: f.timestamp,
                label: f.label,
                confidence: f.score,
                bbox: f.bbox,
                frame_number: f.frame,
                image,
            }
        })
        .collect())
}

#[async_trait]
impl Detector for OwlDetector {
    async fn detect(
        &self,
        video_path: &Path,
        progress: Option<ProgressObserver>,
    ) -> CoreResult<Vec<RawFinding>> {
        let mut command = tokio::process::Command::new(&self.binary);
        command
            .arg("--video")
            .arg(video_path)
            .args(["--threshold", &format!("{:.2}", self.score_threshold)])
            .args(["--output-format", "json"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null());
        if !self.show_labels {
            command.arg("--no-labels");
        }

        tracing::info!(
            video = %video_path.display(),
            threshold = self.score_threshold,
            "Starting external detection engine"
        );

        let mut child = command.spawn().map_err(|e| {
            CoreError::DetectionFailure(format!(
                "failed to launch {}: {e}",
                self.binary.display()
            ))
        })?;

        // Drain stderr on its own task. A chatty engine can fill the OS
        // pipe buffer; if nobody reads it, the engine blocks on stderr and
        // stops producing stdout, stalling the loop below.
        let stderr_pipe = child.stderr.take();
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            if let Some(mut pipe) = stderr_pipe {
                let _ = pipe.read_to_string(&mut buf).await;
            }
            buf
        });

        // Stream stdout: progress lines go to the observer as they arrive,
        // everything else accumulates into the final JSON report.
        let stdout = child.stdout.take().ok_or_else(|| {
            CoreError::DetectionFailure("engine stdout was not captured".to_string())
        })?;
        let mut lines = BufReader::new(stdout).lines();
        let mut report = String::new();
        let mut last_progress = 0u8;

        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| CoreError::DetectionFailure(format!("engine stdout read: {e}")))?
        {
            match parse_progress_line(&line) {
                Some(value) => {
                    // The observer contract is monotone non-decreasing.
                    let value = value.clamp(last_progress, 100);
                    last_progress = value;
                    if let Some(observe) = &progress {
                        observe(value);
                    }
                }
                None => {
                    report.push_str(&line);
                    report.push('\n');
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| CoreError::DetectionFailure(format!("engine wait: {e}")))?;

        if !status.success() {
            let stderr = stderr_task.await.unwrap_or_default();
            return Err(CoreError::DetectionFailure(format!(
                "engine exited with {:?}: {}",
                status.code(),
                stderr.trim()
            )));
        }

        parse_report(&report)
    }
}
