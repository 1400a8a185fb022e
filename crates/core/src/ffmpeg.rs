//! ffmpeg/ffprobe wrappers: video probing and canonical-container
//! normalization.
//!
//! Uploaded dives arrive in whatever container the camera produced. The
//! detection engine wants MP4/H.264, so anything else is transcoded once on
//! upload. Probing also feeds the `video_info` block of upload responses
//! (fps, frame count, duration).

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::detection::VideoInfo;
use crate::error::{CoreError, CoreResult};

/// The canonical container extension. Inputs already carrying it skip the
/// transcode entirely.
pub const CANONICAL_EXTENSION: &str = "mp4";

// ---------------------------------------------------------------------------
// ffprobe JSON output structures
// ---------------------------------------------------------------------------

/// Top-level ffprobe JSON output (`-print_format json -show_format -show_streams`).
#[derive(Debug, Deserialize)]
pub struct FfprobeOutput {
    pub streams: Vec<FfprobeStream>,
    pub format: FfprobeFormat,
}

/// A single stream from ffprobe output.
#[derive(Debug, Deserialize)]
pub struct FfprobeStream {
    pub codec_name: Option<String>,
    pub codec_type: Option<String>,
    /// e.g. "30/1" or "24000/1001"
    pub r_frame_rate: Option<String>,
    pub duration: Option<String>,
    pub nb_frames: Option<String>,
}

/// Format-level metadata from ffprobe.
#[derive(Debug, Deserialize)]
pub struct FfprobeFormat {
    pub duration: Option<String>,
    pub format_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run `ffprobe` on a video file and return the parsed JSON output.
///
/// A file ffprobe cannot decode surfaces as [`CoreError::UnsupportedFormat`].
pub async fn probe_video(path: &Path) -> CoreResult<FfprobeOutput> {
    if !path.exists() {
        return Err(CoreError::UnsupportedFormat(format!(
            "video file not found: {}",
            path.display()
        )));
    }

    let output = tokio::process::Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .await
        .map_err(|e| CoreError::UnsupportedFormat(format!("ffprobe not available: {e}")))?;

    if !output.status.success() {
        return Err(CoreError::UnsupportedFormat(format!(
            "ffprobe failed (exit code {:?}): {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str::<FfprobeOutput>(&stdout)
        .map_err(|e| CoreError::UnsupportedFormat(format!("unparseable ffprobe output: {e}")))
}

/// Probe a video and summarize it as a [`VideoInfo`] for API responses.
pub async fn video_info(path: &Path) -> CoreResult<VideoInfo> {
    let probe = probe_video(path).await?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    Ok(VideoInfo {
        name,
        fps: parse_framerate(&probe),
        frame_count: parse_total_frames(&probe),
        duration: parse_duration(&probe),
    })
}

/// Ensure `input` is in the canonical MP4 container.
///
/// Inputs already named `*.mp4` are returned as-is. Anything else is probed
/// (so undecodable files fail with [`CoreError::UnsupportedFormat`] before
/// a doomed transcode) and re-encoded to H.264 MP4 next to the input. The
/// input file is left in place either way.
pub async fn normalize_to_mp4(input: &Path) -> CoreResult<PathBuf> {
    let extension = input
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    if extension == CANONICAL_EXTENSION {
        return Ok(input.to_path_buf());
    }

    // Validates decodability; the probe result itself is not needed here.
    probe_video(input).await?;

    let output_path = input.with_extension(CANONICAL_EXTENSION);
    tracing::info!(
        input = %input.display(),
        output = %output_path.display(),
        "Transcoding upload to canonical container"
    );

    let output = tokio::process::Command::new("ffmpeg")
        .args(["-y", "-i"])
        .arg(input)
        .args(["-c:v", "libx264", "-preset", "fast", "-c:a", "aac"])
        .arg(&output_path)
        .output()
        .await
        .map_err(|e| CoreError::TranscodeFailure(format!("ffmpeg not available: {e}")))?;

    if !output.status.success() {
        return Err(CoreError::TranscodeFailure(format!(
            "ffmpeg exited with {:?}: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(output_path)
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Find the first video stream in the ffprobe output.
fn first_video_stream(probe: &FfprobeOutput) -> Option<&FfprobeStream> {
    probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
}

/// Parse the video duration in seconds from ffprobe output.
pub fn parse_duration(probe: &FfprobeOutput) -> f64 {
    // Try format-level duration first.
    if let Some(d) = &probe.format.duration {
        if let Ok(secs) = d.parse::<f64>() {
            return secs;
        }
    }
    // Fall back to the first video stream's duration.
    if let Some(stream) = first_video_stream(probe) {
        if let Some(d) = &stream.duration {
            if let Ok(secs) = d.parse::<f64>() {
                return secs;
            }
        }
    }
    0.0
}

/// Parse the video framerate from ffprobe output.
///
/// The `r_frame_rate` field is a fraction like `"30/1"` or `"24000/1001"`.
pub fn parse_framerate(probe: &FfprobeOutput) -> f64 {
    first_video_stream(probe)
        .and_then(|s| s.r_frame_rate.as_deref())
        .map(parse_fraction)
        .unwrap_or(0.0)
}

/// Parse a fraction string like `"30/1"` into a float.
fn parse_fraction(s: &str) -> f64 {
    let parts: Vec<&str> = s.split('/').collect();
    if parts.len() == 2 {
        let num = parts[0].parse::<f64>().unwrap_or(0.0);
        let den = parts[1].parse::<f64>().unwrap_or(1.0);
        if den > 0.0 {
            return num / den;
        }
    }
    s.parse::<f64>().unwrap_or(0.0)
}

/// Count total frames from ffprobe output, estimating from
/// duration × framerate when the stream does not carry `nb_frames`.
pub fn parse_total_frames(probe: &FfprobeOutput) -> i64 {
    if let Some(stream) = first_video_stream(probe) {
        if let Some(nb) = &stream.nb_frames {
            if let Ok(n) = nb.parse::<i64>() {
                return n;
            }
        }
    }
    let duration = parse_duration(probe);
    let fps = parse_framerate(probe);
    if duration > 0.0 && fps > 0.0 {
        return (duration * fps).round() as i64;
    }
    0
}
