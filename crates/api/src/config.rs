use std::path::PathBuf;

use benthos_core::annotation::{AnnotationConfig, TimecodeFormat};
use benthos_core::reconcile::DEFAULT_TOLERANCE_SECS;
use benthos_detect::owl::DEFAULT_SCORE_THRESHOLD;

/// Which detection backend to construct at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorMode {
    /// Fixed-timecode mock, for demos and tests.
    Mock,
    /// The external `owl-highlighter` engine.
    Owl,
}

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Directory where uploads and transcoded intermediates are stored.
    pub upload_dir: PathBuf,
    /// Maximum accepted request body size in bytes.
    pub max_upload_bytes: usize,
    /// Detection backend selection.
    pub detector: DetectorMode,
    /// Minimum score the delegating engine reports findings at.
    pub score_threshold: f64,
    /// Whether the engine should label its cropped patches.
    pub show_labels: bool,
    /// ± window in seconds for matching detections to annotations.
    pub tolerance_secs: f64,
    /// Name of the annotation CSV timecode column.
    pub annotation_column: String,
    /// `seconds` or `datetime` interpretation of that column.
    pub annotation_format: TimecodeFormat,
    /// Artificial delay for `/demo`, in milliseconds.
    pub demo_delay_ms: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default        |
    /// |------------------------|----------------|
    /// | `HOST`                 | `0.0.0.0`      |
    /// | `PORT`                 | `3000`         |
    /// | `CORS_ORIGINS`         | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS` | `30`           |
    /// | `UPLOAD_DIR`           | `uploads`      |
    /// | `MAX_UPLOAD_MB`        | `512`          |
    /// | `DETECTOR`             | `owl` (`mock` for stub runs) |
    /// | `SCORE_THRESHOLD`      | `0.3`          |
    /// | `SHOW_LABELS`          | `true`         |
    /// | `TOLERANCE_SECS`       | `1.0`          |
    /// | `ANNOTATION_COLUMN`    | `Start Date`   |
    /// | `ANNOTATION_FORMAT`    | `datetime` (`seconds` for numeric columns) |
    /// | `DEMO_DELAY_MS`        | `0`            |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let upload_dir =
            PathBuf::from(std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".into()));

        let max_upload_mb: usize = std::env::var("MAX_UPLOAD_MB")
            .unwrap_or_else(|_| "512".into())
            .parse()
            .expect("MAX_UPLOAD_MB must be a valid usize");

        let detector = match std::env::var("DETECTOR").as_deref() {
            Ok("mock") => DetectorMode::Mock,
            Ok("owl") | Err(_) => DetectorMode::Owl,
            Ok(other) => panic!("DETECTOR must be 'mock' or 'owl', got '{other}'"),
        };

        let score_threshold: f64 = std::env::var("SCORE_THRESHOLD")
            .map(|v| v.parse().expect("SCORE_THRESHOLD must be a valid f64"))
            .unwrap_or(DEFAULT_SCORE_THRESHOLD);

        let show_labels = std::env::var("SHOW_LABELS")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let tolerance_secs: f64 = std::env::var("TOLERANCE_SECS")
            .map(|v| v.parse().expect("TOLERANCE_SECS must be a valid f64"))
            .unwrap_or(DEFAULT_TOLERANCE_SECS);

        let annotation_column =
            std::env::var("ANNOTATION_COLUMN").unwrap_or_else(|_| "Start Date".into());

        let annotation_format = match std::env::var("ANNOTATION_FORMAT").as_deref() {
            Ok("seconds") => TimecodeFormat::Seconds,
            Ok("datetime") | Err(_) => TimecodeFormat::DateTime,
            Ok(other) => panic!("ANNOTATION_FORMAT must be 'seconds' or 'datetime', got '{other}'"),
        };

        let demo_delay_ms: u64 = std::env::var("DEMO_DELAY_MS")
            .unwrap_or_else(|_| "0".into())
            .parse()
            .expect("DEMO_DELAY_MS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            upload_dir,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            detector,
            score_threshold,
            show_labels,
            tolerance_secs,
            annotation_column,
            annotation_format,
            demo_delay_ms,
        }
    }

    /// The annotation-reader configuration derived from this server config.
    pub fn annotation_config(&self) -> AnnotationConfig {
        AnnotationConfig {
            column: self.annotation_column.clone(),
            format: self.annotation_format,
        }
    }
}
