//! Domain error type shared across the workspace.

/// Domain-level error for the detection pipeline and store.
///
/// The HTTP layer (`benthos-api`) wraps this in its own `AppError` and maps
/// each variant to a status code; nothing in core knows about HTTP.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// An entity addressed by id does not exist.
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Tabular annotation input is missing its required timecode column.
    #[error("malformed annotation input: {0}")]
    MalformedInput(String),

    /// The uploaded video could not be decoded at all.
    #[error("unsupported video format: {0}")]
    UnsupportedFormat(String),

    /// ffmpeg failed while re-encoding to the canonical container.
    #[error("transcode failed: {0}")]
    TranscodeFailure(String),

    /// The detection engine failed; carries the underlying message.
    #[error("detection failed: {0}")]
    DetectionFailure(String),

    /// Filesystem error while moving uploads or intermediates around.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout core and the pipeline.
pub type CoreResult<T> = Result<T, CoreError>;
