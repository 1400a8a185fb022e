//! Detection data model: raw findings, reconciled detections, batches.

use serde::{Deserialize, Serialize};

/// Bounding box as `[x1, y1, x2, y2]` in source-frame pixel coordinates.
pub type BBox = [f64; 4];

/// Serde helper: optional binary image payload as a Base64 string in JSON.
pub mod b64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, ser: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(b) => ser.serialize_some(&STANDARD.encode(b)),
            None => ser.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(de)?;
        encoded
            .map(|s| STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom))
            .transpose()
    }
}

// ---------------------------------------------------------------------------
// Raw findings (detector output, pre-reconciliation)
// ---------------------------------------------------------------------------

/// One timestamped finding as emitted by a [`Detector`] implementation,
/// before ids are assigned and annotations are matched.
///
/// Only `time` is guaranteed; everything else depends on the backend (the
/// mock detector emits bare timestamps, the delegating detector fills in
/// label, confidence, bbox, frame number, and a cropped image patch).
///
/// [`Detector`]: https://docs.rs/benthos-detect
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawFinding {
    /// Position in the source video, in seconds.
    pub time: f64,
    /// Free-text category, e.g. `"jellyfish"`.
    pub label: Option<String>,
    /// Detection score in `[0, 1]`.
    pub confidence: Option<f64>,
    /// Bounding box of the finding within the frame.
    pub bbox: Option<BBox>,
    /// Frame index the finding was taken from.
    pub frame_number: Option<i64>,
    /// Cropped still around the finding (encoded image bytes).
    #[serde(default, with = "b64_bytes")]
    pub image: Option<Vec<u8>>,
}

impl RawFinding {
    /// A bare finding carrying only a timestamp (mock-detector shape).
    pub fn at(time: f64) -> Self {
        Self {
            time,
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Detections and batches
// ---------------------------------------------------------------------------

/// Default label when the detector did not supply one.
pub const DEFAULT_LABEL: &str = "organism";

/// One reconciled finding, as held by the store and served to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    /// Unique within a batch; assigned in emission order at reconciliation.
    /// The sole key used by edit/reject.
    pub id: i64,
    /// Position in the source video, in seconds.
    pub time: f64,
    /// Free-text category; mutable via the edit operation.
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, with = "b64_bytes", skip_serializing_if = "Option::is_none")]
    pub image: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_number: Option<i64>,
    /// True when an annotation timecode lies within the tolerance window of
    /// `time`. Computed once at reconciliation, never recomputed.
    pub is_annotated: bool,
    /// True once a client has changed `description`.
    #[serde(default)]
    pub edited: bool,
    /// True once a client has soft-deleted the entry. Rejected detections
    /// are excluded from derived views but not physically removed.
    #[serde(default)]
    pub rejected: bool,
}

/// Summary counts for a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCounts {
    /// Total annotation timecodes parsed from the uploaded CSV.
    pub total_annotations: usize,
    /// Detections matched to at least one annotation.
    pub total_annotated: usize,
    /// Detections with no annotation within the tolerance window.
    pub total_unannotated: usize,
}

/// The full result of one processing run: detections, the annotation times
/// they were matched against, and summary counts.
///
/// Exactly one batch is live at a time; a new upload or demo run replaces
/// the previous one wholesale.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Batch {
    pub detections: Vec<Detection>,
    pub annotation_times: Vec<f64>,
    pub counts: BatchCounts,
}

/// Basic metadata about the processed video, included in upload responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    pub name: String,
    pub fps: f64,
    pub frame_count: i64,
    pub duration: f64,
}
