//! Reconciliation engine: match detections against annotation timecodes.
//!
//! A pure function of its inputs — no hidden state. A detection counts as
//! annotated iff at least one annotation time lies strictly within the
//! tolerance window of its timestamp.

use crate::detection::{Batch, BatchCounts, Detection, RawFinding, DEFAULT_LABEL};

/// Default ± window, in seconds, for matching a detection to an annotation.
pub const DEFAULT_TOLERANCE_SECS: f64 = 1.0;

/// Returns true when any annotation time is within `tolerance` of `time`.
fn matches_any(time: f64, annotation_times: &[f64], tolerance: f64) -> bool {
    annotation_times.iter().any(|a| (time - a).abs() < tolerance)
}

/// Build a [`Batch`] from raw detector findings and annotation timecodes.
///
/// Ids are assigned in emission order starting at 1 and stay stable for the
/// lifetime of the batch. An empty annotation set leaves every detection
/// unannotated; an empty finding set yields an empty batch with zero counts.
pub fn reconcile(findings: Vec<RawFinding>, annotation_times: &[f64], tolerance: f64) -> Batch {
    let mut detections = Vec::with_capacity(findings.len());

    for (index, finding) in findings.into_iter().enumerate() {
        let is_annotated = matches_any(finding.time, annotation_times, tolerance);
        detections.push(Detection {
            id: index as i64 + 1,
            time: finding.time,
            description: finding.label.unwrap_or_else(|| DEFAULT_LABEL.to_string()),
            confidence: finding.confidence,
            image: finding.image,
            bbox: finding.bbox,
            frame_number: finding.frame_number,
            is_annotated,
            edited: false,
            rejected: false,
        });
    }

    let total_annotated = detections.iter().filter(|d| d.is_annotated).count();
    let counts = BatchCounts {
        total_annotations: annotation_times.len(),
        total_annotated,
        total_unannotated: detections.len() - total_annotated,
    };

    Batch {
        detections,
        annotation_times: annotation_times.to_vec(),
        counts,
    }
}
