//! In-memory detection store: the single live batch plus edit/reject state.
//!
//! Process-wide mutable state shared by every request handler. All
//! read-modify-write sequences go through one `RwLock` write guard so
//! concurrent edit/reject calls on the same id cannot lose updates.

use tokio::sync::RwLock;

use crate::detection::{Batch, BatchCounts, Detection};
use crate::error::{CoreError, CoreResult};

/// Which derived view to export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    /// Every non-rejected detection.
    Detections,
    /// Non-rejected detections matched to an annotation.
    Annotated,
    /// Non-rejected detections with no annotation match.
    Unannotated,
}

impl ExportKind {
    /// Parse the URL path segment used by `/download/{kind}`.
    pub fn from_str(kind: &str) -> Option<Self> {
        match kind {
            "detections" => Some(Self::Detections),
            "annotated" => Some(Self::Annotated),
            "unannotated" => Some(Self::Unannotated),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Detections => "detections",
            Self::Annotated => "annotated",
            Self::Unannotated => "unannotated",
        }
    }
}

/// Holder of the current live [`Batch`].
///
/// `replace` swaps the whole batch; `edit`/`reject` mutate one detection by
/// id. Unknown ids return [`CoreError::NotFound`] and leave the store
/// unchanged (the stricter contract — the historical behavior silently
/// ignored unknown ids).
#[derive(Debug, Default)]
pub struct DetectionStore {
    batch: RwLock<Batch>,
}

impl DetectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically swap the entire live batch.
    pub async fn replace(&self, batch: Batch) {
        let mut guard = self.batch.write().await;
        *guard = batch;
    }

    /// Snapshot of the full current batch (including rejected entries).
    pub async fn batch(&self) -> Batch {
        self.batch.read().await.clone()
    }

    /// Change the description of the detection with `id` and mark it edited.
    pub async fn edit(&self, id: i64, new_description: &str) -> CoreResult<()> {
        let mut guard = self.batch.write().await;
        let detection = find_mut(&mut guard, id)?;
        detection.description = new_description.to_string();
        detection.edited = true;
        Ok(())
    }

    /// Soft-delete the detection with `id`. Idempotent.
    pub async fn reject(&self, id: i64) -> CoreResult<()> {
        let mut guard = self.batch.write().await;
        let detection = find_mut(&mut guard, id)?;
        detection.rejected = true;
        Ok(())
    }

    /// All detections with `rejected == false`.
    pub async fn active_view(&self) -> Vec<Detection> {
        self.filtered(|_| true).await
    }

    /// Active detections matched to an annotation.
    pub async fn annotated_view(&self) -> Vec<Detection> {
        self.filtered(|d| d.is_annotated).await
    }

    /// Active detections with no annotation match.
    pub async fn unannotated_view(&self) -> Vec<Detection> {
        self.filtered(|d| !d.is_annotated).await
    }

    /// Summary counts recomputed from the current (non-rejected) state.
    pub async fn counts(&self) -> BatchCounts {
        let guard = self.batch.read().await;
        let annotated = guard
            .detections
            .iter()
            .filter(|d| !d.rejected && d.is_annotated)
            .count();
        let unannotated = guard
            .detections
            .iter()
            .filter(|d| !d.rejected && !d.is_annotated)
            .count();
        BatchCounts {
            total_annotations: guard.annotation_times.len(),
            total_annotated: annotated,
            total_unannotated: unannotated,
        }
    }

    /// Render one view as a CSV payload with explicit edited/rejected
    /// columns. The image payload is not exported.
    pub async fn export(&self, kind: ExportKind) -> CoreResult<String> {
        let view = match kind {
            ExportKind::Detections => self.active_view().await,
            ExportKind::Annotated => self.annotated_view().await,
            ExportKind::Unannotated => self.unannotated_view().await,
        };

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record([
                "id",
                "time",
                "description",
                "confidence",
                "frame_number",
                "is_annotated",
                "edited",
                "rejected",
            ])
            .map_err(csv_io_error)?;

        for d in &view {
            writer
                .write_record([
                    d.id.to_string(),
                    format!("{:.3}", d.time),
                    d.description.clone(),
                    d.confidence.map(|c| format!("{c:.4}")).unwrap_or_default(),
                    d.frame_number.map(|f| f.to_string()).unwrap_or_default(),
                    d.is_annotated.to_string(),
                    d.edited.to_string(),
                    d.rejected.to_string(),
                ])
                .map_err(csv_io_error)?;
        }

        let bytes = writer.into_inner().map_err(|e| {
            CoreError::Io(std::io::Error::other(e.to_string()))
        })?;
        String::from_utf8(bytes)
            .map_err(|e| CoreError::Io(std::io::Error::other(e.to_string())))
    }

    async fn filtered<F: Fn(&Detection) -> bool>(&self, keep: F) -> Vec<Detection> {
        self.batch
            .read()
            .await
            .detections
            .iter()
            .filter(|d| !d.rejected && keep(d))
            .cloned()
            .collect()
    }
}

fn find_mut(batch: &mut Batch, id: i64) -> CoreResult<&mut Detection> {
    batch
        .detections
        .iter_mut()
        .find(|d| d.id == id)
        .ok_or(CoreError::NotFound {
            entity: "Detection",
            id,
        })
}

fn csv_io_error(e: csv::Error) -> CoreError {
    CoreError::Io(std::io::Error::other(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::RawFinding;
    use crate::reconcile::{reconcile, DEFAULT_TOLERANCE_SECS};
    use assert_matches::assert_matches;

    async fn seeded_store() -> DetectionStore {
        // Times [10.4, 45.0, 50.9] against annotations [10.0, 50.0]:
        // ids 1 and 3 annotated, id 2 unannotated.
        let batch = reconcile(
            vec![
                RawFinding::at(10.4),
                RawFinding::at(45.0),
                RawFinding::at(50.9),
            ],
            &[10.0, 50.0],
            DEFAULT_TOLERANCE_SECS,
        );
        let store = DetectionStore::new();
        store.replace(batch).await;
        store
    }

    #[tokio::test]
    async fn edit_sets_description_and_flag() {
        let store = seeded_store().await;
        store.edit(2, "ctenophore").await.unwrap();
        store.edit(2, "larvacean").await.unwrap();

        let batch = store.batch().await;
        let d = batch.detections.iter().find(|d| d.id == 2).unwrap();
        assert_eq!(d.description, "larvacean");
        assert!(d.edited);
    }

    #[tokio::test]
    async fn reject_is_idempotent() {
        let store = seeded_store().await;
        store.reject(1).await.unwrap();
        let after_one = store.batch().await;
        store.reject(1).await.unwrap();
        let after_two = store.batch().await;

        assert!(after_one.detections[0].rejected);
        assert_eq!(
            after_one.detections[0].rejected,
            after_two.detections[0].rejected
        );
        assert_eq!(after_one.detections.len(), after_two.detections.len());
    }

    #[tokio::test]
    async fn unknown_id_is_not_found_and_leaves_store_unchanged() {
        let store = seeded_store().await;
        let before = store.batch().await;

        assert_matches!(
            store.edit(999, "x").await,
            Err(CoreError::NotFound { id: 999, .. })
        );
        assert_matches!(store.reject(999).await, Err(CoreError::NotFound { .. }));

        let after = store.batch().await;
        assert_eq!(serde_json::to_value(&before).unwrap(), serde_json::to_value(&after).unwrap());
    }

    #[tokio::test]
    async fn rejected_detections_leave_all_views() {
        let store = seeded_store().await;
        assert_eq!(store.annotated_view().await.len(), 2);

        store.reject(1).await.unwrap();

        assert_eq!(store.active_view().await.len(), 2);
        assert_eq!(store.annotated_view().await.len(), 1);
        assert_eq!(store.unannotated_view().await.len(), 1);

        let counts = store.counts().await;
        assert_eq!(counts.total_annotated, 1);
        assert_eq!(counts.total_unannotated, 1);
        // The annotation set itself is untouched by rejection.
        assert_eq!(counts.total_annotations, 2);
    }

    #[tokio::test]
    async fn is_annotated_survives_edit_and_reject() {
        let store = seeded_store().await;
        store.edit(1, "renamed").await.unwrap();
        store.reject(1).await.unwrap();

        let batch = store.batch().await;
        let d = batch.detections.iter().find(|d| d.id == 1).unwrap();
        assert!(d.is_annotated, "reconciliation flag must never be recomputed");
    }

    #[tokio::test]
    async fn export_excludes_rejected_rows() {
        let store = seeded_store().await;
        store.reject(1).await.unwrap();

        let csv = store.export(ExportKind::Annotated).await.unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "id,time,description,confidence,frame_number,is_annotated,edited,rejected"
        );
        let rows: Vec<&str> = lines.collect();
        assert_eq!(rows.len(), 1, "only the surviving annotated detection: {rows:?}");
        assert!(rows[0].starts_with("3,50.900"));
    }

    #[tokio::test]
    async fn export_has_edited_and_rejected_columns_defaulting_to_false() {
        let store = seeded_store().await;
        let csv = store.export(ExportKind::Detections).await.unwrap();
        for row in csv.lines().skip(1) {
            assert!(row.ends_with(",false,false"), "fresh rows default both flags: {row}");
        }
    }

    #[tokio::test]
    async fn replace_swaps_batch_wholesale() {
        let store = seeded_store().await;
        store.replace(Batch::default()).await;
        assert!(store.active_view().await.is_empty());
        assert_eq!(store.counts().await, BatchCounts::default());
    }

    #[test]
    fn export_kind_parses_known_segments_only() {
        assert_eq!(ExportKind::from_str("detections"), Some(ExportKind::Detections));
        assert_eq!(ExportKind::from_str("annotated"), Some(ExportKind::Annotated));
        assert_eq!(ExportKind::from_str("unannotated"), Some(ExportKind::Unannotated));
        assert_eq!(ExportKind::from_str("bogus"), None);
    }
}
