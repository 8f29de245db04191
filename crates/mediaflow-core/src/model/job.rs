//! Tipos de job descriptor — uno por kind, como union etiquetada (§3.3, y la
//! guía de REDESIGN FLAGS de no usar una bolsa de campos opcionales
//! compartida). Todos comparten `id`, `status` y `error`; `sessionId` se
//! deriva de la partición al leer y no se persiste en el payload.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Complete,
    Error,
}

impl JobStatus {
    /// Una vez terminal, ningún procesador puede sobrescribir con un estado
    /// anterior (§3.2 invariante de descriptor terminal).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Error)
    }
}

// ---------------------------------------------------------------------------
// Triage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageItem {
    pub media_index: usize,
    pub filename: String,
    pub blob_key: String,
    pub saveable: bool,
    pub reason: String,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriagePhase {
    Uploading,
    Analyzing,
    Done,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageJob {
    pub id: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub phase: TriagePhase,
    pub total_files: usize,
    pub uploaded_files: usize,
    #[serde(default)]
    pub keep: Vec<TriageItem>,
    #[serde(default)]
    pub discard: Vec<TriageItem>,
}

impl TriageJob {
    pub fn pending(id: String, total_files: usize) -> Self {
        TriageJob {
            id,
            status: JobStatus::Pending,
            error: None,
            phase: TriagePhase::Uploading,
            total_files,
            uploaded_files: 0,
            keep: Vec::new(),
            discard: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedItem {
    pub filename: String,
    pub rank: u32,
    pub scene: String,
    pub justification: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExcludedItem {
    pub filename: String,
    pub reason: String,
    pub category: String,
    pub duplicate_of: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneGroup {
    pub name: String,
    pub gps_range: Option<(f64, f64)>,
    pub time_range: Option<(i64, i64)>,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionJob {
    pub id: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub selected: Vec<SelectedItem>,
    #[serde(default)]
    pub excluded: Vec<ExcludedItem>,
    #[serde(default)]
    pub scene_groups: Vec<SceneGroup>,
}

impl SelectionJob {
    pub fn pending(id: String) -> Self {
        SelectionJob {
            id,
            status: JobStatus::Pending,
            error: None,
            selected: Vec::new(),
            excluded: Vec::new(),
            scene_groups: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Enhancement
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnhancementPhase {
    Queued,
    Analyzing,
    Editing,
    Done,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancementAnalysis {
    pub score: f32,
    pub improvements: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub requested_at: i64,
    pub user_feedback: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancementItem {
    pub filename: String,
    pub phase: EnhancementPhase,
    pub original_key: String,
    pub enhanced_key: Option<String>,
    pub phase1_text: Option<String>,
    pub analysis: Option<EnhancementAnalysis>,
    pub imagen_edits: u32,
    #[serde(default)]
    pub feedback_history: Vec<FeedbackEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancementJob {
    pub id: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub items: Vec<EnhancementItem>,
    pub total_count: usize,
    pub completed_count: usize,
}

impl EnhancementJob {
    pub fn pending(id: String, total_count: usize) -> Self {
        EnhancementJob { id, status: JobStatus::Pending, error: None, items: Vec::new(), total_count, completed_count: 0 }
    }
}

// ---------------------------------------------------------------------------
// Download
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BundleType {
    Images,
    Videos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BundleStatus {
    Pending,
    Zipping,
    Ready,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bundle {
    pub bundle_type: BundleType,
    pub name: String,
    pub zip_key: Option<String>,
    pub download_url: Option<String>,
    pub file_count: usize,
    pub total_size: u64,
    pub zip_size: Option<u64>,
    pub bundle_status: BundleStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadJob {
    pub id: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub bundles: Vec<Bundle>,
}

impl DownloadJob {
    pub fn pending(id: String) -> Self {
        DownloadJob { id, status: JobStatus::Pending, error: None, bundles: Vec::new() }
    }
}

// ---------------------------------------------------------------------------
// Description
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptionHistoryEntry {
    pub user_feedback: String,
    pub model_response: String,
    pub at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptionJob {
    pub id: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub media_keys: Vec<String>,
    pub caption: Option<String>,
    #[serde(default)]
    pub hashtags: Vec<String>,
    pub location_tag: Option<String>,
    pub raw_response: Option<String>,
    #[serde(default)]
    pub history: Vec<DescriptionHistoryEntry>,
}

impl DescriptionJob {
    pub fn pending(id: String, media_keys: Vec<String>) -> Self {
        DescriptionJob {
            id,
            status: JobStatus::Pending,
            error: None,
            media_keys,
            caption: None,
            hashtags: Vec::new(),
            location_tag: None,
            raw_response: None,
            history: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// PostGroup
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    Unpublished,
    Publishing,
    Published,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostGroupJob {
    pub id: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub name: String,
    #[serde(default)]
    pub media_keys: Vec<String>,
    pub caption: Option<String>,
    pub publish_status: PublishStatus,
    pub external_post_id: Option<String>,
}

impl PostGroupJob {
    pub fn pending(id: String, name: String, media_keys: Vec<String>) -> Self {
        PostGroupJob {
            id,
            status: JobStatus::Pending,
            error: None,
            name,
            media_keys,
            caption: None,
            publish_status: PublishStatus::Unpublished,
            external_post_id: None,
        }
    }
}

/// 20 ítems permitidos, 21 rechazado por validación de entrada (§8.3).
pub const MAX_POST_GROUP_ITEMS: usize = 20;

// ---------------------------------------------------------------------------
// Publish
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishPhase {
    CreatingContainers,
    ProcessingVideos,
    CreatingCarousel,
    Publishing,
    Published,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishJob {
    pub id: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub group_id: String,
    pub phase: PublishPhase,
    pub total_items: usize,
    pub completed_items: usize,
    #[serde(default)]
    pub container_ids: Vec<String>,
    pub external_post_id: Option<String>,
}

impl PublishJob {
    pub fn pending(id: String, group_id: String, total_items: usize) -> Self {
        PublishJob {
            id,
            status: JobStatus::Pending,
            error: None,
            group_id,
            phase: PublishPhase::CreatingContainers,
            total_items,
            completed_items: 0,
            container_ids: Vec::new(),
            external_post_id: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Union etiquetada para el transporte (§4.4, §6.2): el payload que viaja al
// motor de workflow o a la invocación fire-and-forget lleva un discriminante
// `type` explícito en vez de inferirse del tipo Rust en el límite de proceso.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobPayload {
    Triage(TriageJob),
    Selection(SelectionJob),
    Enhancement(EnhancementJob),
    Download(DownloadJob),
    Description(DescriptionJob),
    PostGroup(PostGroupJob),
    Publish(PublishJob),
}

impl JobPayload {
    pub fn id(&self) -> &str {
        match self {
            JobPayload::Triage(j) => &j.id,
            JobPayload::Selection(j) => &j.id,
            JobPayload::Enhancement(j) => &j.id,
            JobPayload::Download(j) => &j.id,
            JobPayload::Description(j) => &j.id,
            JobPayload::PostGroup(j) => &j.id,
            JobPayload::Publish(j) => &j.id,
        }
    }

    pub fn status(&self) -> JobStatus {
        match self {
            JobPayload::Triage(j) => j.status,
            JobPayload::Selection(j) => j.status,
            JobPayload::Enhancement(j) => j.status,
            JobPayload::Download(j) => j.status,
            JobPayload::Description(j) => j.status,
            JobPayload::PostGroup(j) => j.status,
            JobPayload::Publish(j) => j.status,
        }
    }

    pub fn sort_key_prefix(&self) -> &'static str {
        use crate::model::step::Step;
        match self {
            JobPayload::Triage(_) => Step::Triage.sort_key_prefix(),
            JobPayload::Selection(_) => Step::Selection.sort_key_prefix(),
            JobPayload::Enhancement(_) => Step::Enhancement.sort_key_prefix(),
            JobPayload::PostGroup(_) => Step::Grouping.sort_key_prefix(),
            JobPayload::Download(_) => Step::Download.sort_key_prefix(),
            JobPayload::Description(_) => Step::Description.sort_key_prefix(),
            JobPayload::Publish(_) => Step::Publish.sort_key_prefix(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_terminal() {
        assert!(JobStatus::Complete.is_terminal());
        assert!(JobStatus::Error.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }

    #[test]
    fn triage_pending_starts_uploading_with_empty_lists() {
        let job = TriageJob::pending("t-1".into(), 3);
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.phase, TriagePhase::Uploading);
        assert!(job.keep.is_empty() && job.discard.is_empty());
    }

    #[test]
    fn job_payload_dispatches_to_correct_sort_key_prefix() {
        let payload = JobPayload::Enhancement(EnhancementJob::pending("e-1".into(), 2));
        assert_eq!(payload.sort_key_prefix(), "ENHANCE#");
        assert_eq!(payload.id(), "e-1");
        assert_eq!(payload.status(), JobStatus::Pending);
    }

    #[test]
    fn job_payload_serializes_with_type_tag() {
        let payload = JobPayload::Download(DownloadJob::pending("d-1".into()));
        let v = serde_json::to_value(&payload).unwrap();
        assert_eq!(v["type"], "download");
        assert_eq!(v["id"], "d-1");
    }

    #[test]
    fn post_group_boundary_constant_matches_spec() {
        assert_eq!(MAX_POST_GROUP_ITEMS, 20);
    }
}
