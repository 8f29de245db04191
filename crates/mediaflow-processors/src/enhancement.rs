//! Procesador de enhancement (§3.3, §4.4 "fan-out per photo and per video",
//! §8.4 Escenario C): cada foto se procesa de forma independiente, acotado
//! por un semáforo que imita el límite de concurrencia 10 del motor de
//! workflow (§6.2).
//!
//! Un job con `items` vacío es la corrida inicial: los targets salen de
//! `session.uploaded_keys`. Un job con `items` ya poblado es una ronda de
//! feedback (§6.1 `enhancement_feedback`): sólo se reprocesan los ítems en
//! fase `Editing`, con el `feedback_history` existente preservado y el
//! último `user_feedback` pasado a `edit_image`; el resto de `items` queda
//! intacto.

use std::sync::Arc;

use async_trait::async_trait;
use mediaflow_core::model::job::{EnhancementAnalysis, EnhancementItem, EnhancementPhase, FeedbackEntry, JobPayload, JobStatus};
use mediaflow_dispatch::{DispatchError, JobRunner};
use mediaflow_store::{FileProcessingStore, SessionStore};

use crate::error::ProcessorError;
use crate::fingerprint_dedupe::{process_with_fingerprint, FileWork};
use crate::providers::{AiProvider, BlobStore};
use crate::retry::retry_with_backoff;

const FAN_OUT_CONCURRENCY: usize = 10;

/// Un archivo a (re)procesar en esta corrida, con el estado que debe
/// sobrevivir al reprocesamiento.
struct EnhancementTarget {
    filename: String,
    feedback: Option<String>,
    feedback_history: Vec<FeedbackEntry>,
    imagen_edits: u32,
}

pub struct EnhancementProcessor {
    store: Arc<SessionStore>,
    files: Arc<FileProcessingStore>,
    ai: Arc<dyn AiProvider>,
    blobs: Arc<dyn BlobStore>,
}

impl EnhancementProcessor {
    pub fn new(store: Arc<SessionStore>, files: Arc<FileProcessingStore>, ai: Arc<dyn AiProvider>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { store, files, ai, blobs }
    }

    async fn enhance_one(&self, session_id: &str, job_id: &str, target: EnhancementTarget, now: i64) -> Result<EnhancementItem, ProcessorError> {
        let EnhancementTarget { filename, feedback, feedback_history, imagen_edits } = target;
        let original_key = format!("{session_id}/{filename}");
        let bytes = self.blobs.get_bytes(&original_key).await?;

        let ai = self.ai.clone();
        let blobs = self.blobs.clone();
        let enhanced_key_for_work = format!("{session_id}/enhanced/{filename}");
        let filename_for_work = filename.clone();
        let bytes_for_work = bytes.clone();
        let feedback_for_work = feedback.clone();

        // Una ronda de feedback reedita el mismo archivo con bytes
        // idénticos; namespacing el fingerprint por ronda evita que
        // process_with_fingerprint devuelva el resultado cacheado de la
        // edición anterior en vez de invocar edit_image con el feedback
        // nuevo.
        let cache_scope = match &feedback {
            Some(_) => format!("{job_id}:fb{}", imagen_edits + 1),
            None => job_id.to_string(),
        };

        let row = process_with_fingerprint(&self.files, session_id, &cache_scope, &filename, &original_key, &bytes, now, move || async move {
            let bytes = bytes_for_work;
            let analysis = retry_with_backoff(|| {
                let ai = ai.clone();
                let filename = filename_for_work.clone();
                let bytes = bytes.clone();
                async move { ai.analyze_enhancement(&filename, &bytes).await }
            })
            .await?;
            let edited = retry_with_backoff(|| {
                let ai = ai.clone();
                let filename = filename_for_work.clone();
                let bytes = bytes.clone();
                let feedback = feedback_for_work.clone();
                async move { ai.edit_image(&filename, &bytes, feedback.as_deref()).await }
            })
            .await?;
            blobs.put_bytes(&enhanced_key_for_work, &edited).await?;

            let mut metadata = serde_json::Map::new();
            metadata.insert("phase1_text".into(), serde_json::Value::String(analysis.phase1_text.clone()));
            metadata.insert("score".into(), serde_json::json!(analysis.score));
            metadata.insert("improvements".into(), serde_json::json!(analysis.improvements));

            Ok(FileWork {
                processed_key: Some(enhanced_key_for_work.clone()),
                thumbnail_key: None,
                file_type: "image".into(),
                mime_type: "image/jpeg".into(),
                converted: false,
                metadata,
            })
        })
        .await?;

        let phase1_text = row.metadata.get("phase1_text").and_then(|v| v.as_str()).map(|s| s.to_string());
        let score = row.metadata.get("score").and_then(|v| v.as_f64()).unwrap_or(0.0) as f32;
        let improvements = row
            .metadata
            .get("improvements")
            .and_then(|v| v.as_array())
            .map(|a| a.iter().filter_map(|v| v.as_str().map(|s| s.to_string())).collect())
            .unwrap_or_default();

        Ok(EnhancementItem {
            filename,
            phase: EnhancementPhase::Done,
            original_key,
            enhanced_key: row.processed_key,
            phase1_text,
            analysis: Some(EnhancementAnalysis { score, improvements }),
            imagen_edits: imagen_edits + 1,
            feedback_history,
        })
    }
}

#[async_trait]
impl JobRunner for EnhancementProcessor {
    async fn run(&self, session_id: String, payload: JobPayload) -> Result<(), DispatchError> {
        let JobPayload::Enhancement(mut job) = payload else { return Ok(()) };
        let now = chrono::Utc::now().timestamp();

        job.status = JobStatus::Processing;
        let _ = self.store.put_enhancement_job(&session_id, &job, now).await;

        let targets: Vec<EnhancementTarget> = if job.items.is_empty() {
            let filenames = match self.store.get_session(&session_id).await {
                Ok(session) => session.uploaded_keys.unwrap_or_default(),
                Err(_) => Vec::new(),
            };
            job.total_count = filenames.len();
            filenames
                .into_iter()
                .map(|filename| EnhancementTarget { filename, feedback: None, feedback_history: Vec::new(), imagen_edits: 0 })
                .collect()
        } else {
            job.items
                .iter()
                .filter(|item| item.phase == EnhancementPhase::Editing)
                .map(|item| EnhancementTarget {
                    filename: item.filename.clone(),
                    feedback: item.feedback_history.last().map(|f| f.user_feedback.clone()),
                    feedback_history: item.feedback_history.clone(),
                    imagen_edits: item.imagen_edits,
                })
                .collect()
        };

        let semaphore = Arc::new(tokio::sync::Semaphore::new(FAN_OUT_CONCURRENCY));
        let mut tasks = tokio::task::JoinSet::new();
        for target in targets {
            let permit = semaphore.clone().acquire_owned().await.expect("semaphore not closed");
            let session_id = session_id.clone();
            let job_id = job.id.clone();
            let store = self.store.clone();
            let files = self.files.clone();
            let ai = self.ai.clone();
            let blobs = self.blobs.clone();
            tasks.spawn(async move {
                let _permit = permit;
                EnhancementProcessor { store, files, ai, blobs }.enhance_one(&session_id, &job_id, target, now).await
            });
        }

        let mut processed = Vec::new();
        let mut skipped = 0usize;
        while let Some(result) = tasks.join_next().await {
            match result.expect("enhancement task panicked") {
                Ok(item) => processed.push(item),
                Err(e) => {
                    log::warn!("enhancement item failed for session {session_id}, skipping: {e}");
                    skipped += 1;
                }
            }
        }

        for item in processed {
            match job.items.iter_mut().find(|existing| existing.filename == item.filename) {
                Some(existing) => *existing = item,
                None => job.items.push(item),
            }
        }
        job.items.sort_by(|a, b| a.filename.cmp(&b.filename));

        job.completed_count = job.items.iter().filter(|item| item.phase == EnhancementPhase::Done).count();
        job.status = JobStatus::Complete;
        if skipped > 0 {
            job.error = Some(format!("{skipped} item(s) skipped due to processing failures"));
        }

        self.store.put_enhancement_job(&session_id, &job, now).await.map_err(DispatchError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::{MockAiProvider, MockBlobStore};
    use mediaflow_core::model::job::EnhancementJob;
    use mediaflow_core::Session;

    #[tokio::test]
    async fn enhances_two_distinct_files_and_dedupes_identical_fingerprint() {
        let store = Arc::new(SessionStore::new(86_400));
        let files = Arc::new(FileProcessingStore::new(4 * 60 * 60));
        let mut session = Session::new("s1".into(), "user-1".into(), None, 0);
        session.uploaded_keys = Some(vec!["a.jpg".into(), "b.jpg".into()]);
        store.put_session(&session, 0).await.unwrap();

        let ai = Arc::new(MockAiProvider::new(vec![]));
        let blobs = Arc::new(MockBlobStore::default());
        blobs.seed("s1/a.jpg", b"same bytes".to_vec());
        blobs.seed("s1/b.jpg", b"same bytes".to_vec());

        let processor = EnhancementProcessor::new(store.clone(), files.clone(), ai.clone(), blobs.clone());
        let payload = JobPayload::Enhancement(EnhancementJob::pending("enh-1".into(), 2));
        processor.run("s1".into(), payload).await.unwrap();

        let job = store.get_enhancement_job("s1", "enh-1").await.unwrap();
        assert_eq!(job.status, JobStatus::Complete);
        assert_eq!(job.items.len(), 2);
        assert_eq!(ai.call_count(), 2); // una sola huella -> un solo análisis+edición
    }

    #[tokio::test]
    async fn feedback_round_reedits_only_the_targeted_item_with_the_new_feedback() {
        let store = Arc::new(SessionStore::new(86_400));
        let files = Arc::new(FileProcessingStore::new(4 * 60 * 60));
        let mut session = Session::new("s1".into(), "user-1".into(), None, 0);
        session.uploaded_keys = Some(vec!["a.jpg".into(), "b.jpg".into()]);
        store.put_session(&session, 0).await.unwrap();

        let ai = Arc::new(MockAiProvider::new(vec![]));
        let blobs = Arc::new(MockBlobStore::default());
        blobs.seed("s1/a.jpg", b"bytes-a".to_vec());
        blobs.seed("s1/b.jpg", b"bytes-b".to_vec());

        let processor = EnhancementProcessor::new(store.clone(), files.clone(), ai.clone(), blobs.clone());
        processor.run("s1".into(), JobPayload::Enhancement(EnhancementJob::pending("enh-1".into(), 2))).await.unwrap();
        let calls_after_initial = ai.call_count();

        let mut job = store.get_enhancement_job("s1", "enh-1").await.unwrap();
        let item_a = job.items.iter_mut().find(|i| i.filename == "a.jpg").unwrap();
        item_a.feedback_history.push(FeedbackEntry { requested_at: 1, user_feedback: "brighten the sky".into() });
        item_a.phase = EnhancementPhase::Editing;
        let edits_before = item_a.imagen_edits;

        processor.run("s1".into(), JobPayload::Enhancement(job)).await.unwrap();

        assert_eq!(ai.last_edit_feedback().as_deref(), Some("brighten the sky"));
        // sólo a.jpg se reprocesa: dos llamadas más (analyze + edit), b.jpg intacto
        assert_eq!(ai.call_count(), calls_after_initial + 2);

        let job = store.get_enhancement_job("s1", "enh-1").await.unwrap();
        let item_a = job.items.iter().find(|i| i.filename == "a.jpg").unwrap();
        let item_b = job.items.iter().find(|i| i.filename == "b.jpg").unwrap();
        assert_eq!(item_a.phase, EnhancementPhase::Done);
        assert_eq!(item_a.imagen_edits, edits_before + 1);
        assert_eq!(item_a.feedback_history.len(), 1);
        assert_eq!(item_b.imagen_edits, 1);
    }
}
