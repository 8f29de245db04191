//! Procesador de triage (§3.3, §8.4 Escenario A): una sola invocación de IA
//! clasifica todas las fotos subidas en `keep`/`discard`.

use std::sync::Arc;

use async_trait::async_trait;
use mediaflow_core::model::job::{JobPayload, JobStatus, TriageItem, TriagePhase};
use mediaflow_dispatch::{DispatchError, JobRunner};
use mediaflow_store::SessionStore;

use crate::providers::AiProvider;

pub struct TriageProcessor {
    store: Arc<SessionStore>,
    ai: Arc<dyn AiProvider>,
}

impl TriageProcessor {
    pub fn new(store: Arc<SessionStore>, ai: Arc<dyn AiProvider>) -> Self {
        Self { store, ai }
    }
}

#[async_trait]
impl JobRunner for TriageProcessor {
    async fn run(&self, session_id: String, payload: JobPayload) -> Result<(), DispatchError> {
        let JobPayload::Triage(mut job) = payload else { return Ok(()) };
        let now = chrono::Utc::now().timestamp();

        job.phase = TriagePhase::Analyzing;
        job.status = JobStatus::Processing;
        let _ = self.store.put_triage_job(&session_id, &job, now).await;

        let filenames = match self.store.get_session(&session_id).await {
            Ok(session) => session.uploaded_keys.unwrap_or_default(),
            Err(e) => {
                log::warn!("triage {}: session lookup failed, falling back to empty upload list: {e}", job.id);
                Vec::new()
            }
        };

        match self.ai.classify_triage(&filenames).await {
            Ok(verdicts) => {
                for (index, verdict) in verdicts.into_iter().enumerate() {
                    let item = TriageItem {
                        media_index: index,
                        filename: verdict.filename.clone(),
                        blob_key: format!("{session_id}/{}", verdict.filename),
                        saveable: verdict.saveable,
                        reason: verdict.reason,
                        thumbnail_url: None,
                    };
                    if verdict.saveable {
                        job.keep.push(item);
                    } else {
                        job.discard.push(item);
                    }
                }
                job.uploaded_files = filenames.len();
                job.phase = TriagePhase::Done;
                job.status = JobStatus::Complete;
            }
            Err(e) => {
                job.status = JobStatus::Error;
                job.error = Some(e.user_message());
            }
        }

        self.store.put_triage_job(&session_id, &job, now).await.map_err(DispatchError::from)
    }
}
