//! Procesador de descripción (§3.3, §4.4 "linear, self-contained"). Se
//! invoca tanto para la generación inicial (historial vacío) como para el
//! feedback del usuario: el llamador añade una entrada de historial con
//! `model_response` vacío antes de despachar; este procesador la completa.

use std::sync::Arc;

use async_trait::async_trait;
use mediaflow_core::model::job::{JobPayload, JobStatus};
use mediaflow_dispatch::{DispatchError, JobRunner};
use mediaflow_store::SessionStore;

use crate::providers::AiProvider;

pub struct DescriptionProcessor {
    store: Arc<SessionStore>,
    ai: Arc<dyn AiProvider>,
}

impl DescriptionProcessor {
    pub fn new(store: Arc<SessionStore>, ai: Arc<dyn AiProvider>) -> Self {
        Self { store, ai }
    }
}

#[async_trait]
impl JobRunner for DescriptionProcessor {
    async fn run(&self, session_id: String, payload: JobPayload) -> Result<(), DispatchError> {
        let JobPayload::Description(mut job) = payload else { return Ok(()) };
        let now = chrono::Utc::now().timestamp();

        job.status = JobStatus::Processing;
        let _ = self.store.put_description_job(&session_id, &job, now).await;

        let pending_feedback = job.history.iter().rev().find(|e| e.model_response.is_empty()).map(|e| e.user_feedback.clone());

        match self.ai.generate_caption(&job.media_keys, pending_feedback.as_deref()).await {
            Ok(result) => {
                job.caption = Some(result.caption.clone());
                job.hashtags = result.hashtags;
                job.location_tag = result.location_tag;
                job.raw_response = Some(result.raw_response.clone());
                if let Some(entry) = job.history.iter_mut().rev().find(|e| e.model_response.is_empty()) {
                    entry.model_response = result.raw_response;
                }
                job.status = JobStatus::Complete;
            }
            Err(e) => {
                job.status = JobStatus::Error;
                job.error = Some(e.user_message());
            }
        }

        self.store.put_description_job(&session_id, &job, now).await.map_err(DispatchError::from)
    }
}
