//! Procesador de selección (§3.3): fan-out conceptual (miniaturizado en
//! paralelo, luego un análisis por lote) colapsado aquí a una sola
//! invocación de IA sobre el lote completo, como hace el mock.

use std::sync::Arc;

use async_trait::async_trait;
use mediaflow_core::model::job::{ExcludedItem, JobPayload, JobStatus, SelectedItem};
use mediaflow_dispatch::{DispatchError, JobRunner};
use mediaflow_store::SessionStore;

use crate::providers::AiProvider;

pub struct SelectionProcessor {
    store: Arc<SessionStore>,
    ai: Arc<dyn AiProvider>,
}

impl SelectionProcessor {
    pub fn new(store: Arc<SessionStore>, ai: Arc<dyn AiProvider>) -> Self {
        Self { store, ai }
    }
}

#[async_trait]
impl JobRunner for SelectionProcessor {
    async fn run(&self, session_id: String, payload: JobPayload) -> Result<(), DispatchError> {
        let JobPayload::Selection(mut job) = payload else { return Ok(()) };
        let now = chrono::Utc::now().timestamp();

        job.status = JobStatus::Processing;
        let _ = self.store.put_selection_job(&session_id, &job, now).await;

        let filenames = match self.store.get_session(&session_id).await {
            Ok(session) => session.uploaded_keys.unwrap_or_default(),
            Err(_) => Vec::new(),
        };

        // §8.3: sesión sin medios soportados termina en error, no en una
        // lista vacía silenciosa.
        if filenames.is_empty() {
            job.status = JobStatus::Error;
            job.error = Some("no supported media".into());
            return self.store.put_selection_job(&session_id, &job, now).await.map_err(DispatchError::from);
        }

        match self.ai.rank_selection(&filenames).await {
            Ok(verdict) => {
                job.selected = verdict
                    .selected
                    .into_iter()
                    .map(|(filename, rank, scene, justification)| SelectedItem { filename, rank, scene, justification })
                    .collect();
                job.excluded = verdict
                    .excluded
                    .into_iter()
                    .map(|(filename, reason, category, duplicate_of)| ExcludedItem { filename, reason, category, duplicate_of })
                    .collect();
                job.status = JobStatus::Complete;
            }
            Err(e) => {
                job.status = JobStatus::Error;
                job.error = Some(e.user_message());
            }
        }

        self.store.put_selection_job(&session_id, &job, now).await.map_err(DispatchError::from)
    }
}
