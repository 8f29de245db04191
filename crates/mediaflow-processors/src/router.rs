//! Un único `JobRunner` que el `Dispatcher` invoca para todo kind de job
//! (§4.5: "cada processor es un handler `(context, Event) -> (Result,
//! error)`"), delegando según la variante del `JobPayload` al procesador
//! concreto. Un evento de un kind sin handler (no debería ocurrir, el
//! dispatcher construye el payload del kind correcto) se registra como
//! `unknown event type` y deja el descriptor intacto (§8.3 boundary).

use std::sync::Arc;

use async_trait::async_trait;
use mediaflow_core::model::job::JobPayload;
use mediaflow_dispatch::{DispatchError, JobRunner};

use crate::description::DescriptionProcessor;
use crate::download::DownloadProcessor;
use crate::enhancement::EnhancementProcessor;
use crate::publish::PublishProcessor;
use crate::selection::SelectionProcessor;
use crate::triage::TriageProcessor;

pub struct ProcessorRouter {
    pub triage: Arc<TriageProcessor>,
    pub selection: Arc<SelectionProcessor>,
    pub enhancement: Arc<EnhancementProcessor>,
    pub download: Arc<DownloadProcessor>,
    pub description: Arc<DescriptionProcessor>,
    pub publish: Arc<PublishProcessor>,
}

#[async_trait]
impl JobRunner for ProcessorRouter {
    async fn run(&self, session_id: String, payload: JobPayload) -> Result<(), DispatchError> {
        match payload {
            JobPayload::Triage(_) => self.triage.run(session_id, payload).await,
            JobPayload::Selection(_) => self.selection.run(session_id, payload).await,
            JobPayload::Enhancement(_) => self.enhancement.run(session_id, payload).await,
            JobPayload::Download(_) => self.download.run(session_id, payload).await,
            JobPayload::Description(_) => self.description.run(session_id, payload).await,
            JobPayload::Publish(_) => self.publish.run(session_id, payload).await,
            JobPayload::PostGroup(_) => {
                log::warn!("router: unexpected PostGroup payload reached the dispatcher for session {session_id}, grouping is synchronous");
                Ok(())
            }
        }
    }
}
