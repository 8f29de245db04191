//! Dispatcher (C4, §4.4): el único componente autorizado a escribir un
//! descriptor `pending` y a elegir transporte. Nunca ejecuta el trabajo en el
//! propio proceso de la petición HTTP — sólo encola el `JobRunner` en un
//! transporte y retorna.

use std::sync::Arc;

use mediaflow_core::model::job::JobPayload;
use mediaflow_store::SessionStore;
use uuid::Uuid;

use crate::error::DispatchError;
use crate::transport::{AsyncProcessorTransport, JobRunner, Transport, WorkflowEngineTransport};

/// Las siete variantes de solicitud de despacho distinguidas por la tabla de
/// selección de transporte en §4.4 — nótese que "enhancement" tiene dos
/// entradas (arranque vs. feedback) con transportes distintos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchKind {
    Triage,
    Selection,
    EnhancementStart,
    EnhancementFeedback,
    Download,
    Description,
    Publish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransportKind {
    WorkflowEngine,
    AsyncProcessor,
}

impl DispatchKind {
    fn transport_kind(self) -> TransportKind {
        match self {
            DispatchKind::Selection | DispatchKind::EnhancementStart | DispatchKind::Triage | DispatchKind::Publish => {
                TransportKind::WorkflowEngine
            }
            DispatchKind::Description | DispatchKind::Download | DispatchKind::EnhancementFeedback => TransportKind::AsyncProcessor,
        }
    }
}

pub struct Dispatcher {
    store: Arc<SessionStore>,
    runner: Arc<dyn JobRunner>,
    workflow_transport: WorkflowEngineTransport,
    async_transport: AsyncProcessorTransport,
}

impl Dispatcher {
    pub fn new(store: Arc<SessionStore>, runner: Arc<dyn JobRunner>, workflow_max_concurrency: usize, async_max_concurrency: usize) -> Self {
        Self {
            store,
            runner,
            workflow_transport: WorkflowEngineTransport::new(workflow_max_concurrency),
            async_transport: AsyncProcessorTransport::new(async_max_concurrency),
        }
    }

    /// Ejecuta el protocolo de §4.4: genera un `jobId` fresco con una fuente
    /// aleatoria criptográficamente segura (nunca un timestamp), construye el
    /// descriptor `pending` vía `build_payload`, lo persiste sincrónicamente,
    /// selecciona transporte, y retorna el `jobId` sin esperar a que el
    /// trabajo termine.
    pub async fn dispatch<F>(&self, session_id: &str, kind: DispatchKind, build_payload: F, now: i64) -> Result<String, DispatchError>
    where
        F: FnOnce(String) -> JobPayload,
    {
        let job_id = Uuid::new_v4().to_string();
        let payload = build_payload(job_id.clone());
        self.store.put_job_payload(session_id, &payload, now).await?;

        match kind.transport_kind() {
            TransportKind::WorkflowEngine => {
                self.workflow_transport.dispatch(self.runner.clone(), session_id.to_string(), payload).await
            }
            TransportKind::AsyncProcessor => self.async_transport.dispatch(self.runner.clone(), session_id.to_string(), payload).await,
        }
        Ok(job_id)
    }

    /// Re-encola un job existente (p. ej. una ronda de feedback de
    /// description/enhancement) conservando su `jobId` en vez de acuñar uno
    /// nuevo. El llamador ya construyó el `payload` con el id original y el
    /// estado `pending`/`processing` apropiado; este método sólo persiste y
    /// elige transporte, igual que `dispatch`.
    pub async fn redispatch(&self, session_id: &str, kind: DispatchKind, payload: JobPayload, now: i64) -> Result<(), DispatchError> {
        self.store.put_job_payload(session_id, &payload, now).await?;

        match kind.transport_kind() {
            TransportKind::WorkflowEngine => {
                self.workflow_transport.dispatch(self.runner.clone(), session_id.to_string(), payload).await
            }
            TransportKind::AsyncProcessor => self.async_transport.dispatch(self.runner.clone(), session_id.to_string(), payload).await,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mediaflow_core::model::job::{JobStatus, TriageJob};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    struct FlagRunner(Arc<AtomicBool>);

    #[async_trait]
    impl JobRunner for FlagRunner {
        async fn run(&self, _session_id: String, _payload: JobPayload) -> Result<(), DispatchError> {
            self.0.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn dispatch_writes_pending_descriptor_and_returns_before_runner_completes() {
        let store = Arc::new(SessionStore::new(86_400));
        let ran = Arc::new(AtomicBool::new(false));
        let runner = Arc::new(FlagRunner(ran.clone()));
        let dispatcher = Dispatcher::new(store.clone(), runner, 4, 4);

        let job_id = dispatcher
            .dispatch("s1", DispatchKind::Triage, |id| JobPayload::Triage(TriageJob::pending(id, 3)), 0)
            .await
            .unwrap();

        // Invariante 6 (§8.1): el descriptor ya es legible (pending) y el
        // handler pudo retornar sin que el runner necesariamente haya
        // corrido todavía.
        let stored = store.get_triage_job("s1", &job_id).await.unwrap();
        assert_eq!(stored.status, JobStatus::Pending);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn transport_selection_matches_spec_table() {
        assert_eq!(DispatchKind::Selection.transport_kind(), TransportKind::WorkflowEngine);
        assert_eq!(DispatchKind::EnhancementStart.transport_kind(), TransportKind::WorkflowEngine);
        assert_eq!(DispatchKind::Triage.transport_kind(), TransportKind::WorkflowEngine);
        assert_eq!(DispatchKind::Publish.transport_kind(), TransportKind::WorkflowEngine);
        assert_eq!(DispatchKind::Description.transport_kind(), TransportKind::AsyncProcessor);
        assert_eq!(DispatchKind::Download.transport_kind(), TransportKind::AsyncProcessor);
        assert_eq!(DispatchKind::EnhancementFeedback.transport_kind(), TransportKind::AsyncProcessor);
    }
}
