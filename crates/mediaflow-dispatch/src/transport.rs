//! Transportes del dispatcher (§4.4, §6.2). Ambos son, en este workspace de
//! un solo proceso, un `tokio::spawn` — la diferencia observable está en qué
//! garantía cada uno mantiene, no en el mecanismo de hand-off:
//! - `WorkflowEngineTransport` asume que el propio runner resuelve su
//!   sub-bucle de polling/fan-out internamente (triage, selección,
//!   enhancement, publish); no reintenta la invocación.
//! - `AsyncProcessorTransport` simula la entrega "at-least-once" del
//!   §6.2 reintentando la invocación un número acotado de veces si el runner
//!   devuelve un error de infraestructura (no si el job simplemente termina
//!   en `status=error`, que es un resultado válido y no se reintenta).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mediaflow_core::model::job::JobPayload;

use crate::error::DispatchError;

/// Seam que implementan los procesadores concretos (`mediaflow-processors`).
/// Devolver `Err` señala una falla de infraestructura (p. ej. el propio
/// Session Store rechazó la escritura) que amerita reintento de la
/// invocación; un job que simplemente termina con `status=error` debe
/// devolver `Ok(())` (§4.5, §7 "Processors return nil to the transport").
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(&self, session_id: String, payload: JobPayload) -> Result<(), DispatchError>;
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn dispatch(&self, runner: Arc<dyn JobRunner>, session_id: String, payload: JobPayload);
}

pub struct WorkflowEngineTransport {
    concurrency: Arc<tokio::sync::Semaphore>,
}

impl WorkflowEngineTransport {
    pub fn new(max_concurrent_executions: usize) -> Self {
        Self { concurrency: Arc::new(tokio::sync::Semaphore::new(max_concurrent_executions)) }
    }
}

#[async_trait]
impl Transport for WorkflowEngineTransport {
    async fn dispatch(&self, runner: Arc<dyn JobRunner>, session_id: String, payload: JobPayload) {
        let permit = self.concurrency.clone().acquire_owned().await;
        tokio::spawn(async move {
            let _permit = permit;
            if let Err(e) = runner.run(session_id.clone(), payload).await {
                log::error!("workflow-engine transport: runner failed for session {session_id}: {e}");
            }
        });
    }
}

pub struct AsyncProcessorTransport {
    concurrency: Arc<tokio::sync::Semaphore>,
    max_attempts: u32,
}

impl AsyncProcessorTransport {
    pub fn new(max_concurrent_invocations: usize) -> Self {
        Self { concurrency: Arc::new(tokio::sync::Semaphore::new(max_concurrent_invocations)), max_attempts: 3 }
    }
}

#[async_trait]
impl Transport for AsyncProcessorTransport {
    async fn dispatch(&self, runner: Arc<dyn JobRunner>, session_id: String, payload: JobPayload) {
        let permit = self.concurrency.clone().acquire_owned().await;
        let max_attempts = self.max_attempts;
        tokio::spawn(async move {
            let _permit = permit;
            let mut attempt = 0;
            loop {
                attempt += 1;
                match runner.run(session_id.clone(), payload.clone()).await {
                    Ok(()) => break,
                    Err(e) if attempt < max_attempts => {
                        log::warn!("async-processor transport: invocation {attempt} failed for session {session_id}: {e}, redelivering");
                        tokio::time::sleep(Duration::from_millis(250 * attempt as u64)).await;
                    }
                    Err(e) => {
                        log::error!("async-processor transport: giving up on session {session_id} after {attempt} attempts: {e}");
                        break;
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediaflow_core::model::job::{DescriptionJob, JobStatus};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingRunner {
        calls: Arc<AtomicUsize>,
        fail_times: usize,
    }

    #[async_trait]
    impl JobRunner for CountingRunner {
        async fn run(&self, _session_id: String, _payload: JobPayload) -> Result<(), DispatchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_times {
                return Err(DispatchError::TransportExhausted("simulated infra failure".into()));
            }
            Ok(())
        }
    }

    fn sample_payload() -> JobPayload {
        let mut job = DescriptionJob::pending("d-1".into(), vec![]);
        job.status = JobStatus::Pending;
        JobPayload::Description(job)
    }

    #[tokio::test]
    async fn async_processor_transport_redelivers_on_infra_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let runner = Arc::new(CountingRunner { calls: calls.clone(), fail_times: 2 });
        let transport = AsyncProcessorTransport::new(4);
        transport.dispatch(runner, "s1".into(), sample_payload()).await;
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn workflow_engine_transport_does_not_retry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let runner = Arc::new(CountingRunner { calls: calls.clone(), fail_times: 5 });
        let transport = WorkflowEngineTransport::new(4);
        transport.dispatch(runner, "s1".into(), sample_payload()).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
