//! Escenario C (§8.4): dos archivos distintos con bytes idénticos comparten
//! huella; el dispatcher sólo invoca al modelo una vez. A diferencia de la
//! prueba unitaria de `fingerprint_dedupe`, aquí se ejercita el fan-out
//! completo de `EnhancementProcessor` a través del `Dispatcher`.

use std::sync::Arc;
use std::time::Duration;

use mediaflow_core::model::job::{EnhancementJob, JobPayload, JobStatus};
use mediaflow_core::Session;
use mediaflow_dispatch::{DispatchKind, Dispatcher};
use mediaflow_processors::providers::mock::{MockAiProvider, MockBlobStore, MockSocialPublisher};
use mediaflow_processors::router::ProcessorRouter;
use mediaflow_processors::{description, download, enhancement, publish, selection, triage};
use mediaflow_store::{FileProcessingStore, SessionStore};

#[tokio::test]
async fn identical_bytes_dedupe_to_a_single_model_call() {
    let store = Arc::new(SessionStore::new(86_400));
    let files = Arc::new(FileProcessingStore::new(4 * 60 * 60));

    let mut session = Session::new("s1".into(), "user-1".into(), None, 0);
    session.uploaded_keys = Some(vec!["a.jpg".into(), "b.jpg".into()]);
    store.put_session(&session, 0).await.unwrap();

    let ai = Arc::new(MockAiProvider::new(vec![]));
    let blobs = Arc::new(MockBlobStore::default());
    blobs.seed("s1/a.jpg", b"f9-bytes".to_vec());
    blobs.seed("s1/b.jpg", b"f9-bytes".to_vec());
    let social = Arc::new(MockSocialPublisher::new(3));

    let processors = Arc::new(ProcessorRouter {
        triage: Arc::new(triage::TriageProcessor::new(store.clone(), ai.clone())),
        selection: Arc::new(selection::SelectionProcessor::new(store.clone(), ai.clone())),
        enhancement: Arc::new(enhancement::EnhancementProcessor::new(store.clone(), files.clone(), ai.clone(), blobs.clone())),
        download: Arc::new(download::DownloadProcessor::new(store.clone(), blobs.clone())),
        description: Arc::new(description::DescriptionProcessor::new(store.clone(), ai.clone())),
        publish: Arc::new(publish::PublishProcessor::new(store.clone(), social)),
    });
    let dispatcher = Dispatcher::new(store.clone(), processors, 4, 4);

    let job_id = dispatcher
        .dispatch("s1", DispatchKind::EnhancementStart, |id| JobPayload::Enhancement(EnhancementJob::pending(id, 2)), 0)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;

    let job = store.get_enhancement_job("s1", &job_id).await.unwrap();
    assert_eq!(job.status, JobStatus::Complete);
    assert_eq!(job.items.len(), 2);
    assert_eq!(ai.call_count(), 2); // una huella compartida -> un análisis + una edición

    let results = files.get_file_results("s1", &job_id).await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].processed_key, results[1].processed_key);
}
