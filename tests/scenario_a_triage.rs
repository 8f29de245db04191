//! Escenario A (§8.4), a través del stack completo: `Dispatcher::dispatch`
//! hasta el `ProcessorRouter`, no invocando `TriageProcessor::run`
//! directamente como hacen las pruebas unitarias del crate.

use std::sync::Arc;
use std::time::Duration;

use mediaflow_core::model::job::{JobPayload, JobStatus, TriageJob};
use mediaflow_core::Session;
use mediaflow_dispatch::{DispatchKind, Dispatcher};
use mediaflow_processors::providers::mock::MockAiProvider;
use mediaflow_processors::router::ProcessorRouter;
use mediaflow_processors::{description, download, enhancement, publish, selection, triage};
use mediaflow_store::{FileProcessingStore, SessionStore};

#[tokio::test]
async fn happy_triage_through_dispatcher() {
    let store = Arc::new(SessionStore::new(86_400));
    let files = Arc::new(FileProcessingStore::new(4 * 60 * 60));

    let mut session = Session::new("s1".into(), "user-1".into(), None, 0);
    session.uploaded_keys = Some(vec!["a.jpg".into(), "b.jpg".into(), "c.jpg".into()]);
    store.put_session(&session, 0).await.unwrap();

    let ai = Arc::new(MockAiProvider::new(vec!["a.jpg".into(), "b.jpg".into()]));
    let blobs = Arc::new(mediaflow_processors::providers::mock::MockBlobStore::default());
    let social = Arc::new(mediaflow_processors::providers::mock::MockSocialPublisher::new(3));

    let processors = Arc::new(ProcessorRouter {
        triage: Arc::new(triage::TriageProcessor::new(store.clone(), ai.clone())),
        selection: Arc::new(selection::SelectionProcessor::new(store.clone(), ai.clone())),
        enhancement: Arc::new(enhancement::EnhancementProcessor::new(store.clone(), files.clone(), ai.clone(), blobs.clone())),
        download: Arc::new(download::DownloadProcessor::new(store.clone(), blobs.clone())),
        description: Arc::new(description::DescriptionProcessor::new(store.clone(), ai.clone())),
        publish: Arc::new(publish::PublishProcessor::new(store.clone(), social)),
    });
    let dispatcher = Dispatcher::new(store.clone(), processors, 4, 4);

    let job_id =
        dispatcher.dispatch("s1", DispatchKind::Triage, |id| JobPayload::Triage(TriageJob::pending(id, 3)), 0).await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;

    let job = store.get_triage_job("s1", &job_id).await.unwrap();
    assert_eq!(job.status, JobStatus::Complete);
    assert_eq!(job.keep.iter().map(|i| i.filename.clone()).collect::<Vec<_>>(), vec!["a.jpg", "b.jpg"]);
    assert_eq!(job.discard.iter().map(|i| i.filename.clone()).collect::<Vec<_>>(), vec!["c.jpg"]);
}
