//! Escenario E (§8.4): empaquetado de descarga (first-fit-decreasing) a
//! través del `Dispatcher` completo en vez de `DownloadProcessor::run`
//! directo.

use std::sync::Arc;
use std::time::Duration;

use mediaflow_core::model::job::{DownloadJob, JobPayload, JobStatus};
use mediaflow_core::Session;
use mediaflow_dispatch::{DispatchKind, Dispatcher};
use mediaflow_processors::providers::mock::{MockAiProvider, MockBlobStore, MockSocialPublisher};
use mediaflow_processors::router::ProcessorRouter;
use mediaflow_processors::{description, download, enhancement, publish, selection, triage};
use mediaflow_store::{FileProcessingStore, SessionStore};

const MIB: u64 = 1024 * 1024;

#[tokio::test]
async fn bundle_packing_through_dispatcher_matches_scenario_e() {
    let store = Arc::new(SessionStore::new(86_400));
    let files = Arc::new(FileProcessingStore::new(4 * 60 * 60));

    let mut session = Session::new("s1".into(), "user-1".into(), None, 0);
    session.uploaded_keys = Some(vec!["img.jpg".into(), "v400.mp4".into(), "v200.mp4".into(), "v100.mp4".into(), "v50.mp4".into()]);
    store.put_session(&session, 0).await.unwrap();

    let ai = Arc::new(MockAiProvider::new(vec![]));
    let blobs = Arc::new(MockBlobStore::default());
    blobs.seed_size("s1/img.jpg", 5 * MIB);
    blobs.seed_size("s1/v400.mp4", 400 * MIB);
    blobs.seed_size("s1/v200.mp4", 200 * MIB);
    blobs.seed_size("s1/v100.mp4", 100 * MIB);
    blobs.seed_size("s1/v50.mp4", 50 * MIB);
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

    let job_id = dispatcher.dispatch("s1", DispatchKind::Download, |id| JobPayload::Download(DownloadJob::pending(id)), 0).await.unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;

    let job = store.get_download_job("s1", &job_id).await.unwrap();
    assert_eq!(job.status, JobStatus::Complete);
    let names: Vec<_> = job.bundles.iter().map(|b| b.name.clone()).collect();
    assert_eq!(names, vec!["images-0.zip", "videos-1.zip", "videos-2.zip"]);
    assert_eq!(job.bundles[1].file_count, 1);
    assert_eq!(job.bundles[2].file_count, 3);
    assert_eq!(job.bundles[2].total_size, 350 * MIB);
}
