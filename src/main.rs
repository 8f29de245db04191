//! Punto de entrada del servidor HTTP (C6). Construye los stores, los
//! colaboradores externos (mocks — los proveedores reales están fuera de
//! alcance, §1), el `ProcessorRouter`, el `Dispatcher` y el router de axum,
//! y arranca los barridos de TTL en segundo plano antes de servir.

mod config;

use std::sync::Arc;
use std::time::Duration;

use mediaflow_api::AppState;
use mediaflow_dispatch::Dispatcher;
use mediaflow_processors::description::DescriptionProcessor;
use mediaflow_processors::download::DownloadProcessor;
use mediaflow_processors::enhancement::EnhancementProcessor;
use mediaflow_processors::providers::mock::{MockAiProvider, MockBlobStore, MockSocialPublisher};
use mediaflow_processors::providers::BlobStore;
use mediaflow_processors::publish::PublishProcessor;
use mediaflow_processors::router::ProcessorRouter;
use mediaflow_processors::selection::SelectionProcessor;
use mediaflow_processors::triage::TriageProcessor;
use mediaflow_store::{DbConfig, FileProcessingStore, SessionStore};

/// Cuántos sondeos necesita un contenedor de video simulado antes de
/// terminar (§8.4 Escenario D usa 3).
const MOCK_VIDEO_POLL_THRESHOLD: u32 = 3;

const TTL_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() {
    env_logger::init();
    let server_config = &config::CONFIG;
    let db_config = DbConfig::from_env();

    let (store, files) = build_stores(&db_config).await;

    mediaflow_store::ttl_sweep::spawn_session_sweep(store.clone(), TTL_SWEEP_INTERVAL);
    mediaflow_store::ttl_sweep::spawn_file_processing_sweep(files.clone(), TTL_SWEEP_INTERVAL);

    let ai = Arc::new(MockAiProvider::new(Vec::new()));
    let blobs: Arc<dyn BlobStore> = Arc::new(MockBlobStore::default());
    let social = Arc::new(MockSocialPublisher::new(MOCK_VIDEO_POLL_THRESHOLD));

    let processors = Arc::new(ProcessorRouter {
        triage: Arc::new(TriageProcessor::new(store.clone(), ai.clone())),
        selection: Arc::new(SelectionProcessor::new(store.clone(), ai.clone())),
        enhancement: Arc::new(EnhancementProcessor::new(store.clone(), files.clone(), ai.clone(), blobs.clone())),
        download: Arc::new(DownloadProcessor::new(store.clone(), blobs.clone())),
        description: Arc::new(DescriptionProcessor::new(store.clone(), ai.clone())),
        publish: Arc::new(PublishProcessor::new(store.clone(), social.clone())),
    });

    let dispatcher =
        Arc::new(Dispatcher::new(store.clone(), processors, server_config.workflow_concurrency, server_config.async_concurrency));

    let state = Arc::new(AppState::new(
        store,
        files,
        blobs,
        dispatcher,
        server_config.app_version.clone(),
        server_config.build_time.clone(),
        server_config.origin_secret.clone(),
    ));

    let app = mediaflow_api::build_router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], server_config.port));
    log::info!("mediaflow-server listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await.expect("failed to bind listener");
    axum::serve(listener, app).await.expect("server error");
}

#[cfg(feature = "postgres")]
async fn build_stores(db_config: &DbConfig) -> (Arc<SessionStore>, Arc<FileProcessingStore>) {
    let Some(url) = &db_config.url else {
        return (
            Arc::new(SessionStore::new(db_config.session_ttl_seconds)),
            Arc::new(FileProcessingStore::new(db_config.file_processing_ttl_seconds)),
        );
    };
    let pool = sqlx::postgres::PgPoolOptions::new()
        .min_connections(db_config.min_connections)
        .max_connections(db_config.max_connections)
        .connect(url)
        .await
        .expect("failed to connect to postgres");
    let session_store =
        SessionStore::with_pool(pool.clone(), db_config.session_ttl_seconds).await.expect("session store schema");
    let file_store =
        FileProcessingStore::with_pool(pool, db_config.file_processing_ttl_seconds).await.expect("file store schema");
    (Arc::new(session_store), Arc::new(file_store))
}

#[cfg(not(feature = "postgres"))]
async fn build_stores(db_config: &DbConfig) -> (Arc<SessionStore>, Arc<FileProcessingStore>) {
    (
        Arc::new(SessionStore::new(db_config.session_ttl_seconds)),
        Arc::new(FileProcessingStore::new(db_config.file_processing_ttl_seconds)),
    )
}
