//! Estado compartido del servidor HTTP (C6, §6.1). Un solo `AppState`
//! clonable (Arcs internos) inyectado en el router de axum.

use std::sync::Arc;

use mediaflow_dispatch::Dispatcher;
use mediaflow_processors::providers::BlobStore;
use mediaflow_store::{FileProcessingStore, SessionStore};

pub struct AppState {
    pub store: Arc<SessionStore>,
    pub files: Arc<FileProcessingStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub dispatcher: Arc<Dispatcher>,
    /// Hash de commit expuesto en `X-App-Version` y en `/api/health` (§6.1).
    pub app_version: String,
    pub build_time: String,
    /// Valor compartido que `X-Origin-Verify` debe igualar (§6.1). Vacío
    /// nunca autoriza un bypass — ver `auth::verify_origin`.
    pub origin_secret: String,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<SessionStore>,
        files: Arc<FileProcessingStore>,
        blobs: Arc<dyn BlobStore>,
        dispatcher: Arc<Dispatcher>,
        app_version: String,
        build_time: String,
        origin_secret: String,
    ) -> Self {
        Self { store, files, blobs, dispatcher, app_version, build_time, origin_secret }
    }
}
