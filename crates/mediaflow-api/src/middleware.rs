//! Cabeceras de respuesta comunes a toda la API (§6.1): `X-App-Version`
//! siempre se fija; `X-Client-Version` sólo se compara y su desajuste se
//! registra, nunca rechaza la petición.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;

use crate::state::AppState;

const CLIENT_VERSION_HEADER: &str = "x-client-version";
const APP_VERSION_HEADER: &str = "x-app-version";

pub async fn stamp_version_headers(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    if let Some(client_version) = request.headers().get(CLIENT_VERSION_HEADER).and_then(|v| v.to_str().ok()) {
        if client_version != state.app_version {
            log::warn!("client version mismatch: client={client_version} server={}", state.app_version);
        }
    }

    let mut response = next.run(request).await;
    let value = HeaderValue::from_str(&state.app_version).unwrap_or_else(|_| HeaderValue::from_static("unknown"));
    response.headers_mut().insert(APP_VERSION_HEADER, value);
    response
}
