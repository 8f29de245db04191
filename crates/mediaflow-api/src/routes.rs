//! Construcción del router (§6.1). Orden de middleware: `X-Origin-Verify`
//! (capa más interna, aplicada sólo a las rutas autenticadas) → cabeceras de
//! versión (capa externa, aplicada a todas las rutas incl. `/api/health`) →
//! traza de tower-http.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::{auth, handlers, middleware as mw};
use crate::state::AppState;

fn protected_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/sessions", post(handlers::create_session))
        .route("/api/sessions/:id/invalidate", post(handlers::invalidate))
        .route("/api/group", post(handlers::create_group))
        .route("/api/triage/start", post(handlers::start_triage))
        .route("/api/selection/start", post(handlers::start_selection))
        .route("/api/enhancement/start", post(handlers::start_enhancement))
        .route("/api/download/start", post(handlers::start_download))
        .route("/api/description/start", post(handlers::start_description))
        .route("/api/publish/start", post(handlers::start_publish))
        .route("/api/:kind/:id/results", get(handlers::results))
        .route("/api/description/:id/feedback", post(handlers::description_feedback))
        .route("/api/enhancement/:id/feedback", post(handlers::enhancement_feedback))
        .route("/api/triage/:id/confirm", post(handlers::confirm_triage))
        .route_layer(axum::middleware::from_fn_with_state(state, auth::verify_origin))
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .merge(protected_routes(state.clone()))
        .layer(axum::middleware::from_fn_with_state(state.clone(), mw::stamp_version_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
