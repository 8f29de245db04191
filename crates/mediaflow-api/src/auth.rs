//! Autenticación y verificación de origen (§6.1).
//!
//! - `verify_origin` es una capa de middleware: `X-Origin-Verify` debe
//!   igualar el secreto compartido configurado en `AppState`; ausente o
//!   distinto => 403 genérico, incluso si el secreto configurado está
//!   vacío (un secreto vacío nunca autoriza un bypass).
//! - `Principal` es un extractor que lee `Authorization: Bearer <subject>`.
//!   OAuth con terceros está fuera de alcance (§1); el token se trata como
//!   el identificador estable y opaco del principal autenticado.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::state::AppState;

const ORIGIN_HEADER: &str = "x-origin-verify";

pub async fn verify_origin(State(state): State<Arc<AppState>>, headers: HeaderMap, request: Request, next: Next) -> Response {
    let provided = headers.get(ORIGIN_HEADER).and_then(|v| v.to_str().ok());
    match provided {
        Some(value) if !state.origin_secret.is_empty() && value == state.origin_secret => next.run(request).await,
        _ => (StatusCode::FORBIDDEN, Json(json!({ "error": "forbidden" }))).into_response(),
    }
}

#[derive(Debug, Clone)]
pub struct Principal(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(unauthorized)?;
        let subject = header.strip_prefix("Bearer ").ok_or_else(unauthorized)?.trim();
        if subject.is_empty() {
            return Err(unauthorized());
        }
        Ok(Principal(subject.to_string()))
    }
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": "missing or invalid bearer token" }))).into_response()
}
