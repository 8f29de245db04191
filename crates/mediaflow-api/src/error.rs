//! Mapeo de errores de dominio a respuestas HTTP (§7). Todo error de
//! infraestructura se convierte antes de llegar aquí en un `ErrorClass`;
//! este módulo sólo traduce esa clasificación a un código de estado y un
//! cuerpo `{error}` de texto plano, nunca trazas internas.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use mediaflow_core::ErrorClass;
use mediaflow_dispatch::DispatchError;
use mediaflow_processors::ProcessorError;
use mediaflow_store::StoreError;
use serde_json::json;

#[derive(Debug)]
pub struct ApiError {
    pub class: ErrorClass,
    pub message: String,
}

impl ApiError {
    pub fn new(class: ErrorClass, message: impl Into<String>) -> Self {
        Self { class, message: message.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Validation, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::NotFound, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Auth, message)
    }
}

fn status_for(class: ErrorClass) -> StatusCode {
    match class {
        ErrorClass::Auth => StatusCode::FORBIDDEN,
        ErrorClass::Validation => StatusCode::BAD_REQUEST,
        ErrorClass::NotFound => StatusCode::NOT_FOUND,
        ErrorClass::RateLimit => StatusCode::TOO_MANY_REQUESTS,
        ErrorClass::Server | ErrorClass::Network | ErrorClass::Timeout | ErrorClass::File => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (status_for(self.class), Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let class = err.classify();
        let message = match &err {
            StoreError::OwnerMismatch => "forbidden".to_string(),
            StoreError::NotFound(_) => "not found".to_string(),
            StoreError::Validation(_) => err.to_string(),
            _ => "internal storage error, try again later".to_string(),
        };
        ApiError::new(class, message)
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        ApiError::new(err.classify(), "failed to dispatch job, try again later")
    }
}

impl From<ProcessorError> for ApiError {
    fn from(err: ProcessorError) -> Self {
        let class = err.classify();
        let message = err.user_message();
        ApiError::new(class, message)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        log::error!("serialization error building response: {err}");
        ApiError::new(ErrorClass::Server, "internal error, try again later")
    }
}
