//! Errores de persistencia — mapea fallas del backend (en memoria o
//! PostgreSQL) a las variantes semánticas que el resto del core necesita
//! distinguir (§4.1 "Failure modes").

use mediaflow_core::ErrorClass;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("owner mismatch (IDOR)")]
    OwnerMismatch,
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("transient store error (retryable): {0}")]
    TransientIo(String),
    #[error("unknown store error: {0}")]
    Unknown(String),
}

impl StoreError {
    pub fn classify(&self) -> ErrorClass {
        match self {
            StoreError::NotFound(_) => ErrorClass::NotFound,
            StoreError::OwnerMismatch => ErrorClass::Auth,
            StoreError::Validation(_) => ErrorClass::Validation,
            StoreError::TransientIo(_) => ErrorClass::Server,
            StoreError::Unknown(_) => ErrorClass::Server,
        }
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("row not found".into()),
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => StoreError::TransientIo(err.to_string()),
            other => StoreError::Unknown(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Unknown(format!("(de)serialization: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_classifies_as_not_found() {
        assert_eq!(StoreError::NotFound("x".into()).classify(), ErrorClass::NotFound);
    }

    #[test]
    fn owner_mismatch_classifies_as_auth() {
        assert_eq!(StoreError::OwnerMismatch.classify(), ErrorClass::Auth);
    }

    #[test]
    fn transient_io_is_retryable_class() {
        assert!(StoreError::TransientIo("timeout".into()).classify().is_retryable());
    }
}
