//! Error de dominio para el core de orquestación.
//! Toda falla se clasifica en una `ErrorClass` (ver §7 del diseño) para que
//! las capas superiores (API, procesadores) puedan mapear a política de
//! reintento y código HTTP sin inspeccionar el mensaje.

use thiserror::Error;

/// Clasificación de error, en el orden de política de recuperación.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Auth,
    Validation,
    NotFound,
    RateLimit,
    Server,
    Network,
    Timeout,
    File,
}

impl ErrorClass {
    /// Clases que ameritan reintento con backoff (ver `ErrorClass::retry_policy`).
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorClass::RateLimit | ErrorClass::Server | ErrorClass::Network | ErrorClass::Timeout)
    }
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn classify(&self) -> ErrorClass {
        match self {
            CoreError::Validation(_) => ErrorClass::Validation,
            CoreError::NotFound(_) => ErrorClass::NotFound,
            CoreError::Internal(_) => ErrorClass::Server,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_variant_format() {
        let err = CoreError::Validation("missing field".into());
        assert_eq!(err.to_string(), "validation failed: missing field");
        assert_eq!(err.classify(), ErrorClass::Validation);
    }

    #[test]
    fn not_found_classifies() {
        let err = CoreError::NotFound("session s1".into());
        assert_eq!(err.classify(), ErrorClass::NotFound);
    }

    #[test]
    fn retryable_classes() {
        assert!(ErrorClass::RateLimit.is_retryable());
        assert!(ErrorClass::Server.is_retryable());
        assert!(ErrorClass::Network.is_retryable());
        assert!(ErrorClass::Timeout.is_retryable());
        assert!(!ErrorClass::Auth.is_retryable());
        assert!(!ErrorClass::Validation.is_retryable());
        assert!(!ErrorClass::NotFound.is_retryable());
        assert!(!ErrorClass::File.is_retryable());
    }
}
