//! Error de procesador. Se distingue la falla de infraestructura (el
//! `JobRunner` debe devolver `Err` para que el transporte reintente la
//! invocación, §7 "logs and exits with a non-nil error") de la falla de
//! dominio, que se resuelve escribiendo `status=error` en el descriptor y
//! devolviendo `Ok(())`.

use mediaflow_core::ErrorClass;
use mediaflow_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("provider error: {0}")]
    Provider(String),
    #[error("unknown event type: {0}")]
    UnknownEventType(String),
}

impl ProcessorError {
    pub fn classify(&self) -> ErrorClass {
        match self {
            ProcessorError::Store(e) => e.classify(),
            ProcessorError::Provider(_) => ErrorClass::Server,
            ProcessorError::UnknownEventType(_) => ErrorClass::Validation,
        }
    }

    /// Mensaje plano, seguro para el descriptor (§4.3, §7: nunca traza ni
    /// credenciales). Usado cuando el error no tiene ya un mensaje de
    /// usuario preparado por el llamador.
    pub fn user_message(&self) -> String {
        match self {
            ProcessorError::Store(_) => "internal storage error, try again later".into(),
            ProcessorError::Provider(msg) => msg.clone(),
            ProcessorError::UnknownEventType(kind) => format!("unknown event type: {kind}"),
        }
    }
}
