use mediaflow_core::ErrorClass;
use mediaflow_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("transport exhausted retries: {0}")]
    TransportExhausted(String),
}

impl DispatchError {
    pub fn classify(&self) -> ErrorClass {
        match self {
            DispatchError::Store(e) => e.classify(),
            DispatchError::TransportExhausted(_) => ErrorClass::Server,
        }
    }
}
