//! Persistencia de la tubería: Session Store (C1) y File-Processing Store
//! (C2), cada uno en memoria (`dashmap`) por defecto y respaldado por
//! PostgreSQL (`sqlx`) cuando el feature `postgres` está activo y se
//! construye con un pool.

pub mod config;
pub mod error;
pub mod file_processing_store;
pub mod session_store;
pub mod ttl_sweep;

pub use config::DbConfig;
pub use error::StoreError;
pub use file_processing_store::{FileProcessingStore, FileResultRow};
pub use session_store::SessionStore;
