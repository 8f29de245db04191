//! Dominio compartido de la tubería de triage/publicación.
//!
//! - `error` expone la clasificación de errores (`ErrorClass`) común a todas
//!   las capas.
//! - `fingerprint` expone la canonicalización y huella de contenido usadas
//!   para la deduplicación en el File-Processing Store.
//! - `model` expone `Session`, `Step` y los siete `Job*` (union etiquetada
//!   `JobPayload`).

pub mod error;
pub mod fingerprint;
pub mod model;

pub use error::{CoreError, ErrorClass};
pub use model::job::{JobPayload, JobStatus};
pub use model::session::{Session, SessionStatus};
pub use model::step::{Step, STEP_ORDER};
