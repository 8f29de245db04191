//! Dispatcher (C4) y los dos transportes que el §4.4 describe.

pub mod dispatcher;
pub mod error;
pub mod transport;

pub use dispatcher::{DispatchKind, Dispatcher};
pub use error::DispatchError;
pub use transport::{AsyncProcessorTransport, JobRunner, Transport, WorkflowEngineTransport};
