//! Capa HTTP (C6, §6.1): axum + tower-http sobre el `Dispatcher` y los
//! stores. El binario (`src/main.rs` del workspace) construye un `AppState`
//! y llama a `build_router`; este crate no conoce `tokio::net`/`axum::serve`.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::build_router;
pub use state::AppState;
