//! Tarea de mantenimiento en segundo plano: la fila en memoria no tiene TTL
//! nativo, así que un barrido periódico aplica el `expiresAt` (§4.1, §3.4) en
//! vez de depender únicamente del filtrado en cada lectura.
//!
//! El backend Postgres, por el contrario, conserva filas vencidas hasta el
//! próximo barrido — igual que el core describe ("readers MUST tolerate a
//! lag window").

use std::sync::Arc;
use std::time::Duration;

use crate::file_processing_store::FileProcessingStore;
use crate::session_store::SessionStore;

pub fn spawn_file_processing_sweep(store: Arc<FileProcessingStore>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let now = now_unix();
            let swept = store.sweep_expired(now);
            if swept > 0 {
                log::info!("ttl sweep removed {swept} expired file-processing rows");
            }
        }
    })
}

/// Barrido periódico del Session Store en memoria. Su TTL (24h) es mayor que
/// la ventana de rezago aceptable (§4.1 "readers MUST tolerate a lag
/// window"), así que un intervalo del orden de minutos es suficiente.
pub fn spawn_session_sweep(store: Arc<SessionStore>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let now = now_unix();
            let swept = store.sweep_expired(now);
            if swept > 0 {
                log::info!("ttl sweep removed {swept} expired session rows");
            }
        }
    })
}

fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}
