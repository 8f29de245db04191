//! Política de reintento de §7: backoff exponencial acotado (inicial 1s,
//! multiplicador 2, tope 30s, máximo 3 intentos, jitter ±10%). Vive dentro
//! del procesador, no en el transporte — un reintento de job completo
//! volvería a cobrar llamadas de IA ya hechas (§9).

use std::time::Duration;

use rand::Rng;

use crate::error::ProcessorError;

const INITIAL_DELAY_MS: u64 = 1_000;
const MULTIPLIER: u64 = 2;
const CAP_MS: u64 = 30_000;
const MAX_ATTEMPTS: u32 = 3;

fn jittered(delay_ms: u64) -> Duration {
    let jitter_ratio = rand::thread_rng().gen_range(-0.10..=0.10);
    let jittered_ms = (delay_ms as f64 * (1.0 + jitter_ratio)).max(0.0) as u64;
    Duration::from_millis(jittered_ms)
}

/// Reintenta `op` hasta `MAX_ATTEMPTS` veces mientras el error sea
/// reintentable (`rate_limit`, `server`, `network`, `timeout`); cualquier
/// otra clase de error se propaga de inmediato.
pub async fn retry_with_backoff<T, F, Fut>(mut op: F) -> Result<T, ProcessorError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, ProcessorError>>,
{
    let mut attempt = 0;
    let mut delay_ms = INITIAL_DELAY_MS;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < MAX_ATTEMPTS && e.classify().is_retryable() => {
                log::warn!("retrying after attempt {attempt} failed: {e}");
                tokio::time::sleep(jittered(delay_ms)).await;
                delay_ms = (delay_ms * MULTIPLIER).min(CAP_MS);
            }
            Err(e) => return Err(e),
        }
    }
}
