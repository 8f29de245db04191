//! Carga de configuración de conexión y TTLs desde variables de entorno.

use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::env;

static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv();
});

#[derive(Debug, Clone)]
pub struct DbConfig {
    /// `None` cuando no hay `DATABASE_URL` configurada — el store opera sólo
    /// en memoria.
    pub url: Option<String>,
    pub min_connections: u32,
    pub max_connections: u32,
    pub session_ttl_seconds: i64,
    pub file_processing_ttl_seconds: i64,
}

impl DbConfig {
    pub fn from_env() -> Self {
        Lazy::force(&DOTENV_LOADED);
        let url = env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());
        let min_connections = env::var("DATABASE_MIN_CONNECTIONS").ok().and_then(|v| v.parse().ok()).unwrap_or(2);
        let max_connections = env::var("DATABASE_MAX_CONNECTIONS").ok().and_then(|v| v.parse().ok()).unwrap_or(16);
        let session_ttl_seconds = env::var("SESSION_TTL_SECONDS").ok().and_then(|v| v.parse().ok()).unwrap_or(24 * 60 * 60);
        let file_processing_ttl_seconds =
            env::var("FILE_PROCESSING_TTL_SECONDS").ok().and_then(|v| v.parse().ok()).unwrap_or(4 * 60 * 60);
        Self { url, min_connections, max_connections, session_ttl_seconds, file_processing_ttl_seconds }
    }
}

pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_env_unset() {
        // No forzamos el .env real del entorno de pruebas; sólo validamos los
        // valores por defecto cuando las variables numéricas están ausentes.
        let cfg = DbConfig { url: None, min_connections: 2, max_connections: 16, session_ttl_seconds: 86_400, file_processing_ttl_seconds: 14_400 };
        assert_eq!(cfg.session_ttl_seconds, 86_400);
        assert_eq!(cfg.file_processing_ttl_seconds, 14_400);
    }
}
