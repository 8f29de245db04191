//! Configuración del servidor HTTP. Los parámetros de persistencia
//! (`DATABASE_URL`, TTLs) ya los carga `mediaflow_store::DbConfig`; este
//! módulo sólo cubre lo propio de la capa de transporte: puerto de escucha,
//! secreto de `X-Origin-Verify`, los topes de concurrencia por kind (§6.2) y
//! la identificación de build expuesta en `/api/health`.

use once_cell::sync::Lazy;
use std::env;

pub struct ServerConfig {
    pub port: u16,
    pub origin_secret: String,
    pub app_version: String,
    pub build_time: String,
    /// Tope de concurrencia del transporte workflow-engine (triage,
    /// selection, enhancement start, publish).
    pub workflow_concurrency: usize,
    /// Tope de concurrencia del transporte async-processor (description,
    /// download, enhancement feedback).
    pub async_concurrency: usize,
}

pub static CONFIG: Lazy<ServerConfig> = Lazy::new(|| {
    mediaflow_store::config::init_dotenv();
    ServerConfig {
        port: env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(8080),
        origin_secret: env::var("ORIGIN_VERIFY_SECRET").unwrap_or_default(),
        app_version: env::var("APP_VERSION").unwrap_or_else(|_| "dev".to_string()),
        build_time: env::var("BUILD_TIME").unwrap_or_else(|_| "unknown".to_string()),
        workflow_concurrency: env::var("WORKFLOW_CONCURRENCY").ok().and_then(|v| v.parse().ok()).unwrap_or(20),
        async_concurrency: env::var("ASYNC_CONCURRENCY").ok().and_then(|v| v.parse().ok()).unwrap_or(10),
    }
});
