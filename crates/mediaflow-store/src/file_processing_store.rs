//! Auxiliary File-Processing Table (C2, §3.4, §4.2): partición
//! `{sessionId}#{jobId}`, con filas de resultado (sort-key = filename) y
//! filas de huella (sort-key = `fp#{fingerprint}`) para deduplicación.

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileResultRow {
    pub filename: String,
    pub status: String,
    pub original_key: String,
    pub processed_key: Option<String>,
    pub thumbnail_key: Option<String>,
    pub file_type: String,
    pub mime_type: String,
    pub size: u64,
    pub converted: bool,
    pub fingerprint: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
struct StoredRow {
    payload: serde_json::Value,
    expires_at: i64,
}

type Partition = DashMap<String, StoredRow>;

const FINGERPRINT_PREFIX: &str = "fp#";

pub struct FileProcessingStore {
    in_memory: Arc<DashMap<String, Partition>>,
    #[cfg(feature = "postgres")]
    pool: Option<sqlx::Pool<sqlx::Postgres>>,
    ttl_seconds: i64,
}

impl FileProcessingStore {
    pub fn new(ttl_seconds: i64) -> Self {
        Self {
            in_memory: Arc::new(DashMap::new()),
            #[cfg(feature = "postgres")]
            pool: None,
            ttl_seconds,
        }
    }

    #[cfg(feature = "postgres")]
    pub async fn with_pool(pool: sqlx::Pool<sqlx::Postgres>, ttl_seconds: i64) -> Result<Self, StoreError> {
        let store = Self { in_memory: Arc::new(DashMap::new()), pool: Some(pool), ttl_seconds };
        store.ensure_schema().await?;
        Ok(store)
    }

    #[cfg(feature = "postgres")]
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        let Some(pool) = &self.pool else { return Ok(()) };
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS mediaflow_file_processing_rows ( \
                partition_key TEXT NOT NULL, \
                sort_key TEXT NOT NULL, \
                payload JSONB NOT NULL, \
                expires_at BIGINT NOT NULL, \
                PRIMARY KEY (partition_key, sort_key) \
             )",
        )
        .execute(pool)
        .await?;
        Ok(())
    }

    async fn put_row(&self, partition_key: &str, sort_key: &str, payload: serde_json::Value, expires_at: i64) -> Result<(), StoreError> {
        #[cfg(feature = "postgres")]
        if let Some(pool) = &self.pool {
            sqlx::query(
                "INSERT INTO mediaflow_file_processing_rows (partition_key, sort_key, payload, expires_at) VALUES ($1,$2,$3,$4) \
                 ON CONFLICT (partition_key, sort_key) DO UPDATE SET payload = EXCLUDED.payload, expires_at = EXCLUDED.expires_at",
            )
            .bind(partition_key)
            .bind(sort_key)
            .bind(&payload)
            .bind(expires_at)
            .execute(pool)
            .await?;
        }
        let partition = self.in_memory.entry(partition_key.to_string()).or_default();
        partition.insert(sort_key.to_string(), StoredRow { payload, expires_at });
        Ok(())
    }

    async fn get_row(&self, partition_key: &str, sort_key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        #[cfg(feature = "postgres")]
        if let Some(pool) = &self.pool {
            let row: Option<(serde_json::Value,)> =
                sqlx::query_as("SELECT payload FROM mediaflow_file_processing_rows WHERE partition_key = $1 AND sort_key = $2")
                    .bind(partition_key)
                    .bind(sort_key)
                    .fetch_optional(pool)
                    .await?;
            return Ok(row.map(|(p,)| p));
        }
        Ok(self.in_memory.get(partition_key).and_then(|p| p.get(sort_key).map(|r| r.payload.clone())))
    }

    fn partition_key(session_id: &str, job_id: &str) -> String {
        format!("{session_id}#{job_id}")
    }

    /// `GetFingerprintMapping` (§4.2): si existe, devuelve el filename que ya
    /// reclamó la huella.
    pub async fn get_fingerprint_mapping(&self, session_id: &str, job_id: &str, fingerprint: &str) -> Result<Option<String>, StoreError> {
        let sort_key = format!("{FINGERPRINT_PREFIX}{fingerprint}");
        let payload = self.get_row(&Self::partition_key(session_id, job_id), &sort_key).await?;
        Ok(payload.map(|v| v["filename"].as_str().unwrap_or_default().to_string()))
    }

    pub async fn put_result_row(&self, session_id: &str, job_id: &str, row: &FileResultRow, now: i64) -> Result<(), StoreError> {
        let expires_at = now + self.ttl_seconds;
        let payload = serde_json::to_value(row)?;
        self.put_row(&Self::partition_key(session_id, job_id), &row.filename, payload, expires_at).await
    }

    pub async fn get_result_row(&self, session_id: &str, job_id: &str, filename: &str) -> Result<FileResultRow, StoreError> {
        let payload = self
            .get_row(&Self::partition_key(session_id, job_id), filename)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("file result {filename} in {session_id}#{job_id}")))?;
        Ok(serde_json::from_value(payload)?)
    }

    /// Escribe la fila de resultado y luego la fila de huella: el punto de
    /// compromiso es la escritura de la fila de huella (§4.2) — si el
    /// proceso se interrumpe entre ambas, el trabajo simplemente se repite en
    /// el reintento y la fila de resultado se sobrescribe (idempotente).
    pub async fn commit_result(&self, session_id: &str, job_id: &str, row: &FileResultRow, now: i64) -> Result<(), StoreError> {
        self.put_result_row(session_id, job_id, row, now).await?;
        let fp_sort_key = format!("{FINGERPRINT_PREFIX}{}", row.fingerprint);
        let fp_payload = serde_json::json!({ "filename": row.filename });
        self.put_row(&Self::partition_key(session_id, job_id), &fp_sort_key, fp_payload, now + self.ttl_seconds).await
    }

    /// `GetFileResults` (§4.2): pagina las filas de resultado, excluyendo las
    /// filas de índice `fp#…`.
    pub async fn get_file_results(&self, session_id: &str, job_id: &str) -> Result<Vec<FileResultRow>, StoreError> {
        let partition_key = Self::partition_key(session_id, job_id);
        let Some(partition) = self.in_memory.get(&partition_key) else { return Ok(Vec::new()) };
        let mut rows = Vec::new();
        for entry in partition.iter() {
            if entry.key().starts_with(FINGERPRINT_PREFIX) {
                continue;
            }
            rows.push(serde_json::from_value(entry.value().payload.clone())?);
        }
        Ok(rows)
    }

    /// `GetFileResultCount` (§4.2): recuento barato, sin deserializar cada fila.
    pub async fn get_file_result_count(&self, session_id: &str, job_id: &str) -> Result<usize, StoreError> {
        let partition_key = Self::partition_key(session_id, job_id);
        Ok(self
            .in_memory
            .get(&partition_key)
            .map(|p| p.iter().filter(|e| !e.key().starts_with(FINGERPRINT_PREFIX)).count())
            .unwrap_or(0))
    }

    /// Barre toda fila cuyo `expires_at` ya pasó; usado por la tarea de TTL
    /// en segundo plano.
    pub fn sweep_expired(&self, now: i64) -> usize {
        let mut swept = 0;
        self.in_memory.retain(|_partition_key, partition| {
            partition.retain(|_sort_key, row| {
                let keep = row.expires_at > now;
                if !keep {
                    swept += 1;
                }
                keep
            });
            !partition.is_empty()
        });
        swept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row(filename: &str, fingerprint: &str) -> FileResultRow {
        FileResultRow {
            filename: filename.into(),
            status: "complete".into(),
            original_key: format!("orig/{filename}"),
            processed_key: Some(format!("enhanced/{filename}")),
            thumbnail_key: None,
            file_type: "image".into(),
            mime_type: "image/jpeg".into(),
            size: 1024,
            converted: false,
            fingerprint: fingerprint.into(),
            metadata: Default::default(),
            error: None,
        }
    }

    #[tokio::test]
    async fn fingerprint_dedup_scenario_c() {
        // Escenario C: dos archivos, mismo contenido (misma huella f9).
        let store = FileProcessingStore::new(4 * 60 * 60);
        assert!(store.get_fingerprint_mapping("s1", "j1", "f9").await.unwrap().is_none());

        let first = sample_row("a.jpg", "f9");
        store.commit_result("s1", "j1", &first, 0).await.unwrap();

        let claimed = store.get_fingerprint_mapping("s1", "j1", "f9").await.unwrap();
        assert_eq!(claimed, Some("a.jpg".into()));

        // El segundo archivo reutiliza el resultado del primero.
        let cached = store.get_result_row("s1", "j1", &claimed.unwrap()).await.unwrap();
        assert_eq!(cached.processed_key, Some("enhanced/a.jpg".into()));

        let mut second = sample_row("b.jpg", "f9");
        second.processed_key = cached.processed_key.clone();
        store.put_result_row("s1", "j1", &second, 0).await.unwrap();

        let results = store.get_file_results("s1", "j1").await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(store.get_file_result_count("s1", "j1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn result_rows_are_distinguished_from_fingerprint_rows() {
        let store = FileProcessingStore::new(4 * 60 * 60);
        store.commit_result("s1", "j1", &sample_row("a.jpg", "f1"), 0).await.unwrap();
        store.commit_result("s1", "j1", &sample_row("b.jpg", "f2"), 0).await.unwrap();
        let results = store.get_file_results("s1", "j1").await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| !r.filename.starts_with("fp#")));
    }

    #[tokio::test]
    async fn ttl_expiry_window_is_four_hours() {
        let store = FileProcessingStore::new(4 * 60 * 60);
        store.put_result_row("s1", "j1", &sample_row("a.jpg", "f1"), 0).await.unwrap();
        assert_eq!(store.sweep_expired(4 * 60 * 60 - 1), 0);
        assert_eq!(store.sweep_expired(4 * 60 * 60 + 1), 1);
    }
}
