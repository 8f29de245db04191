//! Session Store (C1, §4.1): una fila de metadata (`META`) más una fila por
//! job, todas en la partición `SESSION#{sessionId}`. Siempre en memoria
//! (`dashmap`, rápido para tests y para desplegar sin base de datos); si se
//! construye con un pool se persiste también en PostgreSQL.

use std::sync::Arc;

use dashmap::DashMap;
use mediaflow_core::model::job::{
    DescriptionJob, DownloadJob, EnhancementJob, JobPayload, JobStatus, PostGroupJob, PublishJob, SelectionJob, TriageJob,
};
use mediaflow_core::model::step::{Step, META_SORT_KEY};
use mediaflow_core::{Session, SessionStatus};
use serde::de::DeserializeOwned;

use crate::error::StoreError;

/// Máximo de ítems por lote de borrado, igual al límite típico del
/// proveedor subyacente citado en §4.7.
#[cfg(feature = "postgres")]
const DELETE_BATCH_SIZE: usize = 25;

#[derive(Debug, Clone)]
struct StoredRow {
    payload: serde_json::Value,
    expires_at: i64,
}

type Partition = DashMap<String, StoredRow>;

/// Genera el par `put_<kind>_job`/`get_<kind>_job` exigido por el contrato de
/// §4.1 para un kind de job concreto, delegando en `put_job_row`/`get_job_row`.
macro_rules! kind_accessors {
    ($put:ident, $get:ident, $variant:ident, $ty:ty, $prefix:expr) => {
        pub async fn $put(&self, session_id: &str, job: &$ty, now: i64) -> Result<(), StoreError> {
            let sort_key = format!("{}{}", $prefix, job.id);
            self.put_job_row(session_id, &sort_key, &JobPayload::$variant(job.clone()), now).await
        }

        pub async fn $get(&self, session_id: &str, job_id: &str) -> Result<$ty, StoreError> {
            let sort_key = format!("{}{}", $prefix, job_id);
            self.get_job_row(session_id, &sort_key).await
        }
    };
}

pub struct SessionStore {
    in_memory: Arc<DashMap<String, Partition>>,
    #[cfg(feature = "postgres")]
    pool: Option<sqlx::Pool<sqlx::Postgres>>,
    ttl_seconds: i64,
}

impl SessionStore {
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
            "CREATE TABLE IF NOT EXISTS mediaflow_session_rows ( \
                partition_key TEXT NOT NULL, \
                sort_key TEXT NOT NULL, \
                payload JSONB NOT NULL, \
                expires_at BIGINT NOT NULL, \
                PRIMARY KEY (partition_key, sort_key) \
             )",
        )
        .execute(pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_mediaflow_session_rows_expires ON mediaflow_session_rows(expires_at)")
            .execute(pool)
            .await?;
        Ok(())
    }

    // -- lectura/escritura de fila cruda, con ramal en memoria / Postgres -----

    async fn put_row(&self, partition_key: &str, sort_key: &str, payload: serde_json::Value, expires_at: i64) -> Result<(), StoreError> {
        #[cfg(feature = "postgres")]
        if let Some(pool) = &self.pool {
            sqlx::query(
                "INSERT INTO mediaflow_session_rows (partition_key, sort_key, payload, expires_at) VALUES ($1,$2,$3,$4) \
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
                sqlx::query_as("SELECT payload FROM mediaflow_session_rows WHERE partition_key = $1 AND sort_key = $2")
                    .bind(partition_key)
                    .bind(sort_key)
                    .fetch_optional(pool)
                    .await?;
            return Ok(row.map(|(payload,)| payload));
        }
        Ok(self
            .in_memory
            .get(partition_key)
            .and_then(|partition| partition.get(sort_key).map(|row| row.payload.clone())))
    }

    /// Todas las filas de la partición cuyo sort-key empieza por alguno de
    /// `prefixes`, usado por la cascada de invalidación (§4.7) y por
    /// `get_post_groups`.
    async fn scan_prefixes(&self, partition_key: &str, prefixes: &[&str]) -> Result<Vec<String>, StoreError> {
        #[cfg(feature = "postgres")]
        if let Some(pool) = &self.pool {
            let rows: Vec<(String,)> = sqlx::query_as("SELECT sort_key FROM mediaflow_session_rows WHERE partition_key = $1")
                .bind(partition_key)
                .fetch_all(pool)
                .await?;
            return Ok(rows
                .into_iter()
                .map(|(k,)| k)
                .filter(|k| prefixes.iter().any(|p| k.starts_with(p)))
                .collect());
        }
        Ok(self
            .in_memory
            .get(partition_key)
            .map(|partition| {
                partition
                    .iter()
                    .map(|entry| entry.key().clone())
                    .filter(|k| prefixes.iter().any(|p| k.starts_with(p)))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete_rows(&self, partition_key: &str, sort_keys: &[String]) -> Result<(), StoreError> {
        #[cfg(feature = "postgres")]
        if let Some(pool) = &self.pool {
            for chunk in sort_keys.chunks(DELETE_BATCH_SIZE) {
                sqlx::query("DELETE FROM mediaflow_session_rows WHERE partition_key = $1 AND sort_key = ANY($2)")
                    .bind(partition_key)
                    .bind(chunk)
                    .execute(pool)
                    .await?;
            }
        }
        if let Some(partition) = self.in_memory.get(partition_key) {
            for key in sort_keys {
                partition.remove(key);
            }
        }
        Ok(())
    }

    async fn delete_row(&self, partition_key: &str, sort_key: &str) -> Result<(), StoreError> {
        self.delete_rows(partition_key, std::slice::from_ref(&sort_key.to_string())).await
    }

    // -- Session metadata (fila META, §3.1, §4.1) -----------------------------

    pub async fn put_session(&self, session: &Session, now: i64) -> Result<(), StoreError> {
        let mut session = session.clone();
        session.expires_at = session.created_at + self.ttl_seconds;
        let payload = serde_json::to_value(&session)?;
        self.put_row(&partition_key(&session.id), META_SORT_KEY, payload, session.expires_at).await?;
        let _ = now;
        Ok(())
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Session, StoreError> {
        let payload = self
            .get_row(&partition_key(session_id), META_SORT_KEY)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("session {session_id}")))?;
        Ok(serde_json::from_value(payload)?)
    }

    /// Lectura con verificación de propiedad (invariante 1, §8.1): cualquier
    /// lectura cuyo `ownerSubject` no coincida falla como IDOR, nunca como
    /// un `not_found` silencioso.
    pub async fn get_session_for_owner(&self, session_id: &str, owner_subject: &str) -> Result<Session, StoreError> {
        let session = self.get_session(session_id).await?;
        if session.owner_subject != owner_subject {
            return Err(StoreError::OwnerMismatch);
        }
        Ok(session)
    }

    /// Actualización atómica de un solo atributo sobre la fila META, sin
    /// sobrescribir el resto (§4.1 "Status-field update").
    pub async fn update_session_status(&self, session_id: &str, status: SessionStatus) -> Result<(), StoreError> {
        let mut session = self.get_session(session_id).await?;
        session.status = status;
        let payload = serde_json::to_value(&session)?;
        self.put_row(&partition_key(session_id), META_SORT_KEY, payload, session.expires_at).await
    }

    // -- Job descriptors genéricos (C3, §3.2, §4.3) ---------------------------

    /// Escritura full-row (upsert). Respeta el invariante de estado terminal:
    /// si la fila existente ya es `complete`/`error`, una escritura que
    /// retrocedería a `pending`/`processing` se descarta silenciosamente (el
    /// procesador no debería intentarlo, pero el store no confía en eso).
    /// Escritura genérica de una `JobPayload` en su propio sort-key, usada
    /// por el dispatcher al escribir el descriptor `pending` antes del
    /// despacho (§4.4), sin que el llamador necesite conocer el wrapper
    /// específico de su kind.
    pub async fn put_job_payload(&self, session_id: &str, payload: &JobPayload, now: i64) -> Result<(), StoreError> {
        let sort_key = format!("{}{}", payload.sort_key_prefix(), payload.id());
        self.put_job_row(session_id, &sort_key, payload, now).await
    }

    async fn put_job_row(&self, session_id: &str, sort_key: &str, payload: &JobPayload, now: i64) -> Result<(), StoreError> {
        if let Some(existing) = self.get_row(&partition_key(session_id), sort_key).await? {
            if let Ok(Some(existing_status)) =
                existing.get("status").map(|s| serde_json::from_value::<JobStatus>(s.clone())).transpose()
            {
                if existing_status.is_terminal() && !payload.status().is_terminal() {
                    log::warn!("refusing to overwrite terminal job {sort_key} in session {session_id} with non-terminal state");
                    return Ok(());
                }
            }
        }
        let expires_at = now + self.ttl_seconds;
        let value = serde_json::to_value(payload)?;
        self.put_row(&partition_key(session_id), sort_key, value, expires_at).await
    }

    async fn get_job_row<T: DeserializeOwned>(&self, session_id: &str, sort_key: &str) -> Result<T, StoreError> {
        let payload = self
            .get_row(&partition_key(session_id), sort_key)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("job {sort_key} in session {session_id}")))?;
        Ok(serde_json::from_value(payload)?)
    }

    kind_accessors!(put_triage_job, get_triage_job, Triage, TriageJob, "TRIAGE#");
    kind_accessors!(put_selection_job, get_selection_job, Selection, SelectionJob, "SELECTION#");
    kind_accessors!(put_enhancement_job, get_enhancement_job, Enhancement, EnhancementJob, "ENHANCE#");
    kind_accessors!(put_download_job, get_download_job, Download, DownloadJob, "DOWNLOAD#");
    kind_accessors!(put_description_job, get_description_job, Description, DescriptionJob, "DESC#");
    kind_accessors!(put_publish_job, get_publish_job, Publish, PublishJob, "PUBLISH#");

    pub async fn put_post_group(&self, session_id: &str, job: &PostGroupJob, now: i64) -> Result<(), StoreError> {
        let sort_key = format!("GROUP#{}", job.id);
        self.put_job_row(session_id, &sort_key, &JobPayload::PostGroup(job.clone()), now).await
    }

    pub async fn get_post_groups(&self, session_id: &str) -> Result<Vec<PostGroupJob>, StoreError> {
        let keys = self.scan_prefixes(&partition_key(session_id), &[Step::Grouping.sort_key_prefix()]).await?;
        let mut groups = Vec::with_capacity(keys.len());
        for key in keys {
            groups.push(self.get_job_row::<PostGroupJob>(session_id, &key).await?);
        }
        Ok(groups)
    }

    pub async fn delete_post_group(&self, session_id: &str, group_id: &str) -> Result<(), StoreError> {
        let sort_key = format!("GROUP#{group_id}");
        self.delete_row(&partition_key(session_id), &sort_key).await
    }

    // -- Step Invalidation Engine (C7, §4.7) ----------------------------------

    /// Borra toda fila cuyo step sea `from_step` o posterior; preserva META.
    /// Devuelve los sort-keys efectivamente borrados.
    pub async fn invalidate_downstream(&self, session_id: &str, from_step: Step) -> Result<Vec<String>, StoreError> {
        let prefixes = from_step.downstream_prefixes();
        let keys = self.scan_prefixes(&partition_key(session_id), &prefixes).await?;
        self.delete_rows(&partition_key(session_id), &keys).await?;
        Ok(keys)
    }

    /// Barrido de TTL en memoria (§8.4 Escenario F); el backend Postgres
    /// conserva filas vencidas hasta el próximo barrido (ventana de rezago).
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

fn partition_key(session_id: &str) -> String {
    format!("SESSION#{session_id}")
}
