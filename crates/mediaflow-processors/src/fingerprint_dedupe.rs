//! Camino de trabajo por archivo dentro de un procesador de fan-out (§4.2,
//! §4.5 "Per-file work"): consulta la huella, reutiliza el resultado si ya
//! existe, si no hace el trabajo y confirma huella + fila de resultado.

use std::future::Future;

use mediaflow_core::fingerprint;
use mediaflow_store::{FileProcessingStore, FileResultRow};

use crate::error::ProcessorError;

pub struct FileWork {
    pub processed_key: Option<String>,
    pub thumbnail_key: Option<String>,
    pub file_type: String,
    pub mime_type: String,
    pub converted: bool,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Calcula la huella de `bytes`, reutiliza el resultado cacheado si la huella
/// ya fue reclamada en este (session,job), o ejecuta `do_work` y escribe
/// fila de resultado + fila de huella (§4.2 "commit point").
#[allow(clippy::too_many_arguments)]
pub async fn process_with_fingerprint<F, Fut>(
    store: &FileProcessingStore,
    session_id: &str,
    job_id: &str,
    filename: &str,
    original_key: &str,
    bytes: &[u8],
    now: i64,
    do_work: F,
) -> Result<FileResultRow, ProcessorError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<FileWork, ProcessorError>>,
{
    let fingerprint = fingerprint::hash_bytes(bytes);
    if let Some(claimant) = store.get_fingerprint_mapping(session_id, job_id, &fingerprint).await? {
        let cached = store.get_result_row(session_id, job_id, &claimant).await?;
        let mut row = cached;
        row.filename = filename.to_string();
        row.original_key = original_key.to_string();
        store.put_result_row(session_id, job_id, &row, now).await?;
        return Ok(row);
    }

    let work = do_work().await?;
    let row = FileResultRow {
        filename: filename.to_string(),
        status: "complete".into(),
        original_key: original_key.to_string(),
        processed_key: work.processed_key,
        thumbnail_key: work.thumbnail_key,
        file_type: work.file_type,
        mime_type: work.mime_type,
        size: bytes.len() as u64,
        converted: work.converted,
        fingerprint,
        metadata: work.metadata,
        error: None,
    };
    store.commit_result(session_id, job_id, &row, now).await?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn second_identical_file_reuses_first_result_scenario_c() {
        let store = FileProcessingStore::new(4 * 60 * 60);
        let ai_calls = AtomicUsize::new(0);

        let same_bytes = b"identical content".to_vec();

        let first = process_with_fingerprint(&store, "s1", "enh-1", "a.jpg", "orig/a.jpg", &same_bytes, 0, || async {
            ai_calls.fetch_add(1, Ordering::SeqCst);
            Ok(FileWork {
                processed_key: Some("enhanced/a.jpg".into()),
                thumbnail_key: None,
                file_type: "image".into(),
                mime_type: "image/jpeg".into(),
                converted: false,
                metadata: Default::default(),
            })
        })
        .await
        .unwrap();

        let second = process_with_fingerprint(&store, "s1", "enh-1", "b.jpg", "orig/b.jpg", &same_bytes, 0, || async {
            ai_calls.fetch_add(1, Ordering::SeqCst);
            unreachable!("should not run work for a de-duplicated fingerprint");
        })
        .await
        .unwrap();

        assert_eq!(ai_calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.processed_key, second.processed_key);
        assert_eq!(store.get_file_results("s1", "enh-1").await.unwrap().len(), 2);
    }
}
