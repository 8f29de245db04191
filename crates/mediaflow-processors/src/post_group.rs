//! Grouping (§3.3 `GROUP#`, §8.3 boundary: 20 ítems permitidos, 21
//! rechazado). A diferencia de los demás kinds, crear un post group no
//! implica trabajo de IA ni de red — es una escritura síncrona de metadata,
//! por lo que no aparece en la tabla de selección de transporte de §4.4 y no
//! pasa por el `Dispatcher`/`JobRunner`. Este módulo aporta sólo la
//! validación de entrada; la escritura la hace el llamador directamente
//! contra `SessionStore::put_post_group`.

use mediaflow_core::model::job::{PostGroupJob, MAX_POST_GROUP_ITEMS};

use crate::error::ProcessorError;

/// Valida y construye un `PostGroupJob` recién creado. Rechaza grupos vacíos
/// o con más de `MAX_POST_GROUP_ITEMS` ítems (§8.3).
pub fn build_post_group(id: String, name: String, media_keys: Vec<String>) -> Result<PostGroupJob, ProcessorError> {
    if media_keys.is_empty() {
        return Err(ProcessorError::Provider("post group must contain at least one media item".into()));
    }
    if media_keys.len() > MAX_POST_GROUP_ITEMS {
        return Err(ProcessorError::Provider(format!("post group exceeds the {MAX_POST_GROUP_ITEMS}-item limit")));
    }
    let mut job = PostGroupJob::pending(id, name, media_keys);
    job.status = mediaflow_core::JobStatus::Complete;
    Ok(job)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twenty_items_allowed() {
        let keys = (0..20).map(|i| format!("img{i}.jpg")).collect();
        assert!(build_post_group("g-1".into(), "trip".into(), keys).is_ok());
    }

    #[test]
    fn twenty_one_items_rejected() {
        let keys = (0..21).map(|i| format!("img{i}.jpg")).collect();
        assert!(build_post_group("g-1".into(), "trip".into(), keys).is_err());
    }

    #[test]
    fn empty_media_keys_rejected() {
        assert!(build_post_group("g-1".into(), "trip".into(), vec![]).is_err());
    }
}
