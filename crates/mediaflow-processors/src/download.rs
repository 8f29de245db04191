//! Procesador de descarga (§4.5 "Bundle-size planner", §8.4 Escenario E):
//! empaqueta imágenes y videos en bundles separados usando first-fit-
//! decreasing, acotados por un límite de tamaño por bundle.

use std::sync::Arc;

use async_trait::async_trait;
use mediaflow_core::model::job::{Bundle, BundleStatus, BundleType, JobPayload, JobStatus};
use mediaflow_dispatch::{DispatchError, JobRunner};
use mediaflow_store::SessionStore;

use crate::providers::BlobStore;

/// Límite de artefacto por bundle de video (§4.5: "e.g., 375 MiB").
pub const BUNDLE_SIZE_LIMIT_BYTES: u64 = 375 * 1024 * 1024;

fn is_video(filename: &str) -> bool {
    let lower = filename.to_ascii_lowercase();
    [".mp4", ".mov", ".m4v", ".webm"].iter().any(|ext| lower.ends_with(ext))
}

struct PackedBundle {
    files: Vec<(String, u64)>,
    total: u64,
}

/// First-fit-decreasing (§9: "the specified algorithm; do not substitute
/// best-fit"): ordena descendentemente por tamaño, coloca cada ítem en el
/// primer bundle abierto donde quepa, si no abre uno nuevo. Un ítem que por
/// sí solo excede el límite obtiene su propio bundle.
fn plan_bundles(mut items: Vec<(String, u64)>, limit: u64) -> Vec<PackedBundle> {
    items.sort_by_key(|item| std::cmp::Reverse(item.1));
    let mut bundles: Vec<PackedBundle> = Vec::new();
    for (name, size) in items {
        if let Some(bundle) = bundles.iter_mut().find(|b| b.total + size <= limit) {
            bundle.files.push((name, size));
            bundle.total += size;
        } else {
            bundles.push(PackedBundle { files: vec![(name, size)], total: size });
        }
    }
    bundles
}

pub struct DownloadProcessor {
    store: Arc<SessionStore>,
    blobs: Arc<dyn BlobStore>,
}

impl DownloadProcessor {
    pub fn new(store: Arc<SessionStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { store, blobs }
    }
}

#[async_trait]
impl JobRunner for DownloadProcessor {
    async fn run(&self, session_id: String, payload: JobPayload) -> Result<(), DispatchError> {
        let JobPayload::Download(mut job) = payload else { return Ok(()) };
        let now = chrono::Utc::now().timestamp();

        job.status = JobStatus::Processing;
        let _ = self.store.put_download_job(&session_id, &job, now).await;

        let filenames = match self.store.get_session(&session_id).await {
            Ok(session) => session.uploaded_keys.unwrap_or_default(),
            Err(_) => Vec::new(),
        };

        let mut images = Vec::new();
        let mut videos = Vec::new();
        for filename in filenames {
            let key = format!("{session_id}/{filename}");
            let size = match self.blobs.size_of(&key).await {
                Ok(size) => size,
                Err(e) => {
                    log::warn!("download planner: skipping {filename}, size lookup failed: {e}");
                    continue;
                }
            };
            if is_video(&filename) {
                videos.push((filename, size));
            } else {
                images.push((filename, size));
            }
        }

        let mut bundles = Vec::new();
        let mut bundle_index = 0usize;

        for (bundle_type, packed) in [(BundleType::Images, plan_bundles(images, BUNDLE_SIZE_LIMIT_BYTES)), (BundleType::Videos, plan_bundles(videos, BUNDLE_SIZE_LIMIT_BYTES))] {
            for bundle in packed {
                let prefix = match bundle_type {
                    BundleType::Images => "images",
                    BundleType::Videos => "videos",
                };
                let name = format!("{prefix}-{bundle_index}.zip");
                bundle_index += 1;

                let entry_keys: Vec<String> = bundle.files.iter().map(|(f, _)| format!("{session_id}/{f}")).collect();
                let zip_key = format!("{session_id}/downloads/{}/{name}", job.id);
                let zip_size = self.blobs.zip_and_upload(&zip_key, &entry_keys).await.ok();
                let download_url = self.blobs.presigned_url(&zip_key).await.ok();

                bundles.push(Bundle {
                    bundle_type,
                    name,
                    zip_key: Some(zip_key),
                    download_url,
                    file_count: bundle.files.len(),
                    total_size: bundle.total,
                    zip_size,
                    bundle_status: BundleStatus::Ready,
                });
            }
        }

        job.bundles = bundles;
        job.status = JobStatus::Complete;

        self.store.put_download_job(&session_id, &job, now).await.map_err(DispatchError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;

    #[test]
    fn scenario_e_bundle_packing() {
        let videos = vec![("v400".to_string(), 400 * MIB), ("v200".to_string(), 200 * MIB), ("v100".to_string(), 100 * MIB), ("v50".to_string(), 50 * MIB)];
        let bundles = plan_bundles(videos, BUNDLE_SIZE_LIMIT_BYTES);

        assert_eq!(bundles.len(), 2);
        assert_eq!(bundles[0].files, vec![("v400".to_string(), 400 * MIB)]);
        assert_eq!(bundles[1].files, vec![("v200".to_string(), 200 * MIB), ("v100".to_string(), 100 * MIB), ("v50".to_string(), 50 * MIB)]);
        assert_eq!(bundles[1].total, 350 * MIB);
    }

    #[tokio::test]
    async fn full_job_produces_expected_bundle_names_scenario_e() {
        use crate::providers::mock::MockBlobStore;
        use mediaflow_core::model::job::DownloadJob;
        use mediaflow_core::Session;

        let store = Arc::new(SessionStore::new(86_400));
        let mut session = Session::new("s1".into(), "user-1".into(), None, 0);
        session.uploaded_keys = Some(vec!["img.jpg".into(), "v400.mp4".into(), "v200.mp4".into(), "v100.mp4".into(), "v50.mp4".into()]);
        store.put_session(&session, 0).await.unwrap();

        let blobs = Arc::new(MockBlobStore::default());
        blobs.seed_size("s1/img.jpg", 5 * MIB);
        blobs.seed_size("s1/v400.mp4", 400 * MIB);
        blobs.seed_size("s1/v200.mp4", 200 * MIB);
        blobs.seed_size("s1/v100.mp4", 100 * MIB);
        blobs.seed_size("s1/v50.mp4", 50 * MIB);

        let processor = DownloadProcessor::new(store.clone(), blobs);
        let payload = JobPayload::Download(DownloadJob::pending("d-1".into()));
        processor.run("s1".into(), payload).await.unwrap();

        let job = store.get_download_job("s1", "d-1").await.unwrap();
        assert_eq!(job.status, JobStatus::Complete);
        let names: Vec<_> = job.bundles.iter().map(|b| b.name.clone()).collect();
        assert_eq!(names, vec!["images-0.zip", "videos-1.zip", "videos-2.zip"]);
        assert_eq!(job.bundles[1].file_count, 1);
        assert_eq!(job.bundles[2].file_count, 3);
        assert_eq!(job.bundles[2].total_size, 350 * MIB);
    }
}
