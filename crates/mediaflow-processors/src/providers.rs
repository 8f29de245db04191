//! Traits de colaboradores externos que el core orquesta pero no implementa
//! (AI model providers, blob store — explícitamente fuera de alcance en el
//! documento de diseño). Calcados de la forma `DataProvider`/`MoleculeProvider`
//! del proveedor original: nombre/versión + una operación async que entrega
//! datos estructurados. Las implementaciones `Mock*` son las únicas que este
//! repositorio aporta; un despliegue real sustituye estos traits por clientes
//! concretos sin tocar ningún procesador.

use async_trait::async_trait;

use crate::error::ProcessorError;

#[derive(Debug, Clone)]
pub struct TriageVerdict {
    pub filename: String,
    pub saveable: bool,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct SelectionVerdict {
    pub selected: Vec<(String, u32, String, String)>,
    pub excluded: Vec<(String, String, String, Option<String>)>,
}

#[derive(Debug, Clone)]
pub struct EnhancementAnalysisResult {
    pub phase1_text: String,
    pub score: f32,
    pub improvements: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CaptionResult {
    pub caption: String,
    pub hashtags: Vec<String>,
    pub location_tag: Option<String>,
    pub raw_response: String,
}

/// Puerto hacia el modelo de IA externo (clasificación, análisis, edición de
/// imagen, generación de caption). Una sola invocación del mock cuenta como
/// una llamada al modelo (§8.4 Escenario C).
#[async_trait]
pub trait AiProvider: Send + Sync {
    fn get_name(&self) -> &str;
    fn get_version(&self) -> &str;

    async fn classify_triage(&self, filenames: &[String]) -> Result<Vec<TriageVerdict>, ProcessorError>;
    async fn rank_selection(&self, filenames: &[String]) -> Result<SelectionVerdict, ProcessorError>;
    async fn analyze_enhancement(&self, filename: &str, bytes: &[u8]) -> Result<EnhancementAnalysisResult, ProcessorError>;
    async fn edit_image(&self, filename: &str, bytes: &[u8], feedback: Option<&str>) -> Result<Vec<u8>, ProcessorError>;
    async fn generate_caption(&self, media_keys: &[String], feedback: Option<&str>) -> Result<CaptionResult, ProcessorError>;
}

/// Puerto hacia el almacén de objetos (§6.4). Claves por convención:
/// `{sessionId}/{filename}`, `{sessionId}/thumbnails/...`, etc. — la
/// convención vive en cada procesador, no aquí.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, ProcessorError>;
    async fn put_bytes(&self, key: &str, bytes: &[u8]) -> Result<(), ProcessorError>;
    async fn size_of(&self, key: &str) -> Result<u64, ProcessorError>;
    async fn zip_and_upload(&self, key: &str, entry_keys: &[String]) -> Result<u64, ProcessorError>;
    async fn presigned_url(&self, key: &str) -> Result<String, ProcessorError>;
    async fn delete(&self, key: &str) -> Result<(), ProcessorError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoStatus {
    Processing,
    Finished,
    Error,
}

/// Puerto hacia la red social externa que consume el publish-processor
/// (§4.5 máquina de estados de publicación).
#[async_trait]
pub trait SocialPublisher: Send + Sync {
    async fn create_image_container(&self, key: &str) -> Result<String, ProcessorError>;
    async fn create_video_container(&self, key: &str) -> Result<String, ProcessorError>;
    async fn poll_video_status(&self, container_id: &str) -> Result<VideoStatus, ProcessorError>;
    async fn create_carousel(&self, container_ids: &[String], caption: &str) -> Result<String, ProcessorError>;
    async fn publish(&self, container_id: &str) -> Result<String, ProcessorError>;
}

pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Proveedor de IA determinista para pruebas y para demostraciones sin
    /// credenciales reales. `triage_keep` fija qué filenames se conservan;
    /// `video_poll_threshold` cuántos sondeos necesita un video para
    /// terminar (§8.4 Escenario D usa 3).
    pub struct MockAiProvider {
        pub triage_keep: Vec<String>,
        pub calls: AtomicUsize,
        last_edit_feedback: Mutex<Option<String>>,
    }

    impl MockAiProvider {
        pub fn new(triage_keep: Vec<String>) -> Self {
            Self { triage_keep, calls: AtomicUsize::new(0), last_edit_feedback: Mutex::new(None) }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn last_edit_feedback(&self) -> Option<String> {
            self.last_edit_feedback.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AiProvider for MockAiProvider {
        fn get_name(&self) -> &str {
            "mock-ai-provider"
        }

        fn get_version(&self) -> &str {
            "0.1.0"
        }

        async fn classify_triage(&self, filenames: &[String]) -> Result<Vec<TriageVerdict>, ProcessorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(filenames
                .iter()
                .map(|f| {
                    let saveable = self.triage_keep.contains(f);
                    TriageVerdict {
                        filename: f.clone(),
                        saveable,
                        reason: if saveable { "sharp, well composed".into() } else { "blurry or duplicate".into() },
                    }
                })
                .collect())
        }

        async fn rank_selection(&self, filenames: &[String]) -> Result<SelectionVerdict, ProcessorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let selected = filenames
                .iter()
                .enumerate()
                .map(|(i, f)| (f.clone(), i as u32 + 1, "trip".to_string(), "best shot of the scene".to_string()))
                .collect();
            Ok(SelectionVerdict { selected, excluded: Vec::new() })
        }

        async fn analyze_enhancement(&self, filename: &str, bytes: &[u8]) -> Result<EnhancementAnalysisResult, ProcessorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(EnhancementAnalysisResult {
                phase1_text: format!("{filename} looks good, {} bytes", bytes.len()),
                score: 0.8,
                improvements: vec!["boost contrast".into()],
            })
        }

        async fn edit_image(&self, _filename: &str, bytes: &[u8], feedback: Option<&str>) -> Result<Vec<u8>, ProcessorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_edit_feedback.lock().unwrap() = feedback.map(|f| f.to_string());
            Ok(bytes.to_vec())
        }

        async fn generate_caption(&self, media_keys: &[String], feedback: Option<&str>) -> Result<CaptionResult, ProcessorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let base = format!("a trip through {} moments", media_keys.len());
            let caption = match feedback {
                Some(f) => format!("{base} ({f})"),
                None => base,
            };
            Ok(CaptionResult {
                caption: caption.clone(),
                hashtags: vec!["#travel".into()],
                location_tag: None,
                raw_response: caption,
            })
        }
    }

    /// Almacén de objetos en memoria; el tamaño de cada clave se declara al
    /// insertarla (`seed_size`) para poder ejercitar el planificador de
    /// bundles sin bytes reales de 400 MiB (§8.4 Escenario E).
    pub struct MockBlobStore {
        bytes: Mutex<HashMap<String, Vec<u8>>>,
        sizes: Mutex<HashMap<String, u64>>,
    }

    impl Default for MockBlobStore {
        fn default() -> Self {
            Self { bytes: Mutex::new(HashMap::new()), sizes: Mutex::new(HashMap::new()) }
        }
    }

    impl MockBlobStore {
        pub fn seed(&self, key: &str, bytes: Vec<u8>) {
            self.sizes.lock().unwrap().insert(key.to_string(), bytes.len() as u64);
            self.bytes.lock().unwrap().insert(key.to_string(), bytes);
        }

        pub fn seed_size(&self, key: &str, size: u64) {
            self.sizes.lock().unwrap().insert(key.to_string(), size);
            self.bytes.lock().unwrap().insert(key.to_string(), vec![0u8; 0]);
        }
    }

    #[async_trait]
    impl BlobStore for MockBlobStore {
        async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, ProcessorError> {
            self.bytes
                .lock()
                .unwrap()
                .get(key)
                .cloned()
                .ok_or_else(|| ProcessorError::Provider(format!("blob not found: {key}")))
        }

        async fn put_bytes(&self, key: &str, bytes: &[u8]) -> Result<(), ProcessorError> {
            self.seed(key, bytes.to_vec());
            Ok(())
        }

        async fn size_of(&self, key: &str) -> Result<u64, ProcessorError> {
            self.sizes.lock().unwrap().get(key).copied().ok_or_else(|| ProcessorError::Provider(format!("blob not found: {key}")))
        }

        async fn zip_and_upload(&self, key: &str, entry_keys: &[String]) -> Result<u64, ProcessorError> {
            let sizes = self.sizes.lock().unwrap();
            let total: u64 = entry_keys.iter().map(|k| sizes.get(k).copied().unwrap_or(0)).sum();
            drop(sizes);
            self.seed_size(key, total);
            Ok(total)
        }

        async fn presigned_url(&self, key: &str) -> Result<String, ProcessorError> {
            Ok(format!("https://mock-blob.local/{key}"))
        }

        async fn delete(&self, key: &str) -> Result<(), ProcessorError> {
            self.bytes.lock().unwrap().remove(key);
            self.sizes.lock().unwrap().remove(key);
            Ok(())
        }
    }

    /// Red social simulada: los contenedores de video requieren
    /// `poll_threshold` sondeos antes de `Finished` (§8.4 Escenario D: 3).
    pub struct MockSocialPublisher {
        poll_threshold: u32,
        polls: Mutex<HashMap<String, AtomicU32>>,
        container_seq: AtomicU32,
    }

    impl MockSocialPublisher {
        pub fn new(poll_threshold: u32) -> Self {
            Self { poll_threshold, polls: Mutex::new(HashMap::new()), container_seq: AtomicU32::new(0) }
        }
    }

    #[async_trait]
    impl SocialPublisher for MockSocialPublisher {
        async fn create_image_container(&self, _key: &str) -> Result<String, ProcessorError> {
            let n = self.container_seq.fetch_add(1, Ordering::SeqCst);
            Ok(format!("container-img-{n}"))
        }

        async fn create_video_container(&self, _key: &str) -> Result<String, ProcessorError> {
            let n = self.container_seq.fetch_add(1, Ordering::SeqCst);
            let id = format!("container-vid-{n}");
            self.polls.lock().unwrap().insert(id.clone(), AtomicU32::new(0));
            Ok(id)
        }

        async fn poll_video_status(&self, container_id: &str) -> Result<VideoStatus, ProcessorError> {
            let polls = self.polls.lock().unwrap();
            let Some(counter) = polls.get(container_id) else {
                return Ok(VideoStatus::Finished);
            };
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(if n >= self.poll_threshold { VideoStatus::Finished } else { VideoStatus::Processing })
        }

        async fn create_carousel(&self, _container_ids: &[String], _caption: &str) -> Result<String, ProcessorError> {
            Ok("car-1".into())
        }

        async fn publish(&self, _container_id: &str) -> Result<String, ProcessorError> {
            Ok("post-xyz".into())
        }
    }
}
