// [libs/infra/model-cache/src/lib.rs]
/*!
 * =================================================================
 * APARATO: MODEL CACHE ROOT (V4.2 - ARSENAL MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: EXPOSICIÓN DEL ARSENAL DE SESIONES Y SU CAPA DE DISCO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. GENERIC EVICTION CORE: 'SessionCache<S>' es genérico sobre el tipo
 *    de sesión, permitiendo certificar la política de evicción sin
 *    cargar artefactos ONNX reales.
 * 2. SERIALIZED SESSIONS: Cada sesión viva se entrega como
 *    'Arc<Mutex<Session>>'; el runtime exige acceso exclusivo por
 *    ejecución y el candado lo garantiza.
 * =================================================================
 */

pub mod artifact;
pub mod cache;
pub mod errors;

pub use artifact::{ArtifactStore, DEFAULT_MODEL_REPOSITORY};
pub use cache::{ModelRole, SessionCache};
pub use errors::CacheError;

use intellioptics_infra_blob_vault::BlobVault;
use ort::session::Session;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{info, instrument};

/// Sesión ONNX compartida con acceso serializado por candado.
pub type SharedOnnxSession = Arc<Mutex<Session>>;

/// Capacidad nominal del arsenal (detectores primarios + OODD).
pub const DEFAULT_ARSENAL_CAPACITY: usize = 10;

/**
 * Arsenal soberano de modelos: caché RAM + capa de artefactos en disco.
 */
pub struct ModelArsenal {
    session_cache: SessionCache<Mutex<Session>>,
    artifact_store: ArtifactStore,
}

impl ModelArsenal {
    /// Forja el arsenal sobre la bóveda y el directorio de caché local.
    pub fn new(
        vault: Arc<BlobVault>,
        cache_root_directory: PathBuf,
        capacity: usize,
        model_repository: String,
    ) -> Self {
        Self {
            session_cache: SessionCache::new(capacity),
            artifact_store: ArtifactStore::new(vault, cache_root_directory, model_repository),
        }
    }

    /**
     * Adquiere la sesión viva de un detector para el rol dado.
     *
     * # Logic:
     * 1. Hit de RAM: retorno O(1) con incremento de frecuencia.
     * 2. Miss: carga single-flight — materialización del artefacto desde
     *    la bóveda (tempfile + rename, sello de tamaño) y construcción
     *    de la sesión en el pool bloqueante de Tokio.
     *
     * # Errors:
     * - `CacheError::ArtifactFault`: La bóveda no entregó el artefacto.
     * - `CacheError::SessionIgnition`: El runtime rechazó el artefacto.
     */
    #[instrument(skip(self), fields(detector = %detector_identifier, role = ?role))]
    pub async fn acquire_session(
        &self,
        detector_identifier: &str,
        role: ModelRole,
        model_blob_path: &str,
    ) -> Result<SharedOnnxSession, CacheError> {
        let cache_key = (detector_identifier.to_string(), role);
        let blob_path_owned = model_blob_path.to_string();
        let detector_owned = detector_identifier.to_string();

        self.session_cache
            .get_or_load(cache_key, || async move {
                let artifact_path = self
                    .artifact_store
                    .materialize(&detector_owned, role, &blob_path_owned)
                    .await?;

                info!("🧠 [ARSENAL]: Igniting ONNX session from {}", artifact_path.display());

                let session = tokio::task::spawn_blocking(move || {
                    Session::builder()
                        .and_then(|mut builder| builder.commit_from_file(&artifact_path))
                })
                .await
                .map_err(|join_fault| CacheError::SessionIgnition(join_fault.to_string()))?
                .map_err(|ort_fault| CacheError::SessionIgnition(ort_fault.to_string()))?;

                Ok::<_, CacheError>(Mutex::new(session))
            })
            .await
    }

    /// Cantidad de sesiones vivas en el arsenal.
    pub async fn live_session_count(&self) -> usize {
        self.session_cache.len().await
    }
}
