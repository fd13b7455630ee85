// [libs/infra/model-cache/src/artifact.rs]
/*!
 * =================================================================
 * APARATO: MODEL ARTIFACT DISK LAYER (V4.2 - INTEGRITY STAMP)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: MATERIALIZACIÓN DE ARTEFACTOS ONNX EN DISCO LOCAL
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. ATOMIC MATERIALIZATION: Descarga a '.tmp' y sella con rename; un
 *    colapso jamás deja un artefacto legible a medias.
 * 2. CORRUPTION TRIAGE: Un artefacto de cero bytes se trata como caché
 *    corrupta y se re-descarga.
 * 3. SIZE STAMP: Junto al artefacto persiste 'model.size' con la
 *    longitud esperada; una discrepancia fuerza la re-descarga.
 * =================================================================
 */

use crate::cache::ModelRole;
use crate::errors::CacheError;
use intellioptics_infra_blob_vault::{split_blob_path, BlobVault};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tracing::{info, instrument, warn};

/// Nombre canónico del artefacto en la capa de disco.
const ARTIFACT_FILE_NAME: &str = "model.onnx";

/// Nombre del sello de integridad (longitud esperada en bytes).
const SIZE_STAMP_FILE_NAME: &str = "model.size";

/// Contenedor por defecto de artefactos de modelo (MODEL_REPOSITORY).
pub const DEFAULT_MODEL_REPOSITORY: &str = "models";

/// Capa de artefactos en disco respaldada por la bóveda.
pub struct ArtifactStore {
    vault: Arc<BlobVault>,
    cache_root_directory: PathBuf,
    model_repository: String,
}

impl ArtifactStore {
    /// Forja la capa de disco sobre la bóveda y el directorio raíz.
    pub fn new(vault: Arc<BlobVault>, cache_root_directory: PathBuf, model_repository: String) -> Self {
        Self { vault, cache_root_directory, model_repository }
    }

    /**
     * Materializa el artefacto en
     * '{root}/{detector}/{role}/model.onnx' y retorna su ruta.
     *
     * # Logic:
     * 1. Artefacto residente, no vacío y con sello coincidente → hit.
     * 2. En cualquier otro caso: descarga desde la bóveda, escritura a
     *    '.tmp', rename atómico y sellado de tamaño.
     *
     * # Errors:
     * - `ArtifactFault`: La bóveda no entregó el artefacto.
     * - `CorruptArtifact`: La descarga produjo cero bytes.
     */
    #[instrument(skip(self), fields(detector = %detector_identifier, role = ?role))]
    pub async fn materialize(
        &self,
        detector_identifier: &str,
        role: ModelRole,
        model_blob_path: &str,
    ) -> Result<PathBuf, CacheError> {
        let artifact_directory = self
            .cache_root_directory
            .join(detector_identifier)
            .join(role.as_path_fragment());
        let artifact_path = artifact_directory.join(ARTIFACT_FILE_NAME);
        let stamp_path = artifact_directory.join(SIZE_STAMP_FILE_NAME);

        if self.is_resident_and_sound(&artifact_path, &stamp_path).await {
            info!("💾 [ARTIFACT_STORE]: Disk hit for {}", artifact_path.display());
            return Ok(artifact_path);
        }

        fs::create_dir_all(&artifact_directory).await.map_err(CacheError::IoFault)?;

        // Una ruta sin segmento de contenedor cae al repositorio por defecto.
        let (container, blob_name) = split_blob_path(model_blob_path)
            .unwrap_or((self.model_repository.as_str(), model_blob_path));

        info!("🌐 [ARTIFACT_STORE]: Fetching artifact [{}] from vault...", model_blob_path);
        let artifact_bytes = self
            .vault
            .download(container, blob_name)
            .await
            .map_err(|fault| CacheError::ArtifactFault(fault.to_string()))?;

        if artifact_bytes.is_empty() {
            return Err(CacheError::CorruptArtifact(model_blob_path.to_string()));
        }

        // Materialización atómica: '.tmp' + rename.
        let staging_path = artifact_directory.join(format!("{}.tmp", ARTIFACT_FILE_NAME));
        fs::write(&staging_path, &artifact_bytes).await.map_err(CacheError::IoFault)?;
        fs::rename(&staging_path, &artifact_path).await.map_err(CacheError::IoFault)?;

        // Sello de integridad por longitud.
        fs::write(&stamp_path, artifact_bytes.len().to_string().as_bytes())
            .await
            .map_err(CacheError::IoFault)?;

        info!(
            "✅ [ARTIFACT_STORE]: Artifact sealed ({:.2} MB) at {}",
            artifact_bytes.len() as f64 / (1024.0 * 1024.0),
            artifact_path.display()
        );
        Ok(artifact_path)
    }

    /// Auditoría de residencia: existencia, no-vacío y sello coincidente.
    async fn is_resident_and_sound(&self, artifact_path: &PathBuf, stamp_path: &PathBuf) -> bool {
        let Ok(metadata) = fs::metadata(artifact_path).await else {
            return false;
        };

        if metadata.len() == 0 {
            warn!("🧟 [ARTIFACT_STORE]: Zero-byte artifact at {}; purging.", artifact_path.display());
            let _ = fs::remove_file(artifact_path).await;
            return false;
        }

        match fs::read_to_string(stamp_path).await {
            Ok(stamped_length) => {
                let sound = stamped_length.trim() == metadata.len().to_string();
                if !sound {
                    warn!(
                        "🧟 [ARTIFACT_STORE]: Size stamp drift at {} (stamped {}, actual {}); purging.",
                        artifact_path.display(), stamped_length.trim(), metadata.len()
                    );
                    let _ = fs::remove_file(artifact_path).await;
                }
                sound
            }
            // Sello ausente (despliegue previo): el artefacto no-vacío es prueba suficiente.
            Err(_) => true,
        }
    }
}
