// [libs/infra/blob-vault/src/lib.rs]
/*!
 * =================================================================
 * APARATO: BLOB VAULT GATEWAY (V3.4 - ATOMIC SEAL)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: CUSTODIA DE ARTEFACTOS BINARIOS Y FIRMADO DE ACCESO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. ATOMIC WRITES: Toda subida materializa primero un '.part' y sella
 *    con rename; un colapso a mitad de ráfaga jamás deja un objeto
 *    legible a medias.
 * 2. LAZY CONTAINERS: Los contenedores se crean en la primera subida.
 * 3. EXPLICIT CREDENTIAL STRATEGY: La resolución de credenciales se fija
 *    una única vez en la construcción (clave de cuenta HMAC o SAS
 *    pre-firmada embebida), erradicando el fallback implícito del legado.
 * 4. IDEMPOTENT DELETE: 'not found' es éxito con existed=false; cualquier
 *    otro fallo de I/O propaga.
 *
 * # Mathematical Proof (Bearer URL Integrity):
 * sig = HMAC-SHA256(account_key, "{container}/{name}|{exp}"). Sin la
 * clave de cuenta es computacionalmente inviable forjar 'sig' para un
 * 'exp' futuro, luego la URL es portadora válida exactamente hasta 'exp'.
 * =================================================================
 */

pub mod errors;

pub use errors::VaultError;

use base64::{engine::general_purpose::STANDARD as BASE64_ENGINE, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument, warn};

type HmacSha256 = Hmac<Sha256>;

/// Sufijo del sidecar de tipo de contenido.
const CONTENT_TYPE_SIDECAR_SUFFIX: &str = ".meta";

/// Estrategia de firmado de URLs, sellada en la construcción.
pub enum SignedUrlStrategy {
    /// Firma fresca HMAC-SHA256 con la clave de cuenta.
    AccountKey {
        /// Nombre nominal de la cuenta (solo para rastro).
        account_name: String,
        /// Clave binaria decodificada de la cuenta.
        account_key: Vec<u8>,
    },
    /// Token SAS pre-firmado embebido en el descriptor de conexión.
    PresignedPassthrough {
        /// Token SAS completo (sin el '?').
        shared_access_signature: String,
    },
}

/// Pasarela soberana de la bóveda de objetos.
pub struct BlobVault {
    vault_root_directory: PathBuf,
    public_base_endpoint: String,
    signing_strategy: SignedUrlStrategy,
}

impl BlobVault {
    /**
     * Abre la bóveda parseando el descriptor de conexión una única vez.
     *
     * # Logic:
     * Descriptor formato 'AccountName=..;AccountKey=..;Endpoint=..' o
     * 'SharedAccessSignature=..;Endpoint=..'. La presencia de una SAS
     * selecciona la estrategia passthrough; en su ausencia rige la clave
     * de cuenta.
     *
     * # Errors:
     * - `ConfigurationFault`: Descriptor sin material de firma utilizable.
     */
    pub fn open(
        vault_root_directory: impl Into<PathBuf>,
        connection_descriptor: &str,
    ) -> Result<Self, VaultError> {
        let mut account_name = None;
        let mut account_key = None;
        let mut shared_access_signature = None;
        let mut public_base_endpoint = None;

        for fragment in connection_descriptor.split(';') {
            let Some((key, value)) = fragment.split_once('=') else { continue };
            match key.trim() {
                "AccountName" => account_name = Some(value.to_string()),
                "AccountKey" => account_key = Some(value.to_string()),
                "SharedAccessSignature" => shared_access_signature = Some(value.to_string()),
                "Endpoint" => public_base_endpoint = Some(value.trim_end_matches('/').to_string()),
                _ => {}
            }
        }

        let signing_strategy = if let Some(sas_token) = shared_access_signature {
            SignedUrlStrategy::PresignedPassthrough { shared_access_signature: sas_token }
        } else if let Some(encoded_key) = account_key {
            let decoded_key = BASE64_ENGINE.decode(encoded_key.as_bytes()).map_err(|fault| {
                VaultError::ConfigurationFault(format!("ACCOUNT_KEY_DECODE_REJECTED: {}", fault))
            })?;
            SignedUrlStrategy::AccountKey {
                account_name: account_name.unwrap_or_else(|| "intellioptics".to_string()),
                account_key: decoded_key,
            }
        } else {
            return Err(VaultError::ConfigurationFault(
                "SIGNING_MATERIAL_VOID: neither AccountKey nor SharedAccessSignature present".into(),
            ));
        };

        Ok(Self {
            vault_root_directory: vault_root_directory.into(),
            public_base_endpoint: public_base_endpoint
                .unwrap_or_else(|| "http://127.0.0.1:8080/blobs".to_string()),
            signing_strategy,
        })
    }

    /**
     * Sube un artefacto binario y retorna la ruta persistible
     * '{container}/{name}'.
     *
     * # Errors:
     * - `PathTraversalRejected`: Nombre con componentes ascendentes.
     * - `IoFault`: Fallo de disco durante la materialización.
     */
    #[instrument(skip(self, artifact_bytes), fields(container = %container, name = %blob_name))]
    pub async fn upload(
        &self,
        container: &str,
        blob_name: &str,
        artifact_bytes: &[u8],
        content_type: &str,
    ) -> Result<String, VaultError> {
        let object_path = self.resolve_object_path(container, blob_name)?;

        if let Some(parent_directory) = object_path.parent() {
            // Creación perezosa del contenedor (y sub-rutas) en la primera subida.
            fs::create_dir_all(parent_directory).await.map_err(VaultError::IoFault)?;
        }

        // Sello atómico: materializar '.part' y renombrar.
        let staging_path = {
            let mut staged = object_path.as_os_str().to_owned();
            staged.push(".part");
            PathBuf::from(staged)
        };
        fs::write(&staging_path, artifact_bytes).await.map_err(VaultError::IoFault)?;
        fs::rename(&staging_path, &object_path).await.map_err(VaultError::IoFault)?;

        let sidecar_path = sidecar_of(&object_path);
        fs::write(&sidecar_path, content_type.as_bytes()).await.map_err(VaultError::IoFault)?;

        info!(
            "📦 [VAULT_SEAL]: Object crystallized ({} bytes) at [{}/{}]",
            artifact_bytes.len(), container, blob_name
        );

        Ok(format!("{}/{}", container, blob_name))
    }

    /**
     * Descarga el contenido íntegro de un objeto.
     *
     * # Errors:
     * - `ObjectNotFound`: El objeto no existe en la bóveda.
     */
    #[instrument(skip(self), fields(container = %container, name = %blob_name))]
    pub async fn download(&self, container: &str, blob_name: &str) -> Result<Vec<u8>, VaultError> {
        let object_path = self.resolve_object_path(container, blob_name)?;

        match fs::read(&object_path).await {
            Ok(artifact_bytes) => Ok(artifact_bytes),
            Err(io_fault) if io_fault.kind() == std::io::ErrorKind::NotFound => {
                Err(VaultError::ObjectNotFound {
                    container: container.to_string(),
                    name: blob_name.to_string(),
                })
            }
            Err(io_fault) => Err(VaultError::IoFault(io_fault)),
        }
    }

    /**
     * Borra un objeto. 'not found' es éxito con existed=false.
     */
    #[instrument(skip(self), fields(container = %container, name = %blob_name))]
    pub async fn delete(&self, container: &str, blob_name: &str) -> Result<bool, VaultError> {
        let object_path = self.resolve_object_path(container, blob_name)?;

        match fs::remove_file(&object_path).await {
            Ok(()) => {
                // El sidecar es prescindible; su ausencia no es un fallo.
                let _ = fs::remove_file(sidecar_of(&object_path)).await;
                debug!("🗑️ [VAULT_PURGE]: Object evicted [{}/{}]", container, blob_name);
                Ok(true)
            }
            Err(io_fault) if io_fault.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(io_fault) => Err(VaultError::IoFault(io_fault)),
        }
    }

    /// Tipo de contenido registrado en la subida, si sobrevive el sidecar.
    pub async fn content_type(&self, container: &str, blob_name: &str) -> Option<String> {
        let object_path = self.resolve_object_path(container, blob_name).ok()?;
        fs::read_to_string(sidecar_of(&object_path)).await.ok()
    }

    /**
     * Emite una URL portadora válida por 'ttl_seconds'.
     *
     * # Logic:
     * - AccountKey: firma fresca HMAC-SHA256 sobre '{path}|{exp}'.
     * - PresignedPassthrough: adjunta la SAS embebida del descriptor.
     */
    #[instrument(skip(self))]
    pub fn sign(&self, container: &str, blob_name: &str, ttl_seconds: u64) -> Result<String, VaultError> {
        let object_reference = format!("{}/{}", container, blob_name);

        match &self.signing_strategy {
            SignedUrlStrategy::PresignedPassthrough { shared_access_signature } => Ok(format!(
                "{}/{}?{}",
                self.public_base_endpoint, object_reference, shared_access_signature
            )),
            SignedUrlStrategy::AccountKey { account_key, .. } => {
                let expiry_unix = chrono::Utc::now().timestamp() as u64 + ttl_seconds;
                let signature = compute_signature(account_key, &object_reference, expiry_unix)?;
                Ok(format!(
                    "{}/{}?exp={}&sig={}",
                    self.public_base_endpoint, object_reference, expiry_unix, signature
                ))
            }
        }
    }

    /**
     * Verifica una firma emitida por 'sign' (estrategia AccountKey).
     * Expirada o forjada → false.
     */
    pub fn verify_signature(
        &self,
        container: &str,
        blob_name: &str,
        expiry_unix: u64,
        presented_signature: &str,
    ) -> bool {
        let SignedUrlStrategy::AccountKey { account_key, .. } = &self.signing_strategy else {
            return false;
        };

        if (chrono::Utc::now().timestamp() as u64) > expiry_unix {
            warn!("⏳ [VAULT_SIGN]: Bearer URL expired for [{}/{}]", container, blob_name);
            return false;
        }

        let object_reference = format!("{}/{}", container, blob_name);
        match compute_signature(account_key, &object_reference, expiry_unix) {
            Ok(expected_signature) => expected_signature == presented_signature,
            Err(_) => false,
        }
    }

    /// Resuelve la ruta física del objeto rechazando el ascenso de rutas.
    fn resolve_object_path(&self, container: &str, blob_name: &str) -> Result<PathBuf, VaultError> {
        let is_hostile = |fragment: &str| {
            fragment.split('/').any(|component| component == ".." || component.is_empty())
        };

        if is_hostile(container) || is_hostile(blob_name) {
            return Err(VaultError::PathTraversalRejected(format!("{}/{}", container, blob_name)));
        }

        Ok(self.vault_root_directory.join(container).join(blob_name))
    }
}

/// Sidecar '<objeto>.meta' que registra el tipo de contenido.
fn sidecar_of(object_path: &Path) -> PathBuf {
    let mut sidecar = object_path.as_os_str().to_owned();
    sidecar.push(CONTENT_TYPE_SIDECAR_SUFFIX);
    PathBuf::from(sidecar)
}

/// Firma HMAC-SHA256 en hexadecimal sobre '{path}|{exp}'.
fn compute_signature(account_key: &[u8], object_reference: &str, expiry_unix: u64) -> Result<String, VaultError> {
    let mut mac = HmacSha256::new_from_slice(account_key).map_err(|fault| {
        VaultError::ConfigurationFault(format!("HMAC_KEY_REJECTED: {}", fault))
    })?;
    mac.update(object_reference.as_bytes());
    mac.update(b"|");
    mac.update(expiry_unix.to_string().as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/**
 * Separa una ruta persistida '{container}/{name}' en sus componentes.
 *
 * # Errors:
 * - `MalformedObjectPath`: Sin separador de contenedor.
 */
pub fn split_blob_path(blob_path: &str) -> Result<(&str, &str), VaultError> {
    blob_path
        .split_once('/')
        .filter(|(container, name)| !container.is_empty() && !name.is_empty())
        .ok_or_else(|| VaultError::MalformedObjectPath(blob_path.to_string()))
}
