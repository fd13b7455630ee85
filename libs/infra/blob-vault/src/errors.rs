// [libs/infra/blob-vault/src/errors.rs]
//! =================================================================
//! APARATO: VAULT ERROR CATALOG (V3.0 - SOBERANO)
//! CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
//! RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DE LA BÓVEDA
//! =================================================================

use thiserror::Error;

/// Fallos semánticos de la pasarela de objetos binarios.
#[derive(Error, Debug)]
pub enum VaultError {
    /// Fallo físico de disco durante la materialización o lectura.
    #[error("[L3_VAULT_FAULT]: STORAGE_IO_SEVERED -> {0}")]
    IoFault(#[from] std::io::Error),

    /// El objeto solicitado no reside en la bóveda.
    #[error("[L3_VAULT_FAULT]: OBJECT_NOT_FOUND -> {container}/{name}")]
    ObjectNotFound {
        /// Contenedor consultado.
        container: String,
        /// Nombre del objeto consultado.
        name: String,
    },

    /// Descriptor de conexión sin material de firma utilizable.
    #[error("[L3_VAULT_CONFIG_FAULT]: {0}")]
    ConfigurationFault(String),

    /// Nombre de objeto con componentes de ascenso de ruta.
    #[error("[L3_VAULT_FAULT]: PATH_TRAVERSAL_REJECTED -> {0}")]
    PathTraversalRejected(String),

    /// Ruta persistida sin separador '{container}/{name}'.
    #[error("[L3_VAULT_FAULT]: MALFORMED_OBJECT_PATH -> {0}")]
    MalformedObjectPath(String),
}
