// [libs/infra/model-cache/src/errors.rs]
//! =================================================================
//! APARATO: CACHE ERROR CATALOG (V4.0 - SOBERANO)
//! CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
//! RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DEL ARSENAL
//! =================================================================

use thiserror::Error;

/// Fallos semánticos del arsenal de modelos.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Fallo físico de disco en la capa de artefactos.
    #[error("[L3_ARSENAL_FAULT]: DISK_IO_SEVERED -> {0}")]
    IoFault(#[from] std::io::Error),

    /// La bóveda no entregó el artefacto solicitado.
    #[error("[L3_ARSENAL_FAULT]: ARTIFACT_FETCH_REJECTED -> {0}")]
    ArtifactFault(String),

    /// El artefacto descargado está vacío o su sello no coincide.
    #[error("[L3_ARSENAL_FAULT]: CORRUPT_ARTIFACT -> {0}")]
    CorruptArtifact(String),

    /// El runtime ONNX rechazó la ignición de la sesión.
    #[error("[L3_ARSENAL_FAULT]: SESSION_IGNITION_FAILED -> {0}")]
    SessionIgnition(String),
}
