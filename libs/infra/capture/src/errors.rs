// [libs/infra/capture/src/errors.rs]
//! =================================================================
//! APARATO: CAPTURE ERROR CATALOG (V4.0 - SOBERANO)
//! CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
//! RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DE CAPTURA
//! =================================================================

use thiserror::Error;

/// Fallos semánticos de la tubería de captura.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// El extractor externo no produjo una URL reproducible.
    #[error("[L3_CAPTURE_FAULT]: STREAM_RESOLUTION_REJECTED -> {0}")]
    ResolutionFault(String),

    /// Fallo al lanzar o gestionar un subproceso hijo.
    #[error("[L3_CAPTURE_FAULT]: SUBPROCESS_IGNITION_FAILED -> {0}")]
    SubprocessFault(#[from] std::io::Error),

    /// El extractor externo excedió su ventana de tiempo.
    #[error("[L3_CAPTURE_FAULT]: RESOLUTION_TIMEOUT -> {0}")]
    ResolutionTimeout(String),

    /// El decodificador terminó sin emitir un solo frame.
    #[error("[L3_CAPTURE_FAULT]: PIPELINE_DRY -> stream ended before first frame")]
    PipelineDry,
}
