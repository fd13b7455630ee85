// [apps/inference-worker/src/errors.rs]
//! =================================================================
//! APARATO: DISPATCH ERROR CATALOG (V5.0 - SOBERANO)
//! CLASIFICACIÓN: WORKER EXECUTION LAYER (ESTRATO L1-WORKER)
//! RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DE DESPACHO
//! =================================================================

use thiserror::Error;

/// Fallos semánticos del despachador de inferencia.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// El detector carece de ruta de modelo primario.
    #[error("[L1_DISPATCH_FAULT]: CONFIG_MISSING_MODEL -> detector '{0}' has no primary model path")]
    MissingPrimaryModel(String),

    /// El arsenal no pudo entregar la sesión solicitada.
    #[error("[L1_DISPATCH_FAULT]: ARSENAL_REJECTION -> {0}")]
    ArsenalFault(#[from] intellioptics_infra_model_cache::CacheError),

    /// Fallo del estrato de visión (decodificación o layout de salida).
    #[error("[L1_DISPATCH_FAULT]: VISION_REJECTION -> {0}")]
    VisionFault(#[from] intellioptics_core_vision::VisionError),

    /// La pasada de inferencia excedió la ventana de 60 segundos.
    #[error("[L1_DISPATCH_FAULT]: INFERENCE_TIMEOUT -> session exceeded the 60s window")]
    InferenceTimeout,

    /// El runtime ONNX rechazó la ejecución de la sesión.
    #[error("[L1_DISPATCH_FAULT]: RUNTIME_REJECTION -> {0}")]
    RuntimeFault(String),

    /// Ruta de modelo por defecto ausente (modo octet-stream).
    #[error("[L1_DISPATCH_FAULT]: DEFAULT_MODEL_UNAVAILABLE -> no process-wide model loaded")]
    DefaultModelUnavailable,
}
