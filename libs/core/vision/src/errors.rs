// [libs/core/vision/src/errors.rs]
//! =================================================================
//! APARATO: VISION ERROR CATALOG (V5.0 - SOBERANO)
//! CLASIFICACIÓN: CORE COMPUTATION (ESTRATO L1)
//! RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DE VISIÓN
//! =================================================================

use thiserror::Error;

/// Fallos semánticos del motor de visión.
#[derive(Error, Debug)]
pub enum VisionError {
    /// Los bytes recibidos no decodifican como imagen soportada.
    #[error("[L1_VISION_FAULT]: IMAGE_DECODE_REJECTED -> {0}")]
    ImageDecode(String),

    /// La salida del modelo no coincide con ningún layout soportado.
    #[error("[L1_VISION_FAULT]: UNSUPPORTED_OUTPUT_LAYOUT -> shape {0:?}")]
    UnsupportedOutputLayout(Vec<usize>),

    /// La salida OODD no contiene logits interpretables.
    #[error("[L1_VISION_FAULT]: OODD_LOGITS_VOID -> empty classifier output")]
    EmptyOoddOutput,

    /// La imagen carece de píxeles (dimensión cero).
    #[error("[L1_VISION_FAULT]: DEGENERATE_IMAGE -> {width}x{height}")]
    DegenerateImage {
        /// Ancho observado.
        width: u32,
        /// Alto observado.
        height: u32,
    },
}
