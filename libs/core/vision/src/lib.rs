// [libs/core/vision/src/lib.rs]

#![deny(missing_docs)]

//! # APARATO: VISION STRATUM ROOT (V5.1 - ZENITH GOLD)
//! CLASIFICACIÓN: CORE COMPUTATION (ESTRATO L1)
//! RESPONSABILIDAD: ORQUESTACIÓN Y EXPOSICIÓN DEL MOTOR DE VISIÓN
//!
//! ## Visión Holística 2026
//! Actúa como la autoridad matemática del plano de datos. Todo píxel que
//! atraviesa el sistema (letterbox, decodificación de cabezas YOLO,
//! supresión de no-máximos, calibración OODD, métricas de sabotaje,
//! similitud estructural y rasgos binarios) se computa en este estrato,
//! sin I/O ni dependencias de runtime de inferencia.
//!
//! ## Características de Élite
//! 1. **Runtime Agnostic:** Recibe tensores planos (`shape` + `data`); el
//!    runtime ONNX vive en el estrato de infraestructura.
//! 2. **Deterministic Geometry:** Letterbox y su inversa son biyectivas
//!    dentro de la tolerancia de un píxel para ratios > 0.1.
//! 3. **Higiene L1:** Erradicación total de advertencias y residuos.

/// Catálogo de fallos semánticos del estrato de visión.
pub mod errors;

/// Decodificación de imágenes y geometría de letterbox.
pub mod letterbox;

/// Decodificación de cabezas de detección, NMS y filtros de clase.
pub mod postprocess;

/// Tabla de clases COCO-80 y mapeo de etiquetas.
pub mod coco;

/// Preprocesamiento y calibración del clasificador de dominio (OODD).
pub mod oodd;

/// Métricas de calidad de imagen y detección de sabotaje por frame.
pub mod quality;

/// Índice de similitud estructural (SSIM) por ventanas.
pub mod ssim;

/// Detección de esquinas FAST, descriptores BRIEF y matching Hamming.
pub mod features;

pub use crate::errors::VisionError;
pub use crate::letterbox::{decode_rgb_image, letterbox_to_tensor, LetterboxGeometry};
pub use crate::postprocess::{
    apply_oodd_attenuation, apply_per_class_thresholds, decode_detection_head,
    filter_by_class_names, non_max_suppression, DetectionHeadDirectives,
};
pub use crate::oodd::{oodd_input_tensor, oodd_verdict_from_logits, CALIBRATED_THRESHOLD_DEFAULT};
pub use crate::quality::{FrameHealthSentinel, FrameHealthVerdict, HealthStatus, SentinelThresholds};
pub use crate::ssim::structural_similarity;
pub use crate::features::{detect_and_describe, match_descriptors, FeatureDescriptor};

/**
 * PRELUDIO DE VISIÓN
 *
 * Colección de tipos de alta frecuencia para inyección directa en los
 * estratos de despacho (L3-Worker) e ingesta (L1-Edge).
 */
pub mod prelude {
    pub use crate::errors::VisionError;
    pub use crate::letterbox::{decode_rgb_image, letterbox_to_tensor, LetterboxGeometry};
    pub use crate::postprocess::{decode_detection_head, DetectionHeadDirectives};
    pub use crate::quality::{FrameHealthSentinel, FrameHealthVerdict, HealthStatus};
}

#[cfg(test)]
mod tests {
    use super::*;

    /**
     * CERTIFICACIÓN DE VISIBILIDAD SOBERANA:
     * Garantiza que los pilares del estrato son accesibles desde L3.
     */
    #[test]
    fn certify_stratum_visibility_v5_1() {
        let _geometry_id = std::any::TypeId::of::<LetterboxGeometry>();
        let _sentinel_id = std::any::TypeId::of::<FrameHealthSentinel>();
        let _error_id = std::any::TypeId::of::<VisionError>();

        println!("✅ STRATUM_L1: Vision integrity and visibility contracts certified.");
    }
}
