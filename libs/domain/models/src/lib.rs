// [libs/domain/models/src/lib.rs]
/*!
 * =================================================================
 * APARATO: DOMAIN MODELS ROOT (V4.1 - SOBERANO)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: EXPOSICIÓN NOMINAL DE CONTRATOS DE INSPECCIÓN VISUAL
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. CONTRACT SOVEREIGNTY: Define la gramática inmutable que viaja entre
 *    el Orchestrator (L1), el Inference Worker (L1) y los nodos Edge.
 * 2. CLOSED VARIANTS: Todos los estados ('status', 'mode', 'severity',
 *    'condition_type') son enums cerrados; los valores desconocidos se
 *    rechazan en la frontera de deserialización.
 * 3. NOMINAL PURITY: Erradicación total de abreviaciones.
 *
 * # Mathematical Proof (Wire Parity):
 * Las formas serializadas de los discriminadores (SCREAMING_SNAKE_CASE
 * para estados de máquina, lowercase para severidades) son idénticas a
 * las persistidas por el plano de control, garantizando ida y vuelta
 * bit-perfecta entre RAM, SQL y HTTP.
 * =================================================================
 */

pub mod detector;
pub mod query;
pub mod alert;
pub mod camera;
pub mod demo;
pub mod inference;

pub use detector::{Detector, DetectorConfig, DetectionMode, DetectionParams, ModelInputConfig};
pub use query::{Query, QueryStatus, Escalation, Feedback, Annotation};
pub use alert::{
    AlertConditionType, AlertSeverity, DetectorAlert, DetectorAlertConfig,
};
pub use camera::{
    Camera, CameraAlert, CameraAlertType, CameraHealthSample, CameraStatus,
    InspectionDirectives, InspectionRun, InspectionRunStatus,
};
pub use demo::{CaptureMode, DemoDetectionResult, DemoSession, DemoSessionStatus};
pub use inference::{
    Detection, FallbackEnvelope, ImageQueryEnvelope, InferenceDirectives,
    InferenceReport, InferenceResultEnvelope, ModelInfo, OoddVerdict,
};

#[cfg(test)]
mod tests {
    use super::*;

    /**
     * CERTIFICACIÓN DE VISIBILIDAD SOBERANA:
     * Garantiza que los tipos clave son accesibles y que el linkado es íntegro.
     */
    #[test]
    fn certify_contract_visibility_v4_1() {
        let _detector_id = std::any::TypeId::of::<Detector>();
        let _query_id = std::any::TypeId::of::<Query>();
        let _alert_id = std::any::TypeId::of::<DetectorAlert>();
        let _report_id = std::any::TypeId::of::<InferenceReport>();

        println!("✅ STRATUM_L2: Contract visibility certified.");
    }
}
