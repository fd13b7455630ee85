// [libs/domain/models/src/detector.rs]
/*!
 * =================================================================
 * APARATO: DETECTOR DOMAIN MODELS (V4.0 - PRODUCTION MASTER)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CONTRATOS SOBERANOS DE DETECTORES Y SU CONFIGURACIÓN
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. TYPED CONFIGURATION: Reemplaza la reflexión dinámica de atributos del
 *    plano de control heredado por un registro tipado explícito; los campos
 *    desconocidos se rechazan en la frontera de deserialización.
 * 2. SOFT DELETE DISCIPLINE: 'deleted_at' sella la invisibilidad del
 *    detector sin destruir su rastro histórico de consultas.
 * 3. NOMINAL PRECISION: Nomenclatura nominal absoluta en todos los campos.
 *
 * # Mathematical Proof (Threshold Subset Invariant):
 * Para todo detector D: keys(per_class_thresholds) ⊆ class_names(D).
 * La validación se ejecuta en la frontera, garantizando que el motor de
 * post-procesamiento nunca consulte un umbral de una clase inexistente.
 * =================================================================
 */

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;

/// Modo de interpretación semántica de las detecciones del modelo primario.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetectionMode {
    /// Decisión binaria (presencia/ausencia de la clase objetivo).
    Binary,
    /// Clasificación sobre un conjunto cerrado de clases.
    Multiclass,
    /// Conteo de instancias de la clase objetivo.
    Counting,
    /// Localización con cajas delimitadoras en coordenadas de píxel.
    BoundingBox,
}

/// Violaciones del contrato de configuración detectadas en la frontera.
#[derive(Error, Debug)]
pub enum DetectorContractViolation {
    /// Un umbral por clase referencia una clase fuera de 'class_names'.
    #[error("[L2_DETECTOR_FAULT]: THRESHOLD_CLASS_UNKNOWN -> '{0}' is not a declared class")]
    ThresholdClassUnknown(String),

    /// Un detector visible carece de artefacto de modelo primario.
    #[error("[L2_DETECTOR_FAULT]: PRIMARY_MODEL_VOID -> detector '{0}' has no primary model artifact")]
    PrimaryModelMissing(String),
}

/// Parámetros del motor de detección (filtrado y supresión).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DetectionParams {
    /// Umbral mínimo de confianza para que una caja sobreviva al filtrado.
    /// Distinto del umbral de escalamiento del detector.
    #[serde(default = "DetectionParams::default_min_score")]
    pub min_score_threshold: f32,
    /// Umbral IoU para la supresión de no-máximos por clase.
    #[serde(default = "DetectionParams::default_iou")]
    pub iou_threshold: f32,
    /// Tope de detecciones retenidas tras la supresión.
    #[serde(default = "DetectionParams::default_max_detections")]
    pub max_detections: usize,
}

impl DetectionParams {
    fn default_min_score() -> f32 { 0.25 }
    fn default_iou() -> f32 { 0.45 }
    fn default_max_detections() -> usize { 100 }
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            min_score_threshold: Self::default_min_score(),
            iou_threshold: Self::default_iou(),
            max_detections: Self::default_max_detections(),
        }
    }
}

/// Configuración de la forma de entrada del modelo primario.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ModelInputConfig {
    /// Lado del lienzo cuadrado de letterbox (píxeles).
    #[serde(default = "ModelInputConfig::default_input_width")]
    pub input_width: u32,
}

impl ModelInputConfig {
    fn default_input_width() -> u32 { 640 }
}

impl Default for ModelInputConfig {
    fn default() -> Self {
        Self { input_width: Self::default_input_width() }
    }
}

/// Detector soberano: tarea de detección configurada con sus modelos.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detector {
    /// Identificador único universal (UUID v4) del detector.
    pub identifier: String,

    /// Nombre legible para operadores y plantillas de alerta.
    pub display_name: String,

    /// Grupo organizacional al que pertenece el detector.
    pub group_name: Option<String>,

    /// Texto de consigna que describe la pregunta visual del detector.
    pub query_text: String,

    /// Modo de interpretación de las detecciones.
    pub mode: DetectionMode,

    /// Secuencia ordenada de clases reconocidas; vacía para COCO-80.
    pub class_names: Vec<String>,

    /// Umbral de confianza por debajo del cual la consulta se escala.
    pub confidence_threshold: f32,

    /// Ventana de paciencia (segundos) antes de forzar una decisión.
    pub patience_time_seconds: f32,

    /// Ruta del artefacto del modelo primario en la bóveda de objetos.
    pub primary_model_blob_path: Option<String>,

    /// Ruta del artefacto del clasificador OODD (opcional).
    pub oodd_model_blob_path: Option<String>,

    /// Sello de borrado lógico; un valor no nulo oculta el detector.
    pub deleted_at: Option<DateTime<Utc>>,

    /// Marca de creación en tiempo universal coordinado.
    pub created_at: DateTime<Utc>,
}

impl Detector {
    /// Un detector es visible si su sello de borrado lógico es nulo.
    pub fn is_visible(&self) -> bool {
        self.deleted_at.is_none()
    }

    /**
     * Certifica el invariante de inferencia: todo detector visible
     * referenciado para inferencia debe poseer un modelo primario.
     */
    pub fn require_primary_model(&self) -> Result<&str, DetectorContractViolation> {
        self.primary_model_blob_path
            .as_deref()
            .filter(|path| !path.is_empty())
            .ok_or_else(|| DetectorContractViolation::PrimaryModelMissing(self.identifier.clone()))
    }
}

/// Registro extendido de configuración (propiedad exclusiva del detector).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DetectorConfig {
    /// Detector propietario de esta configuración.
    pub detector_identifier: String,

    /// Umbrales de confianza por clase; las llaves deben ser subconjunto
    /// de 'class_names' del detector propietario.
    #[serde(default)]
    pub per_class_thresholds: HashMap<String, f32>,

    /// Parámetros del motor de detección.
    #[serde(default)]
    pub detection_params: DetectionParams,

    /// Configuración de la forma de entrada del modelo.
    #[serde(default)]
    pub model_input_config: ModelInputConfig,

    /// Habilita la inferencia local en el nodo edge para este detector.
    #[serde(default)]
    pub edge_inference_enabled: bool,
}

impl DetectorConfig {
    /**
     * Valida el invariante de subconjunto de umbrales por clase.
     *
     * # Errors:
     * - `ThresholdClassUnknown`: Si una llave no pertenece a 'class_names'.
     */
    pub fn validate_thresholds(&self, class_names: &[String]) -> Result<(), DetectorContractViolation> {
        for threshold_class in self.per_class_thresholds.keys() {
            if !class_names.iter().any(|declared| declared == threshold_class) {
                return Err(DetectorContractViolation::ThresholdClassUnknown(threshold_class.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forge_detector() -> Detector {
        Detector {
            identifier: "det-alpha".into(),
            display_name: "Fire Watch".into(),
            group_name: None,
            query_text: "Is there a fire?".into(),
            mode: DetectionMode::BoundingBox,
            class_names: vec!["fire".into(), "smoke".into()],
            confidence_threshold: 0.5,
            patience_time_seconds: 30.0,
            primary_model_blob_path: Some("models/det-alpha/primary/model.onnx".into()),
            oodd_model_blob_path: None,
            deleted_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn certify_primary_model_invariant() {
        let mut detector = forge_detector();
        assert!(detector.require_primary_model().is_ok());

        detector.primary_model_blob_path = None;
        assert!(matches!(
            detector.require_primary_model(),
            Err(DetectorContractViolation::PrimaryModelMissing(_))
        ));
    }

    #[test]
    fn certify_threshold_subset_invariant() {
        let detector = forge_detector();
        let mut config = DetectorConfig {
            detector_identifier: detector.identifier.clone(),
            ..DetectorConfig::default()
        };
        config.per_class_thresholds.insert("fire".into(), 0.6);
        assert!(config.validate_thresholds(&detector.class_names).is_ok());

        config.per_class_thresholds.insert("phantom".into(), 0.4);
        assert!(matches!(
            config.validate_thresholds(&detector.class_names),
            Err(DetectorContractViolation::ThresholdClassUnknown(class)) if class == "phantom"
        ));
    }

    #[test]
    fn certify_unknown_config_fields_rejected() {
        let hostile_payload = r#"{"min_score_threshold": 0.2, "phantom_knob": true}"#;
        let outcome = serde_json::from_str::<DetectionParams>(hostile_payload);
        assert!(outcome.is_err(), "Unknown configuration fields must be rejected at the boundary.");
    }
}
