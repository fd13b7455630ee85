// [libs/domain/models/src/query.rs]
/*!
 * =================================================================
 * APARATO: QUERY LIFECYCLE MODELS (V4.1 - FLATTENED AGGREGATES)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CONTRATOS DEL CICLO DE VIDA DE CONSULTAS Y REVISIÓN
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. FLAT AGGREGATES: Los registros Query/Escalation/Feedback/Annotation
 *    son valores planos con llaves foráneas explícitas; sin navegación
 *    perezosa entre agregados (erradicación del ciclo ORM heredado).
 * 2. NULLABLE DETECTOR: 'detector_identifier' es opcional para soportar
 *    sesiones de vocabulario abierto.
 * 3. CLOSED STATUS MACHINE: PENDING → DONE | ESCALATED | ERROR.
 *
 * # Mathematical Proof (Ground Truth Reconciliation):
 * is_correct ⟺ lowercase(result_label) == lowercase(ground_truth).
 * La función 'reconcile_ground_truth' es la única autoridad de cómputo
 * de esa equivalencia en todo el monorepo.
 * =================================================================
 */

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::inference::Detection;

/// Estados cerrados del ciclo de vida de una consulta.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryStatus {
    /// Creada y a la espera de inferencia (síncrona o por cola).
    Pending,
    /// Inferencia completada con un veredicto registrado.
    Done,
    /// Confianza insuficiente; derivada a revisión humana o de nube.
    Escalated,
    /// La inferencia colapsó; el mensaje subyacente viaja al llamador.
    Error,
}

/// Consulta soberana: una imagen sometida a un detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    /// Identificador único universal (UUID v4) de la consulta.
    pub identifier: String,

    /// Detector objetivo; None en sesiones de vocabulario abierto.
    pub detector_identifier: Option<String>,

    /// Ruta persistida del blob de imagen ('{container}/{name}').
    pub image_blob_path: String,

    /// Estado vigente de la máquina de estados.
    pub status: QueryStatus,

    /// Etiqueta de la detección de máxima confianza ('nothing' si vacío).
    pub result_label: Option<String>,

    /// Confianza del veredicto primario.
    pub confidence: Option<f32>,

    /// Secuencia ordenada de detecciones en coordenadas originales.
    #[serde(default)]
    pub detections: Vec<Detection>,

    /// true si la pasada se resolvió con inferencia local/edge.
    pub local_inference: bool,

    /// true si la consulta fue derivada por baja confianza o a petición.
    pub escalated: bool,

    /// Etiqueta de verdad de terreno asignada por un revisor.
    pub ground_truth: Option<String>,

    /// Veredicto de corrección tras la reconciliación de verdad de terreno.
    pub is_correct: Option<bool>,

    /// Revisor que selló la verdad de terreno.
    pub reviewed_by: Option<String>,

    /// Marca temporal del sellado de revisión.
    pub reviewed_at: Option<DateTime<Utc>>,

    /// Marca de creación en tiempo universal coordinado.
    pub created_at: DateTime<Utc>,
}

impl Query {
    /**
     * Reconciliación de verdad de terreno (autoridad única).
     *
     * # Logic:
     * Sella 'ground_truth', computa 'is_correct' por comparación
     * insensible a mayúsculas contra 'result_label' y estampa el revisor.
     */
    pub fn reconcile_ground_truth(&mut self, ground_truth: &str, reviewer_identifier: &str) {
        self.ground_truth = Some(ground_truth.to_string());
        self.is_correct = self.result_label.as_deref().map(|predicted| {
            predicted.to_lowercase() == ground_truth.to_lowercase()
        });
        self.reviewed_by = Some(reviewer_identifier.to_string());
        self.reviewed_at = Some(Utc::now());
    }
}

/// Derivación de una consulta de baja confianza a revisión.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Escalation {
    /// Identificador único de la derivación.
    pub identifier: String,
    /// Referencia débil a la consulta origen.
    pub query_identifier: String,
    /// Motivo de texto libre ('Low confidence (0.30)').
    pub reason: String,
    /// true una vez que un revisor cerró la derivación.
    pub resolved: bool,
    /// Marca de creación.
    pub created_at: DateTime<Utc>,
}

/// Decisión de un revisor humano sobre una consulta.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    /// Identificador único del registro de retroalimentación.
    pub identifier: String,
    /// Consulta evaluada.
    pub query_identifier: String,
    /// Revisor emisor, si se conoce.
    pub reviewer_identifier: Option<String>,
    /// Etiqueta decidida por el revisor.
    pub label: String,
    /// Confianza humana opcional.
    pub confidence: Option<f32>,
    /// Notas libres del revisor.
    pub notes: Option<String>,
    /// Conteo de instancias para detectores en modo COUNTING.
    pub count: Option<i64>,
    /// Marca de creación.
    pub created_at: DateTime<Utc>,
}

/// Anotación de imagen asociada a una consulta (objetivo de cascada).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
    /// Identificador único de la anotación.
    pub identifier: String,
    /// Consulta anotada.
    pub query_identifier: String,
    /// Carga de anotación serializada (geometrías, etiquetas).
    pub payload_json: String,
    /// Marca de creación.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forge_query(result_label: Option<&str>) -> Query {
        Query {
            identifier: "q-1".into(),
            detector_identifier: Some("det-alpha".into()),
            image_blob_path: "images/queries/det-alpha/frame.jpg".into(),
            status: QueryStatus::Done,
            result_label: result_label.map(|s| s.to_string()),
            confidence: Some(0.9),
            detections: Vec::new(),
            local_inference: true,
            escalated: false,
            ground_truth: None,
            is_correct: None,
            reviewed_by: None,
            reviewed_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn certify_ground_truth_case_insensitive_parity() {
        let mut query = forge_query(Some("FIRE"));
        query.reconcile_ground_truth("fire", "reviewer-7");

        assert_eq!(query.is_correct, Some(true));
        assert_eq!(query.reviewed_by.as_deref(), Some("reviewer-7"));
        assert!(query.reviewed_at.is_some());
    }

    #[test]
    fn certify_ground_truth_mismatch() {
        let mut query = forge_query(Some("smoke"));
        query.reconcile_ground_truth("fire", "reviewer-7");
        assert_eq!(query.is_correct, Some(false));
    }

    #[test]
    fn certify_ground_truth_without_result_is_indeterminate() {
        let mut query = forge_query(None);
        query.reconcile_ground_truth("fire", "reviewer-7");
        assert_eq!(query.is_correct, None);
    }

    #[test]
    fn certify_status_wire_discriminators() {
        assert_eq!(serde_json::to_string(&QueryStatus::Pending).unwrap(), "\"PENDING\"");
        assert_eq!(serde_json::to_string(&QueryStatus::Escalated).unwrap(), "\"ESCALATED\"");
        assert!(serde_json::from_str::<QueryStatus>("\"LIMBO\"").is_err());
    }
}
