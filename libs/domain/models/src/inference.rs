// [libs/domain/models/src/inference.rs]
/*!
 * =================================================================
 * APARATO: INFERENCE WIRE CONTRACTS (V4.2 - WIRE PARITY)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: GRAMÁTICA DE DETECCIONES, VEREDICTOS OODD Y SOBRES DE COLA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. WIRE SOVEREIGNTY: Estas estructuras son el contrato exacto del
 *    endpoint POST /infer y de las colas de mensajería; cualquier deriva
 *    rompe la paridad entre el plano de control y el worker.
 * 2. OODD AS VALUE: El veredicto OODD viaja como valor opcional dentro del
 *    reporte, erradicando el control de flujo por excepciones del legado.
 * 3. NOMINAL PRECISION: Nomenclatura nominal absoluta.
 *
 * # Mathematical Proof (Confidence Attenuation):
 * Cuando el veredicto OODD es fuera-de-dominio, cada detección persiste
 * 'confidence * multiplier' con 'oodd_adjusted = true'. Esa convención
 * por-detección es la autoritativa para resultados persistidos; el campo
 * 'oodd_result' del reporte transporta el veredicto crudo para auditoría.
 * =================================================================
 */

use serde::{Deserialize, Serialize};
use crate::detector::{DetectionMode, DetectionParams, ModelInputConfig};
use std::collections::HashMap;

/// Detección individual en coordenadas de píxel de la imagen original.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Detection {
    /// Etiqueta de clase mapeada ('fire', 'person', 'class_93'...).
    pub label: String,
    /// Confianza en [0, 1], posiblemente atenuada por el veredicto OODD.
    pub confidence: f32,
    /// Caja delimitadora [x1, y1, x2, y2] recortada a la imagen original.
    pub bbox: [f32; 4],
    /// Sello de atenuación: true si la confianza fue multiplicada por OODD.
    #[serde(default)]
    pub oodd_adjusted: bool,
}

/// Veredicto del clasificador de dominio (Out-Of-Domain Detector).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct OoddVerdict {
    /// Puntuación de pertenencia al dominio en [0, 1].
    pub in_domain_score: f32,
    /// true si la puntuación alcanza el umbral calibrado (igualdad incluida).
    pub is_in_domain: bool,
    /// Multiplicador de atenuación de confianza para el estrato primario.
    pub confidence_adjustment: f32,
    /// Umbral calibrado vigente en el momento del veredicto.
    pub calibrated_threshold: f32,
}

/// Metadatos del ensamblaje de modelos utilizado en la pasada.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Ruta del artefacto primario en la bóveda.
    pub primary_model: String,
    /// Ruta del artefacto OODD si estaba configurado y cargó.
    pub oodd_model: Option<String>,
    /// Modo semántico del detector.
    pub mode: DetectionMode,
    /// Lado del lienzo de entrada (píxeles).
    pub input_size: u32,
}

/// Reporte unificado de una invocación completa del despachador.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceReport {
    /// Detecciones finales en coordenadas de la imagen original.
    pub detections: Vec<Detection>,
    /// Latencia medida desde la decodificación hasta el post-proceso.
    pub latency_ms: u64,
    /// Veredicto OODD crudo; None si no hay OODD configurado o no cargó.
    pub oodd_result: Option<OoddVerdict>,
    /// Ensamblaje de modelos utilizado.
    pub model_info: ModelInfo,
}

impl InferenceReport {
    /// Selecciona la detección de máxima confianza, si existe alguna.
    pub fn top_detection(&self) -> Option<&Detection> {
        self.detections.iter().max_by(|left, right| {
            left.confidence.partial_cmp(&right.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    }
}

/**
 * Directivas de inferencia por detector (parte 'config' del multipart).
 *
 * # Logic:
 * Registro tipado explícito: los campos desconocidos se rechazan en la
 * frontera, reemplazando el 'getattr' dinámico del plano de control legado.
 */
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InferenceDirectives {
    /// Detector propietario de la pasada.
    pub detector_id: String,
    /// Ruta del artefacto primario en la bóveda (obligatoria para inferir).
    #[serde(default)]
    pub primary_model_blob_path: Option<String>,
    /// Ruta del artefacto OODD (opcional).
    #[serde(default)]
    pub oodd_model_blob_path: Option<String>,
    /// Clases declaradas del detector; vacío habilita la tabla COCO-80.
    #[serde(default)]
    pub class_names: Vec<String>,
    /// Umbral de escalamiento del detector (default por clase).
    #[serde(default = "InferenceDirectives::default_confidence_threshold")]
    pub confidence_threshold: f32,
    /// Umbrales por clase; llaves ⊆ class_names.
    #[serde(default)]
    pub per_class_thresholds: HashMap<String, f32>,
    /// Parámetros del motor de detección.
    #[serde(default)]
    pub detection_params: DetectionParams,
    /// Configuración de entrada del modelo.
    #[serde(default)]
    pub model_input_config: ModelInputConfig,
    /// Modo semántico del detector.
    #[serde(default = "InferenceDirectives::default_mode")]
    pub mode: DetectionMode,
}

impl InferenceDirectives {
    fn default_confidence_threshold() -> f32 { 0.5 }
    fn default_mode() -> DetectionMode { DetectionMode::BoundingBox }
}

// --- SOBRES DE MENSAJERÍA (ESTRATO DE COLAS) ---

/// Sobre entrante de la cola 'image-queries'.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageQueryEnvelope {
    /// Identificador de la consulta de imagen a resolver.
    pub image_query_id: String,
    /// URL del blob de imagen; con '?' transporta credenciales embebidas.
    pub blob_url: String,
}

/// Sobre saliente hacia la cola 'inference-results'.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceResultEnvelope {
    /// Identificador de la consulta resuelta.
    pub image_query_id: String,
    /// Bandera de éxito de la pasada.
    pub ok: bool,
    /// Reporte de inferencia completo.
    pub result: InferenceReport,
    /// Latencia extremo a extremo del procesamiento del mensaje.
    pub latency_ms: u64,
}

/// Sobre de la cola de fallback para consultas escaladas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackEnvelope {
    /// Consulta escalada que requiere resolución en la nube.
    pub query_id: String,
    /// Detector propietario.
    pub detector_id: String,
    /// Ruta persistida del blob de imagen ('{container}/{name}').
    pub blob_path: String,
    /// Token opaco que autoriza al worker de nube ante el plano de control.
    pub fallback_token: String,
}
