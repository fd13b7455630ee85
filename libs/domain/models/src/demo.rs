// [libs/domain/models/src/demo.rs]
/*!
 * =================================================================
 * APARATO: DEMO SESSION MODELS (V4.0 - SUPERVISED CAPTURE)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CONTRATOS DE SESIONES DE CAPTURA SUPERVISADA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SUPERVISED TASK MAP: La sesión es un valor observable; el worker de
 *    captura vive en el supervisor del Orchestrator con token de parada.
 * 2. OPEN VOCABULARY: Una sesión sin detectores y con 'yoloworld_prompts'
 *    rutea sus frames al endpoint de vocabulario abierto.
 * =================================================================
 */

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::query::QueryStatus;

/// Modo de compuerta de captura de la sesión.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    /// Captura a intervalo fijo derivado de 'polling_interval_ms'.
    Polling,
    /// Captura a 1 fps con compuerta de movimiento por diferencia media.
    Motion,
    /// Captura disparada manualmente por el operador.
    Manual,
    /// Captura ruteada al endpoint de vocabulario abierto.
    Yoloworld,
}

/// Estado observable de la sesión.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DemoSessionStatus {
    /// Worker de captura vivo y emitiendo frames.
    Active,
    /// Detenida cooperativamente; el buffer de frame fue liberado.
    Stopped,
    /// El worker colapsó durante el arranque o la captura.
    Error,
}

/// Sesión de captura configurada.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoSession {
    /// Identificador único universal de la sesión.
    pub identifier: String,
    /// URL de la fuente (stream en vivo, HLS o 'mock://' para pruebas).
    pub source_url: String,
    /// Compuerta de captura vigente.
    pub capture_mode: CaptureMode,
    /// Detectores objetivo; vacío para sesiones de vocabulario abierto.
    #[serde(default)]
    pub detector_identifiers: Vec<String>,
    /// Prompts separados por comas para el modo de vocabulario abierto.
    pub yoloworld_prompts: Option<String>,
    /// Estado observable vigente.
    pub status: DemoSessionStatus,
    /// Contador atómico de frames capturados.
    pub total_frames_captured: u64,
    /// Contador atómico de detecciones finalizadas.
    pub total_detections: u64,
    /// Intervalo de sondeo en milisegundos (modo polling).
    pub polling_interval_ms: u64,
    /// Umbral de la compuerta de movimiento (modo motion).
    pub motion_threshold: f32,
    /// Marca de creación.
    pub created_at: DateTime<Utc>,
}

impl DemoSession {
    /// Frecuencia de captura derivada de la compuerta configurada.
    pub fn capture_fps(&self) -> f64 {
        match self.capture_mode {
            CaptureMode::Polling => 1000.0 / self.polling_interval_ms.max(1) as f64,
            _ => 1.0,
        }
    }

    /// true si la sesión rutea al endpoint de vocabulario abierto.
    pub fn is_open_vocabulary(&self) -> bool {
        self.detector_identifiers.is_empty()
            && self.yoloworld_prompts.as_deref().is_some_and(|p| !p.trim().is_empty())
    }
}

/// Resultado de detección por frame y por detector dentro de una sesión.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoDetectionResult {
    /// Identificador único del resultado.
    pub identifier: String,
    /// Sesión propietaria.
    pub session_identifier: String,
    /// Consulta creada para el frame.
    pub query_identifier: String,
    /// Detector objetivo; None en modo vocabulario abierto.
    pub detector_identifier: Option<String>,
    /// Número de frame dentro de la sesión.
    pub frame_number: u64,
    /// Compuerta bajo la cual se capturó el frame.
    pub capture_method: CaptureMode,
    /// Estado del procesamiento del resultado.
    pub status: QueryStatus,
    /// Marca de creación.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn certify_capture_fps_derivation() {
        let session = DemoSession {
            identifier: "s-1".into(),
            source_url: "mock://demo".into(),
            capture_mode: CaptureMode::Polling,
            detector_identifiers: vec!["det-alpha".into()],
            yoloworld_prompts: None,
            status: DemoSessionStatus::Active,
            total_frames_captured: 0,
            total_detections: 0,
            polling_interval_ms: 2_000,
            motion_threshold: 500.0,
            created_at: Utc::now(),
        };

        assert!((session.capture_fps() - 0.5).abs() < f64::EPSILON);
        assert!(!session.is_open_vocabulary());
    }

    #[test]
    fn certify_open_vocabulary_detection() {
        let session = DemoSession {
            identifier: "s-2".into(),
            source_url: "mock://demo".into(),
            capture_mode: CaptureMode::Yoloworld,
            detector_identifiers: Vec::new(),
            yoloworld_prompts: Some("person, forklift".into()),
            status: DemoSessionStatus::Active,
            total_frames_captured: 0,
            total_detections: 0,
            polling_interval_ms: 2_000,
            motion_threshold: 500.0,
            created_at: Utc::now(),
        };

        assert!(session.is_open_vocabulary());
    }
}
