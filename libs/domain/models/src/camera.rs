// [libs/domain/models/src/camera.rs]
/*!
 * =================================================================
 * APARATO: CAMERA SURVEILLANCE MODELS (V4.0 - INSPECTION ALIGNED)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CONTRATOS DE CÁMARAS, SALUD, RONDAS DE INSPECCIÓN Y ALERTAS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. BASELINE DISCIPLINE: Cada cámara referencia su imagen de línea base
 *    contra la cual se mide el cambio de vista (SSIM + rasgos ORB).
 * 2. INSPECTION LEDGER: 'InspectionRun' agrega cada ciclo con conteos por
 *    estado, sellado al inicio y actualizado al cierre.
 * 3. CLOSED STATES: Estados de cámara y de ronda como variantes cerradas.
 * =================================================================
 */

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// Estado operativo vigente de una cámara.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CameraStatus {
    /// Enlace establecido y frames fluyendo nominalmente.
    Connected,
    /// Conectada pero con FPS caído o latencia excesiva.
    Degraded,
    /// Sin enlace; la conexión falló dentro del timeout.
    Offline,
}

/// Tipos de predicado de alerta emitidos por el inspector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CameraAlertType {
    /// La conexión RTSP falló dentro del timeout.
    Offline,
    /// FPS medido por debajo del umbral proporcional esperado.
    FpsDrop,
    /// Cambio de vista detectado contra la línea base.
    ViewChange,
    /// Degradación de calidad de imagen sostenida.
    QualityDegradation,
    /// Latencia de conexión por encima del umbral.
    NetworkIssue,
}

/// Cámara registrada en el plano de control.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camera {
    /// Identificador único universal de la cámara.
    pub identifier: String,
    /// Hub propietario de la cámara, si está asignada.
    pub hub_identifier: Option<String>,
    /// Nombre legible para operadores y alertas.
    pub display_name: String,
    /// URL RTSP del stream de la cámara.
    pub rtsp_url: String,
    /// Estado vigente reportado por la última inspección.
    pub current_status: CameraStatus,
    /// Puntuación de salud [0, 100] de la última inspección.
    pub health_score: f32,
    /// Ruta del blob de la imagen de línea base ('camera-baselines/{id}.jpg').
    pub baseline_image_path: Option<String>,
    /// Marca de actualización de la línea base.
    pub baseline_updated_at: Option<DateTime<Utc>>,
    /// Bandera de cambio de vista vigente.
    pub view_change_detected: bool,
    /// Marca de creación.
    pub created_at: DateTime<Utc>,
}

/// Muestra de salud: un registro por cámara por ciclo de inspección.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraHealthSample {
    /// Identificador único de la muestra.
    pub identifier: String,
    /// Cámara inspeccionada.
    pub camera_identifier: String,
    /// Estado determinado durante la inspección.
    pub status: CameraStatus,
    /// FPS medido sobre la ventana de muestreo.
    pub fps: f32,
    /// FPS esperado declarado para la cámara.
    pub expected_fps: f32,
    /// Resolución observada ('1920x1080' o 'N/A' si offline).
    pub resolution: String,
    /// Latencia de establecimiento de conexión en milisegundos.
    pub latency_ms: u64,
    /// Brillo medio del frame capturado.
    pub avg_brightness: Option<f32>,
    /// Varianza del Laplaciano del frame capturado (nitidez).
    pub sharpness_score: Option<f32>,
    /// Puntuación SSIM contra la línea base, si existe.
    pub view_similarity_score: Option<f32>,
    /// true si SSIM o el ratio de coincidencia ORB delataron cambio de vista.
    pub view_change_detected: bool,
    /// Marca temporal de la muestra.
    pub recorded_at: DateTime<Utc>,
}

/// Estado de una ronda de inspección.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InspectionRunStatus {
    /// Ronda en curso.
    Running,
    /// Ronda sellada con conteos finales.
    Completed,
}

/// Agregado grueso de un ciclo completo de inspección.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectionRun {
    /// Identificador único de la ronda.
    pub identifier: String,
    /// Estado vigente de la ronda.
    pub status: InspectionRunStatus,
    /// Total de cámaras consideradas en el ciclo.
    pub total_cameras: u32,
    /// Cámaras efectivamente inspeccionadas.
    pub cameras_inspected: u32,
    /// Cámaras con estado 'connected'.
    pub cameras_healthy: u32,
    /// Cámaras con estado 'degraded'.
    pub cameras_warning: u32,
    /// Cámaras offline o con error de inspección.
    pub cameras_failed: u32,
    /// Apertura del ciclo.
    pub started_at: DateTime<Utc>,
    /// Cierre del ciclo, sellado junto con los conteos.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Alerta emitida por el inspector para una cámara concreta.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraAlert {
    /// Identificador único de la alerta.
    pub identifier: String,
    /// Cámara origen.
    pub camera_identifier: String,
    /// Predicado que disparó la alerta.
    pub alert_type: CameraAlertType,
    /// Severidad asignada ('critical' para offline/view_change).
    pub severity: crate::alert::AlertSeverity,
    /// Mensaje descriptivo del evento.
    pub message: String,
    /// Marca de creación.
    pub created_at: DateTime<Utc>,
}

/// Directivas del ciclo de inspección (servidas por el plano de control).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectionDirectives {
    /// Periodo del ciclo completo en minutos.
    pub inspection_interval_minutes: u32,
    /// Umbral SSIM por debajo del cual la vista se considera cambiada.
    pub view_change_threshold: f32,
    /// Fracción del FPS esperado por debajo de la cual se degrada.
    pub fps_drop_threshold_pct: f32,
    /// Latencia de conexión máxima tolerada en milisegundos.
    pub latency_threshold_ms: u64,
    /// Destinatarios de correo para alertas de cámara.
    #[serde(default)]
    pub alert_emails: Vec<String>,
}

impl Default for InspectionDirectives {
    fn default() -> Self {
        Self {
            inspection_interval_minutes: 15,
            view_change_threshold: 0.7,
            fps_drop_threshold_pct: 0.5,
            latency_threshold_ms: 3_000,
            alert_emails: Vec::new(),
        }
    }
}
