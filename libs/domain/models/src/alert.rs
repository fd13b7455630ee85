// [libs/domain/models/src/alert.rs]
/*!
 * =================================================================
 * APARATO: DETECTOR ALERT MODELS (V4.0 - HERALD ALIGNED)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CONTRATOS DE CONFIGURACIÓN Y RASTRO HISTÓRICO DE ALERTAS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. CLOSED CONDITIONS: El conjunto de condiciones es el prescrito
 *    (ALWAYS | LABEL_MATCH | CONFIDENCE_ABOVE | CONFIDENCE_BELOW);
 *    las variantes heredadas divergentes quedan erradicadas.
 * 2. MULTI-CHANNEL: Destinos de email, SMS y webhook por configuración.
 * 3. COOLDOWN SOVEREIGNTY: 'cooldown_minutes' gobierna la exclusión mutua
 *    temporal de alertas del mismo detector.
 * =================================================================
 */

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// Condición base evaluada contra el veredicto de la consulta.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertConditionType {
    /// Dispara en cada consulta completada.
    Always,
    /// Dispara cuando la etiqueta iguala el valor configurado (case-fold).
    LabelMatch,
    /// Dispara cuando la confianza alcanza o supera el valor configurado.
    ConfidenceAbove,
    /// Dispara cuando la confianza cae por debajo del valor configurado.
    ConfidenceBelow,
}

/// Severidad visual y de ruteo de la alerta.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Fallo crítico de inspección; ruteo inmediato.
    Critical,
    /// Advertencia de degradación o patrón sospechoso.
    Warning,
    /// Señal informativa.
    Info,
}

impl AlertSeverity {
    /// Forma en mayúsculas para asuntos de correo ('[CRITICAL] ...').
    pub fn as_subject_tag(&self) -> &'static str {
        match self {
            AlertSeverity::Critical => "CRITICAL",
            AlertSeverity::Warning => "WARNING",
            AlertSeverity::Info => "INFO",
        }
    }
}

/// Configuración de alertado propiedad exclusiva de un detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorAlertConfig {
    /// Detector propietario.
    pub detector_identifier: String,

    /// Interruptor maestro del alertado para este detector.
    pub enabled: bool,

    /// Condición base a evaluar.
    pub condition_type: AlertConditionType,

    /// Valor de la condición (etiqueta objetivo o umbral en texto).
    pub condition_value: Option<String>,

    /// Conteo mínimo de coincidencias consecutivas requeridas (≥ 1).
    pub consecutive_count: u32,

    /// Ventana temporal opcional; si es positiva reemplaza el modo consecutivo.
    pub time_window_minutes: Option<u32>,

    /// Destinatarios de correo electrónico.
    #[serde(default)]
    pub alert_emails: Vec<String>,

    /// Destinatarios SMS en formato E.164.
    #[serde(default)]
    pub alert_phones: Vec<String>,

    /// Endpoints webhook que reciben el registro de alerta como JSON.
    #[serde(default)]
    pub alert_webhooks: Vec<String>,

    /// Severidad asignada a las alertas emitidas.
    pub severity: AlertSeverity,

    /// Intervalo mínimo de pared entre dos alertas del mismo detector.
    pub cooldown_minutes: u32,

    /// Plantilla de mensaje con marcadores {detector_name} {label}
    /// {confidence} {camera_name}.
    pub custom_message: Option<String>,

    /// Nombre legible de la alerta para asuntos de correo.
    pub alert_name: Option<String>,

    /// Adjunta la imagen de la detección en el correo HTML.
    #[serde(default = "DetectorAlertConfig::default_include_image")]
    pub include_image: bool,
}

impl DetectorAlertConfig {
    fn default_include_image() -> bool { true }
}

/// Registro histórico inmutable de una alerta disparada.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorAlert {
    /// Identificador único de la alerta.
    pub identifier: String,
    /// Detector emisor.
    pub detector_identifier: String,
    /// Consulta que disparó la alerta, si aplica.
    pub query_identifier: Option<String>,
    /// Severidad sellada en el momento del disparo.
    pub severity: AlertSeverity,
    /// Mensaje compuesto desde la plantilla o el formato por defecto.
    pub message: String,
    /// Etiqueta de la detección disparadora.
    pub detection_label: String,
    /// Confianza de la detección disparadora.
    pub detection_confidence: f32,
    /// Cámara de origen, si la consulta provino de un stream.
    pub camera_name: Option<String>,
    /// Ruta del blob de imagen asociada.
    pub image_blob_path: Option<String>,
    /// true una vez que un operador reconoció la alerta.
    pub acknowledged: bool,
    /// Bandera de entrega de correo.
    pub email_sent: bool,
    /// Bandera de entrega SMS.
    pub sms_sent: bool,
    /// Marca de creación (ancla del cálculo de cooldown).
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn certify_condition_wire_discriminators() {
        assert_eq!(
            serde_json::to_string(&AlertConditionType::ConfidenceAbove).unwrap(),
            "\"CONFIDENCE_ABOVE\""
        );
        // La variante heredada divergente debe quedar fuera del contrato.
        assert!(serde_json::from_str::<AlertConditionType>("\"CONFIDENCE_THRESHOLD\"").is_err());
    }

    #[test]
    fn certify_severity_subject_tags() {
        assert_eq!(AlertSeverity::Critical.as_subject_tag(), "CRITICAL");
        assert_eq!(serde_json::to_string(&AlertSeverity::Warning).unwrap(), "\"warning\"");
    }
}
