// [libs/infra/db/src/repositories/mod.rs]
/*!
 * =================================================================
 * APARATO: REPOSITORY ACCESS MATRIX (V4.2 - TOPOLOGY MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: ORQUESTACIÓN DE SUBSISTEMAS DE PERSISTENCIA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. ACCESS SOVEREIGNTY: Centraliza la visibilidad de los repositorios
 *    para la inyección de dependencias en el Orchestrator.
 * 2. VARIANT DISCIPLINE: Los helpers de mapeo de variantes rechazan
 *    valores persistidos fuera del contrato cerrado del dominio.
 *
 * # Mathematical Proof (Modular Encapsulation):
 * El barrel file actúa como interfaz galvánica: solo las estructuras de
 * autoridad (Repositories) se exponen al exterior, reduciendo el
 * acoplamiento sistémico.
 * =================================================================
 */

// --- ESTRATO 1: DETECCIÓN (TACTICAL) ---

/// Gestión de detectores, configuración extendida y borrado lógico.
pub mod detector;
/// Ciclo de vida de consultas, derivaciones, feedback y cascada.
pub mod query;

// --- ESTRATO 2: ALERTADO (HERALD) ---

/// Configuración de alertas, rastro histórico y cooldown.
pub mod alert;

// --- ESTRATO 3: VIGILANCIA DE CÁMARAS (PANOPTIC) ---

/// Cámaras, muestras de salud, rondas de inspección y alertas de cámara.
pub mod camera;

// --- ESTRATO 4: SESIONES DE DEMO (SHOWCASE) ---

/// Sesiones de captura supervisada y resultados por frame.
pub mod demo;

// --- RE-EXPORTACIONES SOBERANAS (NOMINAL ACCESS API) ---

pub use alert::AlertRepository;
pub use camera::CameraRepository;
pub use demo::DemoRepository;
pub use detector::DetectorRepository;
pub use query::QueryRepository;

use crate::errors::DbError;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Serializa una variante cerrada a su forma de texto cableada.
pub(crate) fn variant_to_text<T: Serialize>(variant: &T) -> String {
    serde_json::to_value(variant)
        .ok()
        .and_then(|value| value.as_str().map(str::to_string))
        .unwrap_or_default()
}

/// Reconstruye una variante cerrada desde texto persistido.
/// Un valor hostil se rechaza como 'UnknownVariant'.
pub(crate) fn text_to_variant<T: DeserializeOwned>(
    column: &'static str,
    persisted_value: &str,
) -> Result<T, DbError> {
    serde_json::from_value(serde_json::Value::String(persisted_value.to_string()))
        .map_err(|_| DbError::UnknownVariant { column, value: persisted_value.to_string() })
}

/// Reconstruye una marca temporal RFC 3339 persistida.
pub(crate) fn text_to_timestamp(
    column: &'static str,
    persisted_value: &str,
) -> Result<chrono::DateTime<chrono::Utc>, DbError> {
    chrono::DateTime::parse_from_rfc3339(persisted_value)
        .map(|stamp| stamp.with_timezone(&chrono::Utc))
        .map_err(|fault| DbError::MappingError(format!("{}: {}", column, fault)))
}
