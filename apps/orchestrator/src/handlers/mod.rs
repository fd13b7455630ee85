// [apps/orchestrator/src/handlers/mod.rs]
/*!
 * =================================================================
 * APARATO: HANDLER ACCESS MATRIX (V5.0 - TOPOLOGY MASTER)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: ORQUESTACIÓN DE MANEJADORES HTTP DEL PLANO DE CONTROL
 * =================================================================
 */

/// Ciclo de vida de consultas: sumisión, listado, revisión y cascada.
pub mod queries;

/// Configuración de alertado y reconocimiento de alertas de detector.
pub mod alerts;

/// Resolución de derivaciones por revisores.
pub mod escalations;

/// Sesiones de demo supervisadas y vista previa de frames.
pub mod demo;

/// API de inspección consumida por el inspector de cámaras.
pub mod inspection;
