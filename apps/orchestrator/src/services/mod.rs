// [apps/orchestrator/src/services/mod.rs]
/*!
 * =================================================================
 * APARATO: APPLICATION SERVICES MATRIX (V5.1 - TOPOLOGY MASTER)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: ORQUESTACIÓN DE SERVICIOS DEL PLANO DE CONTROL
 * =================================================================
 */

// --- ESTRATO 1: CAMINO CALIENTE DE CONSULTAS ---

/// Pipeline soberano de consultas: ingesta → inferencia → persistencia
/// → escalamiento → alertado.
pub mod query_pipeline;

/// Forja y verificación de tokens de fallback.
pub mod token;

// --- ESTRATO 2: ALERTADO (HERALD) ---

/// Motor de alertas por detector: compuertas, cooldown y despacho.
pub mod alert_engine;

// --- ESTRATO 3: SUPERVISIÓN DE CAPTURA ---

/// Supervisor de sesiones de demo con mapa de tareas cancelables.
pub mod demo_sessions;

// --- ESTRATO 4: RESOLUCIÓN ASÍNCRONA ---

/// Relevo de la cola de fallback hacia el worker de inferencia.
pub mod fallback_relay;
