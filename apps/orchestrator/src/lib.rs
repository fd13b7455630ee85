// [apps/orchestrator/src/lib.rs]
/*!
 * =================================================================
 * APARATO: ORCHESTRATOR LIBRARY BARREL (V5.0 - SOBERANO)
 * CLASIFICACIÓN: APPLICATION LAYER (ESTRATO L1-APP)
 * RESPONSABILIDAD: EXPOSICIÓN DE KERNEL, ESTADO, RUTAS Y SERVICIOS
 * =================================================================
 */

pub mod errors;
pub mod handlers;
pub mod kernel;
pub mod routes;
pub mod services;
pub mod state;

pub use errors::PipelineError;
pub use state::AppState;
