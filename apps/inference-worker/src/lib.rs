// [apps/inference-worker/src/lib.rs]
/*!
 * =================================================================
 * APARATO: INFERENCE WORKER LIBRARY BARREL (V5.0 - SOBERANO)
 * CLASIFICACIÓN: WORKER EXECUTION LAYER (ESTRATO L1-WORKER)
 * RESPONSABILIDAD: EXPOSICIÓN DE MOTOR, SUPERFICIE HTTP Y CONSUMIDOR
 * =================================================================
 */

pub mod consumer;
pub mod engine;
pub mod errors;
pub mod http;

pub use engine::{EngineDirectives, InferenceEngine, IoMode};
pub use errors::DispatchError;
