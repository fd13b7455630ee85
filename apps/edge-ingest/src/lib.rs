// [apps/edge-ingest/src/lib.rs]
/*!
 * =================================================================
 * APARATO: EDGE INGEST LIBRARY BARREL (V5.0 - SOBERANO)
 * CLASIFICACIÓN: EDGE EXECUTION LAYER (ESTRATO L1-EDGE)
 * RESPONSABILIDAD: EXPOSICIÓN DEL SUPERVISOR Y LOS WORKERS DE STREAM
 * =================================================================
 */

pub mod supervisor;
pub mod stream_worker;

pub use stream_worker::{HealthGateDirectives, StreamDirective, SubmissionMethod};
pub use supervisor::IngestSupervisor;
