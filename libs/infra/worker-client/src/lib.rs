// INICIO DEL ARCHIVO [libs/infra/worker-client/src/lib.rs]
/*!
 * =================================================================
 * APARATO: WORKER CLIENT LIBRARY BARREL (V11.0 - DUAL UPLINK)
 * CLASIFICACIÓN: INFRASTRUCTURE LIB (ESTRATO L3)
 * RESPONSABILIDAD: EXPOSICIÓN PÚBLICA DE MÓDULOS DE UPLINK
 *
 * VISION HIPER-HOLÍSTICA:
 * Centraliza la exportación de los dos túneles del plano de datos:
 * el uplink de inferencia (worker ONNX) y el uplink del plano de
 * control (API del orchestrator para edge e inspector).
 * =================================================================
 */

pub mod client;
pub mod control_plane;
pub mod errors;

// Re-exportaciones para el consumo en apps/edge-ingest y apps/camera-inspector
pub use client::InferenceWorkerClient;
pub use control_plane::ControlPlaneClient;
pub use errors::ClientError;
// FIN DEL ARCHIVO [libs/infra/worker-client/src/lib.rs]
