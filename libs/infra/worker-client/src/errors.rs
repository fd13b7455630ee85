// INICIO DEL ARCHIVO [libs/infra/worker-client/src/errors.rs]
//! =================================================================
//! APARATO: UPLINK ERROR CATALOG (V11.0 - SOBERANO)
//! RESPONSABILIDAD: CATALOGACIÓN DE FALLOS DE COMUNICACIÓN
//! =================================================================

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("NETWORK_UNREACHABLE: Failed to reach remote endpoint: {0}")]
    NetworkFault(#[from] reqwest::Error),

    #[error("ENVELOPE_CORRUPTION: Failed to encode request payload: {0}")]
    EncodingFault(#[from] serde_json::Error),

    #[error("COMMAND_REJECTION: Server returned status {0}")]
    ServerRejection(String),
}
// FIN DEL ARCHIVO [libs/infra/worker-client/src/errors.rs]
