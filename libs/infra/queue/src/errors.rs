// [libs/infra/queue/src/errors.rs]
//! =================================================================
//! APARATO: QUEUE ERROR CATALOG (V3.0 - SOBERANO)
//! CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
//! RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DE MENSAJERÍA
//! =================================================================

use thiserror::Error;

/// Fallos semánticos del broker de mensajería.
#[derive(Error, Debug)]
pub enum QueueError {
    /// Fallo de enlace físico con el sustrato de mensajes.
    #[error("[L3_QUEUE_NET_FAULT]: BROKER_UPLINK_SEVERED -> {0}")]
    ConnectionFault(String),

    /// Error de sintaxis o ejecución devuelto por el motor libSQL.
    #[error("[L3_QUEUE_FAULT]: SQL_QUERY_REJECTED -> {0}")]
    QueryFault(#[from] libsql::Error),

    /// El payload del mensaje no decodifica al contrato del consumidor.
    /// Clasificación PERMANENTE: el receptor debe sellarlo como 'dead'.
    #[error("[L3_QUEUE_FAULT]: PAYLOAD_CORRUPTION -> {0}")]
    PayloadCorruption(String),

    /// El arrendamiento expiró antes del acuse; otro receptor lo posee.
    #[error("[L3_QUEUE_FAULT]: LEASE_EXPIRED -> message {0}")]
    LeaseExpired(String),
}
