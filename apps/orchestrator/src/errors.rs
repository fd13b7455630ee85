// [apps/orchestrator/src/errors.rs]
/*!
 * =================================================================
 * APARATO: PIPELINE ERROR CATALOG (V5.1 - HTTP TRIAGE)
 * CLASIFICACIÓN: APPLICATION LAYER (ESTRATO L1-APP)
 * RESPONSABILIDAD: TAXONOMÍA DE FALLOS DEL PLANO DE CONTROL Y SU TRIAJE HTTP
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. TAXONOMY SEAL: Entidad ausente → 404; borrado lógico → 409;
 *    entrada hostil → 400; bóveda → 500 abortivo; inferencia → 500 con
 *    el mensaje subyacente; cola → 500 solo en el camino async puro.
 * 2. SIDE-EFFECT IMMUNITY: Los efectos laterales (alertas, encolado
 *    redundante) JAMÁS portan esta taxonomía hacia el llamador.
 * =================================================================
 */

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use intellioptics_infra_db::DbError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Fallos del pipeline de consultas y sus superficies.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Fallo del sustrato de persistencia (porta su propio triaje).
    #[error(transparent)]
    Persistence(#[from] DbError),

    /// Fallo abortivo de la bóveda de objetos.
    #[error("[L1_PIPELINE_FAULT]: STORAGE_FAILURE -> {0}")]
    Storage(#[from] intellioptics_infra_blob_vault::VaultError),

    /// Fallo del broker en el camino asíncrono puro.
    #[error("[L1_PIPELINE_FAULT]: QUEUE_FAILURE -> {0}")]
    Queue(#[from] intellioptics_infra_queue::QueueError),

    /// El worker de inferencia rechazó o colapsó la pasada.
    #[error("[L1_PIPELINE_FAULT]: INFERENCE_FAILURE -> {0}")]
    Inference(String),

    /// Entrada hostil del llamador (multipart incompleto, imagen vacía).
    #[error("[L1_PIPELINE_FAULT]: BAD_INPUT -> {0}")]
    BadInput(String),
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = match &self {
            PipelineError::Persistence(DbError::RecordNotFound { .. }) => StatusCode::NOT_FOUND,
            PipelineError::Persistence(DbError::SoftDeleted { .. }) => StatusCode::CONFLICT,
            PipelineError::BadInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("💥 [PIPELINE]: {}", self);
        }

        (status, Json(json!({"error": self.to_string()}))).into_response()
    }
}
