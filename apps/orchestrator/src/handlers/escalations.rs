// [apps/orchestrator/src/handlers/escalations.rs]
/*!
 * =================================================================
 * APARATO: ESCALATION REVIEW HANDLER (V5.0 - RESOLUTION SEAL)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: CIERRE DE DERIVACIONES POR REVISORES
 * =================================================================
 */

use crate::errors::PipelineError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::{info, instrument};

/**
 * Endpoint: POST /api/v1/escalations/:id/resolve
 */
#[instrument(skip(state))]
pub async fn handle_resolve_escalation(
    State(state): State<AppState>,
    Path(escalation_identifier): Path<String>,
) -> Result<impl IntoResponse, PipelineError> {
    state.query_repository.resolve_escalation(&escalation_identifier).await?;

    info!("✅ [ESCALATIONS]: Escalation {} resolved by reviewer.", escalation_identifier);
    Ok(StatusCode::NO_CONTENT)
}
