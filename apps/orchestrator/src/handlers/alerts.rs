// [apps/orchestrator/src/handlers/alerts.rs]
/*!
 * =================================================================
 * APARATO: DETECTOR ALERT HANDLER (V5.1 - HERALD SURFACE)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: CONFIGURACIÓN DE ALERTADO Y RECONOCIMIENTO DE ALERTAS
 * =================================================================
 */

use crate::errors::PipelineError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use intellioptics_domain_models::alert::DetectorAlertConfig;
use serde::Deserialize;
use tracing::{info, instrument};

/**
 * Endpoint: PUT /api/v1/detectors/:id/alert-config
 * Sella la configuración de alertado de un detector.
 */
#[instrument(skip(state, config))]
pub async fn handle_put_alert_config(
    State(state): State<AppState>,
    Path(detector_identifier): Path<String>,
    Json(mut config): Json<DetectorAlertConfig>,
) -> Result<impl IntoResponse, PipelineError> {
    // La visibilidad del detector gobierna el 404/409.
    state.detector_repository.fetch_visible_detector(&detector_identifier).await?;

    config.detector_identifier = detector_identifier;
    config.consecutive_count = config.consecutive_count.max(1);
    state.alert_repository.upsert_alert_config(&config).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Endpoint: GET /api/v1/detectors/:id/alert-config
#[instrument(skip(state))]
pub async fn handle_get_alert_config(
    State(state): State<AppState>,
    Path(detector_identifier): Path<String>,
) -> Result<impl IntoResponse, PipelineError> {
    match state.alert_repository.fetch_alert_config(&detector_identifier).await? {
        Some(config) => Ok(Json(config)),
        None => Err(PipelineError::Persistence(
            intellioptics_infra_db::DbError::not_found("detector_alert_config", detector_identifier),
        )),
    }
}

/// Payload de reconocimiento de una alerta.
#[derive(Debug, Deserialize)]
pub struct AcknowledgePayload {
    #[serde(default = "AcknowledgePayload::default_operator")]
    operator: String,
}

impl AcknowledgePayload {
    fn default_operator() -> String { "operator".to_string() }
}

/**
 * Endpoint: POST /api/v1/alerts/:id/acknowledge
 */
#[instrument(skip(state, payload))]
pub async fn handle_acknowledge_alert(
    State(state): State<AppState>,
    Path(alert_identifier): Path<String>,
    Json(payload): Json<AcknowledgePayload>,
) -> Result<impl IntoResponse, PipelineError> {
    state
        .alert_repository
        .acknowledge(&alert_identifier, &payload.operator)
        .await?;

    info!("👁️ [ALERTS]: Alert {} acknowledged by {}.", alert_identifier, payload.operator);
    Ok(StatusCode::NO_CONTENT)
}
