// [apps/orchestrator/src/handlers/demo.rs]
/*!
 * =================================================================
 * APARATO: DEMO SESSION HANDLER (V5.2 - SHOWCASE SURFACE)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: ARRANQUE, PARADA Y VISTA PREVIA DE SESIONES DE DEMO
 * =================================================================
 */

use crate::errors::PipelineError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use intellioptics_domain_models::demo::{CaptureMode, DemoSession, DemoSessionStatus};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

/// Payload de configuración de una sesión nueva.
#[derive(Debug, Deserialize)]
pub struct StartSessionPayload {
    source_url: String,
    #[serde(default = "StartSessionPayload::default_capture_mode")]
    capture_mode: CaptureMode,
    #[serde(default)]
    detector_ids: Vec<String>,
    yoloworld_prompts: Option<String>,
    #[serde(default = "StartSessionPayload::default_polling_interval")]
    polling_interval_ms: u64,
    #[serde(default = "StartSessionPayload::default_motion_threshold")]
    motion_threshold: f32,
}

impl StartSessionPayload {
    fn default_capture_mode() -> CaptureMode { CaptureMode::Polling }
    fn default_polling_interval() -> u64 { 2_000 }
    fn default_motion_threshold() -> f32 { 500.0 }
}

/**
 * Endpoint: POST /api/v1/demo/sessions
 * Cristaliza la sesión y engancha su worker de captura supervisado.
 */
#[instrument(skip(state, payload))]
pub async fn handle_start_session(
    State(state): State<AppState>,
    Json(payload): Json<StartSessionPayload>,
) -> Result<impl IntoResponse, PipelineError> {
    if payload.source_url.trim().is_empty() {
        return Err(PipelineError::BadInput("Empty source_url".to_string()));
    }

    let has_prompts = payload
        .yoloworld_prompts
        .as_deref()
        .is_some_and(|prompts| !prompts.trim().is_empty());
    if payload.detector_ids.is_empty() && !has_prompts {
        return Err(PipelineError::BadInput(
            "A session requires target detectors or open-vocabulary prompts".to_string(),
        ));
    }

    // Validación de visibilidad de los detectores objetivo.
    for detector_identifier in &payload.detector_ids {
        state.detector_repository.fetch_visible_detector(detector_identifier).await?;
    }

    let session = DemoSession {
        identifier: Uuid::new_v4().to_string(),
        source_url: payload.source_url,
        capture_mode: payload.capture_mode,
        detector_identifiers: payload.detector_ids,
        yoloworld_prompts: payload.yoloworld_prompts,
        status: DemoSessionStatus::Active,
        total_frames_captured: 0,
        total_detections: 0,
        polling_interval_ms: payload.polling_interval_ms.max(1),
        motion_threshold: payload.motion_threshold,
        created_at: Utc::now(),
    };

    state.demo_repository.create_session(&session).await?;
    state
        .demo_supervisor
        .start_session(state.clone(), session.clone())
        .await;

    info!("🎬 [DEMO_HANDLER]: Session {} engaged in {:?} mode.", session.identifier, session.capture_mode);
    Ok((StatusCode::CREATED, Json(session)))
}

/**
 * Endpoint: POST /api/v1/demo/sessions/:id/stop
 */
#[instrument(skip(state))]
pub async fn handle_stop_session(
    State(state): State<AppState>,
    Path(session_identifier): Path<String>,
) -> Result<impl IntoResponse, PipelineError> {
    // La existencia de la sesión gobierna el 404.
    state.demo_repository.fetch_session(&session_identifier).await?;

    state
        .demo_repository
        .seal_session_status(&session_identifier, DemoSessionStatus::Stopped)
        .await?;
    state.demo_supervisor.stop_session(&session_identifier).await;

    Ok(StatusCode::NO_CONTENT)
}

/// Endpoint: GET /api/v1/demo/sessions/:id
#[instrument(skip(state))]
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(session_identifier): Path<String>,
) -> Result<impl IntoResponse, PipelineError> {
    let session = state.demo_repository.fetch_session(&session_identifier).await?;
    let is_live = state.demo_supervisor.is_active(&session_identifier).await;

    let mut body = serde_json::to_value(&session).unwrap_or_default();
    if let Some(object_body) = body.as_object_mut() {
        object_body.insert("worker_live".to_string(), json!(is_live));
    }

    Ok(Json(body))
}

/**
 * Endpoint: GET /api/v1/demo/sessions/:id/frame
 * Último frame JPEG capturado (vista previa).
 */
#[instrument(skip(state))]
pub async fn handle_latest_frame(
    State(state): State<AppState>,
    Path(session_identifier): Path<String>,
) -> Result<impl IntoResponse, PipelineError> {
    match state.demo_supervisor.latest_frame(&session_identifier).await {
        Some(jpeg_bytes) => Ok((
            StatusCode::OK,
            [(header::CONTENT_TYPE, "image/jpeg")],
            jpeg_bytes,
        )),
        None => Err(PipelineError::Persistence(
            intellioptics_infra_db::DbError::not_found("demo_frame", session_identifier),
        )),
    }
}
