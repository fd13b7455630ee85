// [apps/orchestrator/src/handlers/inspection.rs]
/*!
 * =================================================================
 * APARATO: CAMERA INSPECTION HANDLER (V5.3 - PANOPTIC SURFACE)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: API DE FLOTA DE CÁMARAS CONSUMIDA POR EL INSPECTOR
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. STATUS PROJECTION: Cada muestra de salud proyecta el estado y la
 *    puntuación vigentes sobre la cámara (offline→0, degraded→60,
 *    connected→95, con deducción de 30 ante cambio de vista).
 * 2. EMAIL RELAY: Las alertas de cámara reportadas se despachan por
 *    correo a los destinatarios de inspección (mejor esfuerzo).
 * =================================================================
 */

use crate::errors::PipelineError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use intellioptics_domain_models::camera::{
    Camera, CameraAlert, CameraHealthSample, CameraStatus, InspectionDirectives,
};
use intellioptics_infra_notify::email::render_alert_email_html;
use serde::Deserialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Payload de registro de una cámara en la flota.
#[derive(Debug, Deserialize)]
pub struct RegisterCameraPayload {
    display_name: String,
    rtsp_url: String,
    hub_identifier: Option<String>,
}

/// Endpoint: POST /api/v1/cameras (alta de flota)
#[instrument(skip(state, payload))]
pub async fn handle_register_camera(
    State(state): State<AppState>,
    Json(payload): Json<RegisterCameraPayload>,
) -> Result<impl IntoResponse, PipelineError> {
    if payload.rtsp_url.trim().is_empty() {
        return Err(PipelineError::BadInput("Empty rtsp_url".to_string()));
    }

    let camera = Camera {
        identifier: Uuid::new_v4().to_string(),
        hub_identifier: payload.hub_identifier,
        display_name: payload.display_name,
        rtsp_url: payload.rtsp_url,
        current_status: CameraStatus::Offline,
        health_score: 0.0,
        baseline_image_path: None,
        baseline_updated_at: None,
        view_change_detected: false,
        created_at: Utc::now(),
    };

    state.camera_repository.upsert_camera(&camera).await?;
    Ok((StatusCode::CREATED, Json(camera)))
}

/**
 * Endpoint: POST /api/v1/cameras/:id/baseline (multipart 'image')
 * Sella la imagen de línea base contra la que se mide el cambio de vista.
 */
#[instrument(skip(state, multipart))]
pub async fn handle_set_baseline(
    State(state): State<AppState>,
    Path(camera_identifier): Path<String>,
    mut multipart: axum::extract::Multipart,
) -> Result<impl IntoResponse, PipelineError> {
    state.camera_repository.fetch_camera(&camera_identifier).await?;

    let mut baseline_bytes: Option<Vec<u8>> = None;
    while let Ok(Some(part)) = multipart.next_field().await {
        if part.name().unwrap_or_default() == "image" {
            baseline_bytes = part.bytes().await.ok().map(|bytes| bytes.to_vec());
        }
    }

    let baseline_bytes = baseline_bytes
        .ok_or_else(|| PipelineError::BadInput("Missing image part".to_string()))?;

    let blob_name = format!("{}.jpg", camera_identifier);
    let blob_path = state
        .blob_vault
        .upload("camera-baselines", &blob_name, &baseline_bytes, "image/jpeg")
        .await?;

    state.camera_repository.seal_baseline(&camera_identifier, &blob_path).await?;

    info!("📐 [INSPECTION]: Baseline sealed for camera {} at [{}].", camera_identifier, blob_path);
    Ok(StatusCode::CREATED)
}

/// Endpoint: GET /api/v1/cameras
#[instrument(skip(state))]
pub async fn handle_list_cameras(
    State(state): State<AppState>,
) -> Result<Json<Vec<Camera>>, PipelineError> {
    Ok(Json(state.camera_repository.list_cameras().await?))
}

/**
 * Endpoint: POST /api/v1/cameras/:id/health
 * Registra la muestra y proyecta estado + puntuación sobre la cámara.
 */
#[instrument(skip(state, sample), fields(camera = %camera_identifier))]
pub async fn handle_post_health_sample(
    State(state): State<AppState>,
    Path(camera_identifier): Path<String>,
    Json(mut sample): Json<CameraHealthSample>,
) -> Result<impl IntoResponse, PipelineError> {
    // La ruta gobierna la identidad; la existencia gobierna el 404.
    state.camera_repository.fetch_camera(&camera_identifier).await?;
    sample.camera_identifier = camera_identifier.clone();
    if sample.identifier.is_empty() {
        sample.identifier = Uuid::new_v4().to_string();
    }

    state.camera_repository.insert_health_sample(&sample).await?;

    // Proyección del estado vigente sobre la cámara.
    let mut health_score = match sample.status {
        CameraStatus::Offline => 0.0_f32,
        CameraStatus::Degraded => 60.0,
        CameraStatus::Connected => 95.0,
    };
    if sample.view_change_detected {
        health_score = (health_score - 30.0).max(0.0);
    }

    state
        .camera_repository
        .seal_camera_status(
            &camera_identifier,
            sample.status,
            health_score,
            sample.view_change_detected,
        )
        .await?;

    info!(
        "🩺 [INSPECTION]: Health sample sealed for camera {} ({:?}, score {:.0}).",
        camera_identifier, sample.status, health_score
    );
    Ok(StatusCode::CREATED)
}

/**
 * Endpoint: POST /api/v1/camera-alerts
 * Registra la alerta y la releva por correo (mejor esfuerzo).
 */
#[instrument(skip(state, alert), fields(camera = %alert.camera_identifier))]
pub async fn handle_post_camera_alert(
    State(state): State<AppState>,
    Json(mut alert): Json<CameraAlert>,
) -> Result<impl IntoResponse, PipelineError> {
    if alert.identifier.is_empty() {
        alert.identifier = Uuid::new_v4().to_string();
    }

    let camera = state.camera_repository.fetch_camera(&alert.camera_identifier).await?;
    state.camera_repository.insert_camera_alert(&alert).await?;

    // Relevo por correo (mejor esfuerzo; jamás aborta la creación).
    let inspection_recipients = state.inspection_directives.read().await.alert_emails.clone();
    if !inspection_recipients.is_empty() {
        let subject = format!("[IntelliOptics] Camera Alert: {}", camera.display_name);
        let html_body = render_alert_email_html(
            &format!("{:?}", alert.alert_type),
            &camera.display_name,
            &alert.message,
            camera.health_score / 100.0,
            Some(&camera.display_name),
            None,
        );

        if let Err(dispatch_fault) = state
            .email_dispatcher
            .send_html(&inspection_recipients, &subject, &html_body)
            .await
        {
            warn!("⚠️ [INSPECTION]: Camera alert email skipped: {}", dispatch_fault);
        }
    }

    Ok((StatusCode::CREATED, Json(alert)))
}

/// Endpoint: GET /api/v1/inspection/config
#[instrument(skip(state))]
pub async fn handle_get_inspection_config(
    State(state): State<AppState>,
) -> Json<InspectionDirectives> {
    Json(state.inspection_directives.read().await.clone())
}

/// Endpoint: PUT /api/v1/inspection/config
#[instrument(skip(state, directives))]
pub async fn handle_put_inspection_config(
    State(state): State<AppState>,
    Json(directives): Json<InspectionDirectives>,
) -> StatusCode {
    *state.inspection_directives.write().await = directives;
    StatusCode::NO_CONTENT
}

/// Endpoint: POST /api/v1/inspection/runs
#[instrument(skip(state))]
pub async fn handle_open_inspection_run(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, PipelineError> {
    let run = state.camera_repository.open_inspection_run().await?;
    Ok((StatusCode::CREATED, Json(run)))
}

/// Payload de sellado de una ronda.
#[derive(Debug, Deserialize)]
pub struct SealRunPayload {
    total_cameras: u32,
    cameras_healthy: u32,
    cameras_warning: u32,
    cameras_failed: u32,
}

/// Endpoint: PUT /api/v1/inspection/runs/:id
#[instrument(skip(state, payload))]
pub async fn handle_seal_inspection_run(
    State(state): State<AppState>,
    Path(run_identifier): Path<String>,
    Json(payload): Json<SealRunPayload>,
) -> Result<impl IntoResponse, PipelineError> {
    state
        .camera_repository
        .seal_inspection_run(
            &run_identifier,
            payload.total_cameras,
            payload.cameras_healthy,
            payload.cameras_warning,
            payload.cameras_failed,
        )
        .await?;

    info!(
        "🔍 [INSPECTION]: Run {} completed: {} healthy, {} warning, {} failed.",
        run_identifier, payload.cameras_healthy, payload.cameras_warning, payload.cameras_failed
    );
    Ok(StatusCode::NO_CONTENT)
}
