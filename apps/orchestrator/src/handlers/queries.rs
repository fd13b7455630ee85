// [apps/orchestrator/src/handlers/queries.rs]
/*!
 * =================================================================
 * APARATO: QUERY LIFECYCLE HANDLER (V5.4 - SWISS PRECISION)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: SUMISIÓN, LISTADO, REVISIÓN Y CASCADA DE CONSULTAS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. MULTIPART INGESTION: POST /queries acepta 'detector_id',
 *    'confidence_threshold' y 'want_async' como campos de formulario
 *    junto a la parte binaria 'image'.
 * 2. SIGNED PREVIEWS: Los listados adjuntan URLs firmadas de lectura;
 *    una ruta malformada degrada a null sin abortar la página.
 * =================================================================
 */

use crate::errors::PipelineError;
use crate::services::query_pipeline::{self, QuerySubmission};
use crate::state::AppState;
use axum::extract::{Multipart, Path, Query as QueryParams, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use intellioptics_domain_models::query::{Feedback, Query};
use intellioptics_infra_db::repositories::query::QueryListFilter;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

/// Parámetros del listado paginado.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    skip: u32,
    #[serde(default = "ListParams::default_limit")]
    limit: u32,
    #[serde(default)]
    show_verified: bool,
    label_filter: Option<String>,
    max_confidence: Option<f32>,
}

impl ListParams {
    fn default_limit() -> u32 { 20 }
}

/**
 * Endpoint: GET /api/v1/queries
 * Listado paginado con URLs de imagen firmadas.
 */
#[instrument(skip(state, params))]
pub async fn handle_list_queries(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<ListParams>,
) -> Result<impl IntoResponse, PipelineError> {
    let filter = QueryListFilter {
        skip: params.skip,
        limit: params.limit,
        show_verified: params.show_verified,
        label_filter: params.label_filter,
        max_confidence: params.max_confidence,
    };

    let (page, total) = state.query_repository.list(&filter).await?;

    let enriched_page: Vec<serde_json::Value> = page
        .into_iter()
        .map(|query| {
            let image_url = state.sign_blob_path(&query.image_blob_path);
            let mut body = serde_json::to_value(&query).unwrap_or_default();
            if let Some(object_body) = body.as_object_mut() {
                object_body.insert("image_url".to_string(), json!(image_url));
            }
            body
        })
        .collect();

    Ok(Json(json!({
        "queries": enriched_page,
        "total": total,
        "skip": filter.skip,
        "limit": filter.limit,
    })))
}

/**
 * Endpoint: POST /api/v1/queries (multipart)
 * Sumisión de una consulta nueva al pipeline completo.
 */
#[instrument(skip(state, multipart))]
pub async fn handle_create_query(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, PipelineError> {
    let mut detector_identifier: Option<String> = None;
    let mut confidence_threshold_override: Option<f32> = None;
    let mut want_async = false;
    let mut camera_name: Option<String> = None;
    let mut filename = "upload.jpg".to_string();
    let mut content_type = "image/jpeg".to_string();
    let mut image_bytes: Option<Vec<u8>> = None;

    while let Ok(Some(part)) = multipart.next_field().await {
        match part.name().unwrap_or_default() {
            "detector_id" => {
                detector_identifier = part.text().await.ok();
            }
            "confidence_threshold" => {
                confidence_threshold_override = part
                    .text()
                    .await
                    .ok()
                    .and_then(|raw| raw.trim().parse::<f32>().ok());
            }
            "want_async" => {
                want_async = part
                    .text()
                    .await
                    .map(|raw| raw.trim().eq_ignore_ascii_case("true"))
                    .unwrap_or(false);
            }
            "camera_name" => {
                camera_name = part.text().await.ok().filter(|name| !name.is_empty());
            }
            "image" => {
                if let Some(declared_filename) = part.file_name() {
                    filename = declared_filename.to_string();
                }
                if let Some(declared_content_type) = part.content_type() {
                    content_type = declared_content_type.to_string();
                }
                image_bytes = part.bytes().await.ok().map(|bytes| bytes.to_vec());
            }
            _ => {}
        }
    }

    let detector_identifier = detector_identifier
        .filter(|identifier| !identifier.is_empty())
        .ok_or_else(|| PipelineError::BadInput("Missing detector_id field".to_string()))?;
    let image_bytes = image_bytes
        .ok_or_else(|| PipelineError::BadInput("Missing image part".to_string()))?;

    let created_query = query_pipeline::submit_query(
        &state,
        QuerySubmission {
            detector_identifier,
            confidence_threshold_override,
            want_async,
            filename,
            content_type,
            image_bytes,
            camera_name,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(created_query)))
}

/// Endpoint: GET /api/v1/queries/metrics
#[instrument(skip(state))]
pub async fn handle_query_metrics(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, PipelineError> {
    let metrics = state.query_repository.ground_truth_metrics().await?;

    let accuracy = if metrics.reviewed_count > 0 {
        metrics.correct_count as f64 / metrics.reviewed_count as f64
    } else {
        0.0
    };

    Ok(Json(json!({
        "reviewed_count": metrics.reviewed_count,
        "correct_count": metrics.correct_count,
        "accuracy": accuracy,
        "confusion": metrics.confusion,
    })))
}

/// Endpoint: GET /api/v1/queries/:id
#[instrument(skip(state))]
pub async fn handle_get_query(
    State(state): State<AppState>,
    Path(query_identifier): Path<String>,
) -> Result<Json<Query>, PipelineError> {
    Ok(Json(state.query_repository.fetch(&query_identifier).await?))
}

/// Payload de revisión de verdad de terreno.
#[derive(Debug, Deserialize)]
pub struct GroundTruthPayload {
    ground_truth: String,
    #[serde(default = "GroundTruthPayload::default_reviewer")]
    reviewer: String,
}

impl GroundTruthPayload {
    fn default_reviewer() -> String { "reviewer".to_string() }
}

/**
 * Endpoint: PATCH /api/v1/queries/:id
 * Reconciliación de verdad de terreno (is_correct + sellos de revisión).
 */
#[instrument(skip(state, payload))]
pub async fn handle_ground_truth(
    State(state): State<AppState>,
    Path(query_identifier): Path<String>,
    Json(payload): Json<GroundTruthPayload>,
) -> Result<Json<Query>, PipelineError> {
    if payload.ground_truth.trim().is_empty() {
        return Err(PipelineError::BadInput("Empty ground truth label".to_string()));
    }

    let mut query = state.query_repository.fetch(&query_identifier).await?;
    query.reconcile_ground_truth(&payload.ground_truth, &payload.reviewer);
    state.query_repository.seal_ground_truth(&query).await?;

    Ok(Json(query))
}

/// Payload de retroalimentación de revisor.
#[derive(Debug, Deserialize)]
pub struct FeedbackPayload {
    label: String,
    confidence: Option<f32>,
    notes: Option<String>,
    count: Option<i64>,
    reviewer: Option<String>,
}

/**
 * Endpoint: POST /api/v1/queries/:id/feedback
 * El veredicto humano desplaza al del modelo (status=DONE).
 */
#[instrument(skip(state, payload))]
pub async fn handle_submit_feedback(
    State(state): State<AppState>,
    Path(query_identifier): Path<String>,
    Json(payload): Json<FeedbackPayload>,
) -> Result<impl IntoResponse, PipelineError> {
    // La existencia de la consulta gobierna el 404 antes de insertar.
    state.query_repository.fetch(&query_identifier).await?;

    let feedback = Feedback {
        identifier: Uuid::new_v4().to_string(),
        query_identifier: query_identifier.clone(),
        reviewer_identifier: payload.reviewer,
        label: payload.label,
        confidence: payload.confidence,
        notes: payload.notes,
        count: payload.count,
        created_at: Utc::now(),
    };

    state.query_repository.apply_feedback(&feedback).await?;

    Ok((StatusCode::CREATED, Json(feedback)))
}

/**
 * Endpoint: DELETE /api/v1/queries/:id
 * Cascada completa: derivaciones, feedback, anotaciones y blob.
 */
#[instrument(skip(state))]
pub async fn handle_delete_query(
    State(state): State<AppState>,
    Path(query_identifier): Path<String>,
) -> Result<impl IntoResponse, PipelineError> {
    query_pipeline::delete_query_cascade(&state, &query_identifier).await?;
    Ok(StatusCode::NO_CONTENT)
}
