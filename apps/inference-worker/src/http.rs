// [apps/inference-worker/src/http.rs]
/*!
 * =================================================================
 * APARATO: WORKER HTTP SURFACE (V5.3 - DUAL CONTENT GOLD)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: ENDPOINTS /infer, /yoloworld Y /health DEL WORKER
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. DUAL CONTENT DISPATCH: /infer discrimina por Content-Type:
 *    multipart/form-data (imagen + directivas) u octet-stream crudo
 *    contra el modelo por defecto del proceso.
 * 2. SEMANTIC STATUS TRIAGE: 400 partes ausentes o imagen hostil,
 *    503 sin modelo por defecto, 500 con {"error": ...} en colapso.
 * =================================================================
 */

use crate::engine::InferenceEngine;
use crate::errors::DispatchError;
use axum::extract::{FromRequest, Multipart, Query, Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use intellioptics_domain_models::inference::InferenceDirectives;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Tope del cuerpo de imagen cruda (octet-stream).
const RAW_BODY_LIMIT_BYTES: usize = 32 * 1024 * 1024;

/// Construye el router soberano del worker.
pub fn create_worker_router(engine: Arc<InferenceEngine>) -> Router {
    Router::new()
        .route("/infer", post(handle_infer))
        .route("/yoloworld", post(handle_yoloworld))
        .route("/health", get(|| async { "OK" }))
        .with_state(engine)
}

/**
 * Endpoint: POST /infer
 *
 * # Logic:
 * - multipart/form-data: partes 'image' (binaria) y 'config' (JSON de
 *   directivas del detector).
 * - application/octet-stream: bytes crudos contra el modelo por defecto.
 */
#[instrument(skip(engine, request))]
async fn handle_infer(
    State(engine): State<Arc<InferenceEngine>>,
    request: Request,
) -> Response {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    if content_type.starts_with("multipart/form-data") {
        let multipart = match Multipart::from_request(request, &()).await {
            Ok(multipart) => multipart,
            Err(extraction_fault) => {
                return reject_bad_request(format!("Malformed multipart body: {}", extraction_fault));
            }
        };
        return handle_detector_aware_infer(engine, multipart).await;
    }

    // Camino legado: bytes crudos contra el modelo por defecto.
    let image_bytes = match axum::body::to_bytes(request.into_body(), RAW_BODY_LIMIT_BYTES).await {
        Ok(body_bytes) if !body_bytes.is_empty() => body_bytes,
        Ok(_) => return reject_bad_request("No image data".to_string()),
        Err(body_fault) => return reject_bad_request(format!("Body read failed: {}", body_fault)),
    };

    match engine.run_default_inference(&image_bytes).await {
        Ok(report) => {
            info!(
                "✅ [HTTP_INFER]: Legacy inference completed: {} detection(s), {} ms.",
                report.detections.len(), report.latency_ms
            );
            (StatusCode::OK, Json(report)).into_response()
        }
        Err(dispatch_fault) => triage_dispatch_fault(dispatch_fault),
    }
}

/// Rama detector-aware del endpoint /infer.
async fn handle_detector_aware_infer(
    engine: Arc<InferenceEngine>,
    mut multipart: Multipart,
) -> Response {
    let mut image_bytes: Option<Vec<u8>> = None;
    let mut directives: Option<InferenceDirectives> = None;

    while let Ok(Some(part)) = multipart.next_field().await {
        match part.name().unwrap_or_default() {
            "image" => match part.bytes().await {
                Ok(binary_part) => image_bytes = Some(binary_part.to_vec()),
                Err(part_fault) => {
                    return reject_bad_request(format!("Image part unreadable: {}", part_fault))
                }
            },
            "config" => {
                let config_text = match part.text().await {
                    Ok(text) => text,
                    Err(part_fault) => {
                        return reject_bad_request(format!("Config part unreadable: {}", part_fault))
                    }
                };
                match serde_json::from_str::<InferenceDirectives>(&config_text) {
                    Ok(parsed_directives) => directives = Some(parsed_directives),
                    Err(parse_fault) => {
                        return reject_bad_request(format!("Config rejected: {}", parse_fault))
                    }
                }
            }
            _ => {}
        }
    }

    let (Some(image_bytes), Some(directives)) = (image_bytes, directives) else {
        return reject_bad_request("Missing image or config".to_string());
    };

    match engine.run_detector_inference(&directives, &image_bytes).await {
        Ok(report) => {
            info!(
                "✅ [HTTP_INFER]: Detector-aware inference completed: detector={} detections={} latency_ms={}",
                directives.detector_id, report.detections.len(), report.latency_ms
            );
            (StatusCode::OK, Json(report)).into_response()
        }
        Err(dispatch_fault) => triage_dispatch_fault(dispatch_fault),
    }
}

/// Parámetros de consulta del endpoint de vocabulario abierto.
#[derive(Debug, Deserialize)]
struct OpenVocabularyParams {
    /// Consignas separadas por comas.
    prompts: String,
}

/**
 * Endpoint: POST /yoloworld?prompts=<csv> (multipart 'image')
 */
#[instrument(skip(engine, multipart))]
async fn handle_yoloworld(
    State(engine): State<Arc<InferenceEngine>>,
    Query(params): Query<OpenVocabularyParams>,
    mut multipart: Multipart,
) -> Response {
    let prompt_list: Vec<String> = params
        .prompts
        .split(',')
        .map(|prompt| prompt.trim().to_string())
        .filter(|prompt| !prompt.is_empty())
        .collect();

    if prompt_list.is_empty() {
        return reject_bad_request("Empty prompt list".to_string());
    }

    let mut image_bytes: Option<Vec<u8>> = None;
    while let Ok(Some(part)) = multipart.next_field().await {
        if part.name().unwrap_or_default() == "image" {
            match part.bytes().await {
                Ok(binary_part) => image_bytes = Some(binary_part.to_vec()),
                Err(part_fault) => {
                    return reject_bad_request(format!("Image part unreadable: {}", part_fault))
                }
            }
        }
    }

    let Some(image_bytes) = image_bytes else {
        return reject_bad_request("Missing image part".to_string());
    };

    match engine.run_open_vocabulary_inference(&image_bytes, &prompt_list).await {
        Ok(report) => {
            let enriched_body = json!({
                "detections": report.detections,
                "latency_ms": report.latency_ms,
                "oodd_result": report.oodd_result,
                "model_info": report.model_info,
                "prompts_used": prompt_list,
            });
            (StatusCode::OK, Json(enriched_body)).into_response()
        }
        Err(dispatch_fault) => triage_dispatch_fault(dispatch_fault),
    }
}

/// Rechazo 400 con cuerpo {"error": ...}.
fn reject_bad_request(reason: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({"error": reason}))).into_response()
}

/// Triaje semántico de fallos de despacho hacia estatus HTTP.
fn triage_dispatch_fault(dispatch_fault: DispatchError) -> Response {
    let status = match &dispatch_fault {
        DispatchError::DefaultModelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        DispatchError::VisionFault(vision_fault)
            if matches!(
                vision_fault,
                intellioptics_core_vision::VisionError::ImageDecode(_)
                    | intellioptics_core_vision::VisionError::DegenerateImage { .. }
            ) =>
        {
            StatusCode::BAD_REQUEST
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    error!("❌ [HTTP_INFER]: Dispatch rejected: {}", dispatch_fault);
    (status, Json(json!({"error": dispatch_fault.to_string()}))).into_response()
}
