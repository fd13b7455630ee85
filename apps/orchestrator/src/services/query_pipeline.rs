// [apps/orchestrator/src/services/query_pipeline.rs]
/*!
 * =================================================================
 * APARATO: QUERY PIPELINE SERVICE (V5.5 - HOT PATH GOLD)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: CICLO COMPLETO INGESTA → INFERENCIA → PERSISTENCIA →
 *                  ESCALAMIENTO → ALERTADO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. ORDERING SEAL: subida ≺ inferencia ≺ persistencia del veredicto ≺
 *    evaluación de alertas, dentro de cada consulta.
 * 2. FAILURE DISCIPLINE: Fallo de subida aborta sin fila PENDING
 *    residual; fallo de inferencia sella ERROR y propaga; fallo de
 *    encolado se traga tras éxito síncrono y propaga en camino async.
 * 3. SIDE-EFFECT IMMUNITY: Alertas de escalamiento y motor Herald son
 *    mejor-esfuerzo; jamás abortan la operación principal.
 *
 * # Mathematical Proof (Verdict Selection):
 * Para toda consulta DONE: result_label = etiqueta de la detección de
 * máxima confianza, o 'nothing' con confianza 1.0 si el conjunto de
 * detecciones es vacío.
 * =================================================================
 */

use crate::errors::PipelineError;
use crate::services::{alert_engine, token};
use crate::state::AppState;
use chrono::Utc;
use intellioptics_domain_models::detector::Detector;
use intellioptics_domain_models::inference::{FallbackEnvelope, InferenceDirectives};
use intellioptics_domain_models::query::{Query, QueryStatus};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Etiqueta del veredicto con conjunto de detecciones vacío.
pub const EMPTY_VERDICT_LABEL: &str = "nothing";

/// Parámetros de ingesta de una consulta nueva.
#[derive(Debug)]
pub struct QuerySubmission {
    /// Detector objetivo de la consulta.
    pub detector_identifier: String,
    /// Umbral de escalamiento; None hereda el del detector.
    pub confidence_threshold_override: Option<f32>,
    /// true deriva directo a la cola de fallback sin inferencia local.
    pub want_async: bool,
    /// Nombre de archivo declarado por el llamador.
    pub filename: String,
    /// Tipo de contenido de la imagen.
    pub content_type: String,
    /// Bytes crudos de la imagen.
    pub image_bytes: Vec<u8>,
    /// Cámara de origen, si la consulta proviene de un stream.
    pub camera_name: Option<String>,
}

/**
 * Camino síncrono completo de una consulta.
 *
 * # Errors:
 * - `Persistence(RecordNotFound | SoftDeleted)`: Detector inválido.
 * - `Storage`: La subida del blob colapsó (operación abortada).
 * - `Inference`: El worker rechazó la pasada (la consulta queda ERROR).
 */
#[instrument(skip(state, submission), fields(detector = %submission.detector_identifier))]
pub async fn submit_query(state: &AppState, submission: QuerySubmission) -> Result<Query, PipelineError> {
    if submission.image_bytes.is_empty() {
        return Err(PipelineError::BadInput("Empty image payload".to_string()));
    }

    // 1. VALIDACIÓN DEL DETECTOR (ausente → 404; borrado lógico → 409)
    let detector = state
        .detector_repository
        .fetch_visible_detector(&submission.detector_identifier)
        .await?;

    // 2. SUBIDA DEL BLOB (fallo abortivo ANTES de crear la fila)
    let blob_name = format!(
        "queries/{}/{}_{}",
        detector.identifier,
        Utc::now().to_rfc3339(),
        submission.filename
    );
    let blob_path = state
        .blob_vault
        .upload(
            &state.runtime.images_container,
            &blob_name,
            &submission.image_bytes,
            &submission.content_type,
        )
        .await?;

    // 3. CRISTALIZACIÓN DE LA CONSULTA (PENDING)
    let mut query = Query {
        identifier: Uuid::new_v4().to_string(),
        detector_identifier: Some(detector.identifier.clone()),
        image_blob_path: blob_path.clone(),
        status: QueryStatus::Pending,
        result_label: None,
        confidence: None,
        detections: Vec::new(),
        local_inference: false,
        escalated: false,
        ground_truth: None,
        is_correct: None,
        reviewed_by: None,
        reviewed_at: None,
        created_at: Utc::now(),
    };
    state.query_repository.create(&query).await?;

    // 4. CAMINO ASÍNCRONO PURO: encolado obligatorio y retorno
    if submission.want_async {
        enqueue_fallback(state, &query.identifier, &detector.identifier, &blob_path)
            .await
            .map_err(PipelineError::Queue)?;
        info!("📮 [PIPELINE]: Query {} dispatched to async fallback.", query.identifier);
        return Ok(query);
    }

    // 5. INFERENCIA SÍNCRONA VÍA WORKER
    let directives = assemble_inference_directives(state, &detector).await?;

    let report = match state
        .inference_uplink
        .run_detector_inference(submission.image_bytes.clone(), &directives)
        .await
    {
        Ok(report) => report,
        Err(inference_fault) => {
            // El colapso de inferencia sella ERROR y propaga el mensaje.
            state.query_repository.seal_error(&query.identifier).await?;
            return Err(PipelineError::Inference(inference_fault.to_string()));
        }
    };

    // 6. SELECCIÓN DEL VEREDICTO (detección de máxima confianza)
    let (result_label, confidence) = match report.top_detection() {
        Some(top_detection) => (top_detection.label.clone(), top_detection.confidence),
        None => (EMPTY_VERDICT_LABEL.to_string(), 1.0),
    };

    state
        .query_repository
        .seal_inference_outcome(
            &query.identifier,
            QueryStatus::Done,
            &result_label,
            confidence,
            &report.detections,
            true,
        )
        .await?;

    query.status = QueryStatus::Done;
    query.result_label = Some(result_label.clone());
    query.confidence = Some(confidence);
    query.detections = report.detections.clone();
    query.local_inference = true;

    // 7. ESCALAMIENTO POR BAJA CONFIANZA
    let escalation_cutoff = submission
        .confidence_threshold_override
        .unwrap_or(detector.confidence_threshold);

    if confidence < escalation_cutoff {
        let escalation_reason = format!("Low confidence ({:.2})", confidence);
        state
            .query_repository
            .seal_escalation(&query.identifier, &escalation_reason)
            .await?;
        query.status = QueryStatus::Escalated;
        query.escalated = true;

        // Encolado de fallback: redundante con el éxito síncrono → se traga.
        if let Err(enqueue_fault) =
            enqueue_fallback(state, &query.identifier, &detector.identifier, &blob_path).await
        {
            warn!("⚠️ [PIPELINE]: Fallback enqueue swallowed: {}", enqueue_fault);
        }

        // Despacho de alerta de escalamiento (mejor esfuerzo).
        dispatch_escalation_alert(state, &query.identifier, &detector.identifier, confidence).await;
    }

    // 8. MOTOR HERALD (mejor esfuerzo; jamás aborta)
    alert_engine::trigger_detector_alert(
        state,
        &detector.identifier,
        &query.identifier,
        &result_label,
        confidence,
        submission.camera_name.as_deref(),
        Some(&blob_path),
    )
    .await;

    Ok(query)
}

/**
 * Ensambla las directivas de inferencia del detector y su configuración
 * extendida, validando el invariante de umbrales por clase.
 */
pub async fn assemble_inference_directives(
    state: &AppState,
    detector: &Detector,
) -> Result<InferenceDirectives, PipelineError> {
    let primary_model_blob_path = detector
        .require_primary_model()
        .map_err(|contract_fault| PipelineError::BadInput(contract_fault.to_string()))?
        .to_string();

    let extended_config = state.detector_repository.fetch_config(&detector.identifier).await?;
    extended_config
        .validate_thresholds(&detector.class_names)
        .map_err(|contract_fault| PipelineError::BadInput(contract_fault.to_string()))?;

    Ok(InferenceDirectives {
        detector_id: detector.identifier.clone(),
        primary_model_blob_path: Some(primary_model_blob_path),
        oodd_model_blob_path: detector.oodd_model_blob_path.clone(),
        class_names: detector.class_names.clone(),
        confidence_threshold: detector.confidence_threshold,
        per_class_thresholds: extended_config.per_class_thresholds,
        detection_params: extended_config.detection_params,
        model_input_config: extended_config.model_input_config,
        mode: detector.mode,
    })
}

/// Encola el sobre de fallback con token de autorización fresco.
async fn enqueue_fallback(
    state: &AppState,
    query_identifier: &str,
    detector_identifier: &str,
    blob_path: &str,
) -> Result<(), intellioptics_infra_queue::QueueError> {
    let envelope = FallbackEnvelope {
        query_id: query_identifier.to_string(),
        detector_id: detector_identifier.to_string(),
        blob_path: blob_path.to_string(),
        fallback_token: token::forge_fallback_token(
            detector_identifier,
            state.runtime.access_token_expire_minutes,
            &state.runtime.fallback_token_secret,
        ),
    };

    let payload = serde_json::to_value(&envelope)
        .expect("FallbackEnvelope serialization is infallible");
    state
        .queue_broker
        .enqueue(&state.runtime.fallback_queue, &payload)
        .await
        .map(|_| ())
}

/// Alerta de escalamiento por correo y SMS (mejor esfuerzo).
async fn dispatch_escalation_alert(
    state: &AppState,
    query_identifier: &str,
    detector_identifier: &str,
    confidence: f32,
) {
    let subject = format!("Escalation for query {}", query_identifier);
    let body = format!(
        "Query {} for detector {} has been escalated due to low confidence ({:.2}).",
        query_identifier, detector_identifier, confidence
    );

    if !state.runtime.escalation_alert_emails.is_empty() {
        let html_body = format!("<html><body><p>{}</p></body></html>", body);
        if let Err(dispatch_fault) = state
            .email_dispatcher
            .send_html(&state.runtime.escalation_alert_emails, &subject, &html_body)
            .await
        {
            error!("⚠️ [PIPELINE]: Escalation email skipped: {}", dispatch_fault);
        }
    }

    if !state.runtime.escalation_alert_phones.is_empty() {
        if let Err(dispatch_fault) = state
            .sms_dispatcher
            .send_to_all(&state.runtime.escalation_alert_phones, &body, None)
            .await
        {
            error!("⚠️ [PIPELINE]: Escalation SMS skipped: {}", dispatch_fault);
        }
    }
}

/**
 * Cascada de borrado de una consulta: filas laterales en transacción y
 * purga del blob (el fallo de purga se registra, no se propaga).
 */
#[instrument(skip(state))]
pub async fn delete_query_cascade(state: &AppState, query_identifier: &str) -> Result<(), PipelineError> {
    let blob_path = state.query_repository.delete_cascade(query_identifier).await?;

    match intellioptics_infra_blob_vault::split_blob_path(&blob_path) {
        Ok((container, blob_name)) => {
            if let Err(purge_fault) = state.blob_vault.delete(container, blob_name).await {
                warn!("⚠️ [PIPELINE]: Blob purge failed for {}: {}", blob_path, purge_fault);
            }
        }
        Err(malformed_path) => {
            warn!("⚠️ [PIPELINE]: Unpurgeable blob path: {}", malformed_path);
        }
    }

    Ok(())
}
