// [apps/orchestrator/src/services/demo_sessions.rs]
/*!
 * =================================================================
 * APARATO: DEMO SESSION SUPERVISOR (V5.5 - TASK MAP GOLD)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: SUPERVISIÓN DE SESIONES DE CAPTURA CON INFERENCIA POR FRAME
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SUPERVISED TASK MAP: session_id → worker cancelable. El arranque
 *    registra la señal de parada; la detención cancela, espera la
 *    terminación del task y libera el buffer del último frame
 *    (erradicación del hilo cooperativo + dict compartido del legado).
 * 2. PER-FRAME FAN-OUT: Cada frame dispara tareas de inferencia
 *    fire-and-forget por detector, cada una sellando su consulta y su
 *    resultado con su propia conexión.
 * 3. MOTION GATE: En modo 'motion', la diferencia media contra el frame
 *    previo gobierna la sumisión.
 * =================================================================
 */

use crate::services::query_pipeline::{assemble_inference_directives, EMPTY_VERDICT_LABEL};
use crate::state::AppState;
use chrono::Utc;
use image::imageops;
use intellioptics_core_vision::letterbox::decode_rgb_image;
use intellioptics_core_vision::quality::mean_absolute_difference;
use intellioptics_domain_models::demo::{CaptureMode, DemoDetectionResult, DemoSession, DemoSessionStatus};
use intellioptics_domain_models::query::{Query, QueryStatus};
use intellioptics_infra_capture::{ignite_frame_pipeline, CaptureDirectives};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Escala de la compuerta de movimiento (diferencia media 0-255 → 0-1000).
const MOTION_SCORE_SCALE: f32 = 1000.0 / 255.0;

/// Manija viva de una sesión supervisada.
struct SessionHandle {
    stop_signal: watch::Sender<bool>,
    latest_frame: Arc<RwLock<Option<Vec<u8>>>>,
    worker_task: JoinHandle<()>,
}

/// Supervisor soberano del mapa de sesiones de captura.
pub struct DemoSessionSupervisor {
    active_sessions: Mutex<HashMap<String, SessionHandle>>,
}

impl DemoSessionSupervisor {
    /// Forja un supervisor vacío.
    pub fn new() -> Self {
        Self { active_sessions: Mutex::new(HashMap::new()) }
    }

    /// Último frame capturado de una sesión (para la vista previa).
    pub async fn latest_frame(&self, session_identifier: &str) -> Option<Vec<u8>> {
        let sessions_guard = self.active_sessions.lock().await;
        let handle = sessions_guard.get(session_identifier)?;
        let frame = handle.latest_frame.read().await.clone();
        frame
    }

    /// true si la sesión vive en el mapa supervisado.
    pub async fn is_active(&self, session_identifier: &str) -> bool {
        self.active_sessions.lock().await.contains_key(session_identifier)
    }

    /**
     * Arranca el worker de captura de una sesión ya cristalizada.
     */
    #[instrument(skip(self, state, session), fields(session = %session.identifier))]
    pub async fn start_session(&self, state: AppState, session: DemoSession) {
        let mut sessions_guard = self.active_sessions.lock().await;

        if sessions_guard.contains_key(&session.identifier) {
            warn!("⚠️ [DEMO_SUPERVISOR]: Session {} already active.", session.identifier);
            return;
        }

        let (stop_signal, stop_observer) = watch::channel(false);
        let latest_frame = Arc::new(RwLock::new(None));

        let worker_task = tokio::spawn(run_capture_worker(
            state,
            session.clone(),
            Arc::clone(&latest_frame),
            stop_observer,
        ));

        sessions_guard.insert(
            session.identifier.clone(),
            SessionHandle { stop_signal, latest_frame, worker_task },
        );

        info!("✓ [DEMO_SUPERVISOR]: Capture session {} engaged.", session.identifier);
    }

    /**
     * Detención cooperativa: señal, espera de terminación y liberación
     * del buffer del último frame.
     *
     * # Returns:
     * true si la sesión existía y fue detenida.
     */
    #[instrument(skip(self))]
    pub async fn stop_session(&self, session_identifier: &str) -> bool {
        let Some(handle) = self.active_sessions.lock().await.remove(session_identifier) else {
            return false;
        };

        let _ = handle.stop_signal.send(true);

        if tokio::time::timeout(std::time::Duration::from_secs(5), handle.worker_task)
            .await
            .is_err()
        {
            warn!("⏱️ [DEMO_SUPERVISOR]: Session {} exceeded the stop window.", session_identifier);
        }

        // Liberación del buffer de vista previa.
        *handle.latest_frame.write().await = None;

        info!("🛑 [DEMO_SUPERVISOR]: Session {} sealed.", session_identifier);
        true
    }

    /// Detención masiva (apagado ordenado del proceso).
    pub async fn stop_all(&self) {
        let session_identifiers: Vec<String> =
            self.active_sessions.lock().await.keys().cloned().collect();
        for session_identifier in session_identifiers {
            self.stop_session(&session_identifier).await;
        }
    }
}

impl Default for DemoSessionSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

/// Bucle del worker de captura de una sesión.
async fn run_capture_worker(
    state: AppState,
    session: DemoSession,
    latest_frame: Arc<RwLock<Option<Vec<u8>>>>,
    mut stop_observer: watch::Receiver<bool>,
) {
    let mut frame_stream = ignite_frame_pipeline(CaptureDirectives {
        source_url: session.source_url.clone(),
        frames_per_second: session.capture_fps(),
    });

    let mut previous_gray_frame: Option<image::GrayImage> = None;

    loop {
        let captured = tokio::select! {
            captured = frame_stream.next_frame() => captured,
            _ = stop_observer.changed() => {
                if *stop_observer.borrow() { break; }
                continue;
            }
        };

        let Some(frame) = captured else {
            // La tubería colapsó: sellar la sesión como errónea.
            error!("✗ [DEMO_WORKER]: Pipeline dried for session {}.", session.identifier);
            let _ = state
                .demo_repository
                .seal_session_status(&session.identifier, DemoSessionStatus::Error)
                .await;
            break;
        };

        // 1. VISTA PREVIA: retención del último frame.
        *latest_frame.write().await = Some(frame.jpeg_bytes.clone());

        // 2. COMPUERTA DE MOVIMIENTO (modo 'motion').
        if session.capture_mode == CaptureMode::Motion {
            match decode_rgb_image(&frame.jpeg_bytes) {
                Ok(rgb_frame) => {
                    let gray_frame = imageops::grayscale(&rgb_frame);
                    let motion_open = match &previous_gray_frame {
                        None => true,
                        Some(previous) => {
                            let motion_score =
                                mean_absolute_difference(&gray_frame, previous) * MOTION_SCORE_SCALE;
                            motion_score >= session.motion_threshold
                        }
                    };
                    previous_gray_frame = Some(gray_frame);

                    if !motion_open {
                        continue;
                    }
                }
                Err(decode_fault) => {
                    warn!("⚠️ [DEMO_WORKER]: Motion gate decode failed: {}", decode_fault);
                    continue;
                }
            }
        }

        // 3. VIGENCIA DE LA SESIÓN EN EL LEDGER.
        match state.demo_repository.fetch_session(&session.identifier).await {
            Ok(persisted) if persisted.status == DemoSessionStatus::Active => {}
            Ok(_) => {
                info!("⚪ [DEMO_WORKER]: Session {} no longer active; frame skipped.", session.identifier);
                break;
            }
            Err(fetch_fault) => {
                warn!("⚠️ [DEMO_WORKER]: Session fetch failed: {}", fetch_fault);
                continue;
            }
        }

        // 4. SUBIDA DEL FRAME A LA BÓVEDA.
        let vocabulary_segment = if session.is_open_vocabulary() { "yoloworld/" } else { "" };
        let blob_name = format!(
            "demo-sessions/{}/{}{}.jpg",
            session.identifier,
            vocabulary_segment,
            Uuid::new_v4()
        );
        let blob_path = match state
            .blob_vault
            .upload(&state.runtime.images_container, &blob_name, &frame.jpeg_bytes, "image/jpeg")
            .await
        {
            Ok(path) => path,
            Err(upload_fault) => {
                warn!("⚠️ [DEMO_WORKER]: Frame upload failed: {}", upload_fault);
                continue;
            }
        };

        // 5. FAN-OUT DE INFERENCIA POR FRAME.
        if let Err(submission_fault) =
            submit_frame_for_inference(&state, &session, &frame.jpeg_bytes, &blob_path, frame.frame_number)
                .await
        {
            error!(
                "⚠️ [DEMO_WORKER]: Frame {} submission failed for session {}: {}",
                frame.frame_number, session.identifier, submission_fault
            );
        }
    }

    frame_stream.stop().await;

    // Cierre nominal: una sesión no sellada como Error queda Stopped.
    if let Ok(persisted) = state.demo_repository.fetch_session(&session.identifier).await {
        if persisted.status == DemoSessionStatus::Active {
            let _ = state
                .demo_repository
                .seal_session_status(&session.identifier, DemoSessionStatus::Stopped)
                .await;
        }
    }

    info!("🏁 [DEMO_WORKER]: Capture loop sealed for session {}.", session.identifier);
}

/// Crea consultas y resultados por frame y dispara las tareas de inferencia.
async fn submit_frame_for_inference(
    state: &AppState,
    session: &DemoSession,
    frame_bytes: &[u8],
    blob_path: &str,
    frame_number: u64,
) -> anyhow::Result<()> {
    if session.is_open_vocabulary() {
        // --- MODO VOCABULARIO ABIERTO (sin detector) ---
        let (query, result) = crystallize_frame_rows(state, session, None, blob_path, frame_number).await?;
        state.demo_repository.increment_frames_captured(&session.identifier).await?;

        let prompts = session.yoloworld_prompts.clone().unwrap_or_default();
        let state_clone = state.clone();
        let frame_owned = frame_bytes.to_vec();

        tokio::spawn(async move {
            finalize_open_vocabulary_inference(state_clone, query, result, frame_owned, prompts).await;
        });

        info!(
            "🌍 [DEMO_WORKER]: Frame {} submitted to open-vocabulary endpoint for session {}.",
            frame_number, session.identifier
        );
        return Ok(());
    }

    // --- MODO DETECTOR ---
    let mut dispatch_plan = Vec::new();
    for detector_identifier in &session.detector_identifiers {
        let (query, result) = crystallize_frame_rows(
            state,
            session,
            Some(detector_identifier.clone()),
            blob_path,
            frame_number,
        )
        .await?;
        dispatch_plan.push((query, result, detector_identifier.clone()));
    }

    state.demo_repository.increment_frames_captured(&session.identifier).await?;

    let dispatched_count = dispatch_plan.len();
    for (query, result, detector_identifier) in dispatch_plan {
        let state_clone = state.clone();
        let frame_owned = frame_bytes.to_vec();

        // Tarea fire-and-forget por detector con su propia conexión.
        tokio::spawn(async move {
            finalize_detector_inference(state_clone, query, result, frame_owned, detector_identifier).await;
        });
    }

    info!(
        "🎞️ [DEMO_WORKER]: Frame {} submitted to {} detector(s) for session {}.",
        frame_number, dispatched_count, session.identifier
    );
    Ok(())
}

/// Cristaliza el par (Query, DemoDetectionResult) en estado PENDING.
async fn crystallize_frame_rows(
    state: &AppState,
    session: &DemoSession,
    detector_identifier: Option<String>,
    blob_path: &str,
    frame_number: u64,
) -> anyhow::Result<(Query, DemoDetectionResult)> {
    let query = Query {
        identifier: Uuid::new_v4().to_string(),
        detector_identifier: detector_identifier.clone(),
        image_blob_path: blob_path.to_string(),
        status: QueryStatus::Pending,
        result_label: None,
        confidence: None,
        detections: Vec::new(),
        local_inference: true,
        escalated: false,
        ground_truth: None,
        is_correct: None,
        reviewed_by: None,
        reviewed_at: None,
        created_at: Utc::now(),
    };
    state.query_repository.create(&query).await?;

    let result = DemoDetectionResult {
        identifier: Uuid::new_v4().to_string(),
        session_identifier: session.identifier.clone(),
        query_identifier: query.identifier.clone(),
        detector_identifier,
        frame_number,
        capture_method: session.capture_mode,
        status: QueryStatus::Pending,
        created_at: Utc::now(),
    };
    state.demo_repository.insert_result(&result).await?;

    Ok((query, result))
}

/// Finaliza la pasada de un detector sobre un frame de demo.
async fn finalize_detector_inference(
    state: AppState,
    query: Query,
    result: DemoDetectionResult,
    frame_bytes: Vec<u8>,
    detector_identifier: String,
) {
    let inference_outcome = async {
        let detector = state
            .detector_repository
            .fetch_visible_detector(&detector_identifier)
            .await?;
        let directives = assemble_inference_directives(&state, &detector).await?;
        let report = state
            .inference_uplink
            .run_detector_inference(frame_bytes, &directives)
            .await
            .map_err(|uplink_fault| crate::errors::PipelineError::Inference(uplink_fault.to_string()))?;
        Ok::<_, crate::errors::PipelineError>(report)
    }
    .await;

    match inference_outcome {
        Ok(report) => {
            let (result_label, confidence) = match report.top_detection() {
                Some(top) => (top.label.clone(), top.confidence),
                None => (EMPTY_VERDICT_LABEL.to_string(), 1.0),
            };

            let seal_outcome = state
                .query_repository
                .seal_inference_outcome(
                    &query.identifier,
                    QueryStatus::Done,
                    &result_label,
                    confidence,
                    &report.detections,
                    true,
                )
                .await;

            if seal_outcome.is_ok() {
                let _ = state.demo_repository.seal_result_status(&result.identifier, QueryStatus::Done).await;
                let _ = state.demo_repository.increment_detections(&result.session_identifier).await;
            }
        }
        Err(inference_fault) => {
            warn!("⚠️ [DEMO_WORKER]: Detector inference failed: {}", inference_fault);
            let _ = state.query_repository.seal_error(&query.identifier).await;
            let _ = state.demo_repository.seal_result_status(&result.identifier, QueryStatus::Error).await;
        }
    }
}

/// Finaliza la pasada de vocabulario abierto sobre un frame de demo.
async fn finalize_open_vocabulary_inference(
    state: AppState,
    query: Query,
    result: DemoDetectionResult,
    frame_bytes: Vec<u8>,
    prompts: String,
) {
    match state
        .open_vocabulary_uplink
        .run_open_vocabulary_inference(frame_bytes, &prompts)
        .await
    {
        Ok(report) => {
            let (result_label, confidence) = match report.top_detection() {
                Some(top) => (top.label.clone(), top.confidence),
                None => (EMPTY_VERDICT_LABEL.to_string(), 1.0),
            };

            let seal_outcome = state
                .query_repository
                .seal_inference_outcome(
                    &query.identifier,
                    QueryStatus::Done,
                    &result_label,
                    confidence,
                    &report.detections,
                    true,
                )
                .await;

            if seal_outcome.is_ok() {
                let _ = state.demo_repository.seal_result_status(&result.identifier, QueryStatus::Done).await;
                let _ = state.demo_repository.increment_detections(&result.session_identifier).await;
            }
        }
        Err(uplink_fault) => {
            warn!("⚠️ [DEMO_WORKER]: Open-vocabulary inference failed: {}", uplink_fault);
            let _ = state.query_repository.seal_error(&query.identifier).await;
            let _ = state.demo_repository.seal_result_status(&result.identifier, QueryStatus::Error).await;
        }
    }
}
