// [apps/edge-ingest/src/stream_worker.rs]
/*!
 * =================================================================
 * APARATO: RTSP STREAM WORKER (V5.5 - STATE MACHINE GOLD)
 * CLASIFICACIÓN: EDGE EXECUTION LAYER (ESTRATO L1-EDGE)
 * RESPONSABILIDAD: MÁQUINA DE ESTADOS DE INGESTA DE UN STREAM
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. STATE DISCIPLINE: IDLE → RESOLVING → OPEN → READ → GATE → SUBMIT
 *    con BACKOFF ante fallo y STOPPING cooperativo; la señal de parada
 *    se observa en la cabecera de cada estado.
 * 2. FAIL-OPEN GATE: Un colapso de la evaluación de salud jamás retiene
 *    el frame; la compuerta solo descarta frames CRITICAL cuando
 *    'skip_unhealthy_frames' está activa.
 * 3. NATURAL THROTTLE: A lo sumo una sumisión por
 *    'sampling_interval_seconds'; el worker duerme, jamás acumula.
 * =================================================================
 */

use intellioptics_core_vision::letterbox::decode_rgb_image;
use intellioptics_core_vision::quality::{FrameHealthSentinel, HealthStatus, SentinelThresholds};
use intellioptics_domain_models::inference::InferenceDirectives;
use intellioptics_infra_capture::{
    ignite_frame_pipeline, inject_rtsp_credentials, CaptureDirectives, FrameStream,
};
use intellioptics_infra_worker_client::{ControlPlaneClient, InferenceWorkerClient};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

/// Método de sumisión de frames del stream.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionMethod {
    /// POST multipart al plano de control (/api/v1/queries).
    Api,
    /// POST directo al worker de inferencia (/infer) con directivas locales.
    EdgeWorker,
}

/// Compuerta de salud por stream.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthGateDirectives {
    /// Interruptor maestro de la evaluación de salud.
    #[serde(default)]
    pub enabled: bool,
    /// true descarta frames con estado CRITICAL.
    #[serde(default)]
    pub skip_unhealthy_frames: bool,
    /// Habilita las métricas de sabotaje contra la referencia.
    #[serde(default = "HealthGateDirectives::default_check_tampering")]
    pub check_tampering: bool,
    /// Intervalo de re-evaluación; 0 evalúa cada frame.
    #[serde(default)]
    pub health_check_interval_seconds: f64,
}

impl HealthGateDirectives {
    fn default_check_tampering() -> bool { true }
}

impl Default for HealthGateDirectives {
    fn default() -> Self {
        Self {
            enabled: false,
            skip_unhealthy_frames: false,
            check_tampering: true,
            health_check_interval_seconds: 0.0,
        }
    }
}

/// Directiva completa de un stream del manifiesto.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamDirective {
    /// Nombre nominal del stream (rastro y supervisión).
    pub name: String,
    /// Fuente de captura (rtsp://, https://, mock://).
    pub source_url: String,
    /// Detector objetivo de las sumisiones.
    pub detector_id: String,
    /// Intervalo mínimo entre sumisiones.
    #[serde(default = "StreamDirective::default_sampling_interval")]
    pub sampling_interval_seconds: f64,
    /// Pausa de reconexión tras un fallo.
    #[serde(default = "StreamDirective::default_reconnect_delay")]
    pub reconnect_delay_seconds: f64,
    /// Método de sumisión.
    #[serde(default = "StreamDirective::default_submission")]
    pub submission: SubmissionMethod,
    /// Usuario RTSP opcional.
    pub username: Option<String>,
    /// Contraseña RTSP opcional.
    pub password: Option<String>,
    /// Compuerta de salud del stream.
    #[serde(default)]
    pub camera_health: HealthGateDirectives,
    /// Directivas de inferencia local (modo EdgeWorker).
    pub edge_directives: Option<InferenceDirectives>,
}

impl StreamDirective {
    fn default_sampling_interval() -> f64 { 5.0 }
    fn default_reconnect_delay() -> f64 { 5.0 }
    fn default_submission() -> SubmissionMethod { SubmissionMethod::Api }
}

/// Fases observables de la máquina de estados del worker.
/// READ/GATE/SUBMIT viven dentro del drenaje de frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IngestPhase {
    Resolving,
    Backoff,
    Stopping,
}

/// Worker soberano de un stream configurado.
pub struct StreamWorker {
    directive: StreamDirective,
    control_plane: ControlPlaneClient,
    edge_worker: InferenceWorkerClient,
    health_sentinel: FrameHealthSentinel,
    last_health_check: Option<Instant>,
    last_health_verdict_critical: bool,
    last_submission: Option<Instant>,
}

impl StreamWorker {
    /// Forja el worker de un stream con sus uplinks.
    pub fn new(
        directive: StreamDirective,
        control_plane: ControlPlaneClient,
        edge_worker: InferenceWorkerClient,
    ) -> Self {
        Self {
            directive,
            control_plane,
            edge_worker,
            health_sentinel: FrameHealthSentinel::new(SentinelThresholds::default()),
            last_health_check: None,
            last_health_verdict_critical: false,
            last_submission: None,
        }
    }

    /**
     * Bucle principal de la máquina de estados del stream.
     *
     * # Logic:
     * La tubería de captura encapsula RESOLVING/OPEN (extracción de URL
     * + decodificador gestionado); READ consume frames, GATE evalúa la
     * salud (fail-open) y SUBMIT despacha con cadencia acotada. El
     * agotamiento de la tubería transita a BACKOFF y re-resolución.
     */
    #[instrument(skip(self, stop_observer), fields(stream = %self.directive.name))]
    pub async fn run(mut self, mut stop_observer: watch::Receiver<bool>) {
        info!(
            "🎥 [STREAM_WORKER]: Starting ingest for '{}' targeting detector '{}' via {:?}.",
            self.directive.name, self.directive.detector_id, self.directive.submission
        );

        let mut phase = IngestPhase::Resolving;

        'machine: loop {
            // Cabecera de estado: observación de la señal de parada.
            if *stop_observer.borrow() {
                phase = IngestPhase::Stopping;
            }

            match phase {
                IngestPhase::Stopping => break 'machine,

                IngestPhase::Resolving => {
                    // RESOLVING + OPEN: ignición de la tubería gestionada.
                    let playable_source = inject_rtsp_credentials(
                        &self.directive.source_url,
                        self.directive.username.as_deref(),
                        self.directive.password.as_deref(),
                    );

                    let capture_fps = 1.0 / self.directive.sampling_interval_seconds.max(0.2);
                    let mut frame_stream = ignite_frame_pipeline(CaptureDirectives {
                        source_url: playable_source,
                        frames_per_second: capture_fps.max(0.2),
                    });

                    phase = self.drain_frames(&mut frame_stream, &mut stop_observer).await;
                    frame_stream.stop().await;
                }

                IngestPhase::Backoff => {
                    debug!("⏸️ [STREAM_WORKER]: Backoff {}s for '{}'.",
                        self.directive.reconnect_delay_seconds, self.directive.name);

                    let backoff = Duration::from_secs_f64(self.directive.reconnect_delay_seconds);
                    tokio::select! {
                        _ = tokio::time::sleep(backoff) => {}
                        _ = stop_observer.changed() => {}
                    }
                    phase = IngestPhase::Resolving;
                }
            }
        }

        info!("🏁 [STREAM_WORKER]: Ingest sealed for '{}'.", self.directive.name);
    }

    /// READ → GATE → SUBMIT hasta agotamiento o parada.
    async fn drain_frames(
        &mut self,
        frame_stream: &mut FrameStream,
        stop_observer: &mut watch::Receiver<bool>,
    ) -> IngestPhase {
        loop {
            let captured = tokio::select! {
                captured = frame_stream.next_frame() => captured,
                _ = stop_observer.changed() => {
                    if *stop_observer.borrow() { return IngestPhase::Stopping; }
                    continue;
                }
            };

            let Some(frame) = captured else {
                warn!("⚠️ [STREAM_WORKER]: Pipeline dried for '{}'; entering backoff.", self.directive.name);
                return IngestPhase::Backoff;
            };

            // GATE: evaluación de salud (fail-open ante colapso).
            if self.directive.camera_health.enabled && !self.gate_allows(&frame.jpeg_bytes) {
                debug!("🚧 [STREAM_WORKER]: Unhealthy frame skipped on '{}'.", self.directive.name);
                continue;
            }

            // THROTTLE: a lo sumo una sumisión por intervalo de muestreo.
            let sampling_interval = Duration::from_secs_f64(self.directive.sampling_interval_seconds);
            if let Some(last_submission) = self.last_submission {
                if last_submission.elapsed() < sampling_interval {
                    continue;
                }
            }

            // SUBMIT: el fallo de sumisión regresa a READ (sin backoff).
            self.submit_frame(frame.jpeg_bytes).await;
            self.last_submission = Some(Instant::now());
        }
    }

    /// Compuerta de salud con intervalo de re-evaluación y caché.
    fn gate_allows(&mut self, frame_bytes: &[u8]) -> bool {
        let check_interval = self.directive.camera_health.health_check_interval_seconds;
        let needs_fresh_verdict = match self.last_health_check {
            None => true,
            Some(last_check) => {
                check_interval <= 0.0 || last_check.elapsed().as_secs_f64() >= check_interval
            }
        };

        if needs_fresh_verdict {
            match decode_rgb_image(frame_bytes) {
                Ok(rgb_frame) => {
                    let verdict = self
                        .health_sentinel
                        .assess(&rgb_frame, self.directive.camera_health.check_tampering);

                    debug!(
                        "🩺 [STREAM_WORKER]: '{}' health status={:?} score={:.1}",
                        self.directive.name, verdict.status, verdict.overall_score
                    );

                    self.last_health_check = Some(Instant::now());
                    self.last_health_verdict_critical = verdict.status == HealthStatus::Critical;
                }
                Err(decode_fault) => {
                    // FAIL-OPEN: el colapso de la evaluación no retiene el frame.
                    warn!("⚠️ [STREAM_WORKER]: Health assessment failed ({}); failing open.", decode_fault);
                    self.last_health_verdict_critical = false;
                }
            }
        }

        !(self.directive.camera_health.skip_unhealthy_frames && self.last_health_verdict_critical)
    }

    /// Sumisión del frame por el método configurado.
    async fn submit_frame(&self, frame_bytes: Vec<u8>) {
        match self.directive.submission {
            SubmissionMethod::Api => {
                match self
                    .control_plane
                    .submit_frame_query(&self.directive.detector_id, frame_bytes, "image/jpeg")
                    .await
                {
                    Ok(query) => debug!(
                        "📤 [STREAM_WORKER]: Frame submitted as query {} ({:?}).",
                        query.identifier, query.status
                    ),
                    Err(uplink_fault) => {
                        warn!("⚠️ [STREAM_WORKER]: API submission failed: {}", uplink_fault)
                    }
                }
            }
            SubmissionMethod::EdgeWorker => {
                let Some(edge_directives) = &self.directive.edge_directives else {
                    error!(
                        "❌ [STREAM_WORKER]: '{}' configured for edge inference without directives.",
                        self.directive.name
                    );
                    return;
                };

                match self
                    .edge_worker
                    .run_detector_inference(frame_bytes, edge_directives)
                    .await
                {
                    Ok(report) => debug!(
                        "📤 [STREAM_WORKER]: Edge inference yielded {} detection(s) in {} ms.",
                        report.detections.len(), report.latency_ms
                    ),
                    Err(uplink_fault) => {
                        warn!("⚠️ [STREAM_WORKER]: Edge inference failed: {}", uplink_fault)
                    }
                }
            }
        }
    }
}
