// [apps/camera-inspector/src/inspector.rs]
/*!
 * =================================================================
 * APARATO: CAMERA HEALTH INSPECTOR (V5.6 - PANOPTIC CYCLE)
 * CLASIFICACIÓN: FIELD AGENT LAYER (ESTRATO L1-INSPECTOR)
 * RESPONSABILIDAD: CICLO PERIÓDICO DE INSPECCIÓN DE LA FLOTA DE CÁMARAS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. RUN LEDGER: Cada ciclo abre una ronda en el plano de control y la
 *    sella 'completed' con los conteos finales; un colapso inesperado en
 *    una cámara la cuenta como fallida y el ciclo continúa.
 * 2. VIEW CHANGE DUAL GATE: SSIM contra la línea base (frames 640×480 en
 *    gris) O ratio de coincidencia de rasgos < 0.3 delata el cambio.
 * 3. ALERT PREDICATES: offline (critical), fps_drop (warning),
 *    view_change (critical), network_issue (warning); el relevo de
 *    correo vive en el plano de control.
 * =================================================================
 */

use chrono::Utc;
use image::imageops;
use intellioptics_core_vision::features::{detect_and_describe, match_descriptors};
use intellioptics_core_vision::letterbox::decode_rgb_image;
use intellioptics_core_vision::quality::laplacian_variance;
use intellioptics_core_vision::ssim::structural_similarity;
use intellioptics_domain_models::alert::AlertSeverity;
use intellioptics_domain_models::camera::{
    Camera, CameraAlert, CameraAlertType, CameraHealthSample, CameraStatus, InspectionDirectives,
};
use intellioptics_infra_blob_vault::{split_blob_path, BlobVault};
use intellioptics_infra_capture::{ignite_frame_pipeline, CaptureDirectives};
use intellioptics_infra_worker_client::ControlPlaneClient;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Ventana de conexión por cámara (contrato 10 s).
const CONNECT_TIMEOUT_SECONDS: u64 = 10;

/// Cantidad de frames de la ventana de medición de FPS.
const FPS_SAMPLE_FRAME_COUNT: usize = 30;

/// Tope temporal de la ventana de medición de FPS.
const FPS_SAMPLE_WINDOW_SECONDS: u64 = 6;

/// Geometría de comparación de cambio de vista.
const VIEW_COMPARE_WIDTH: u32 = 640;
const VIEW_COMPARE_HEIGHT: u32 = 480;

/// Ratio mínimo de coincidencia de rasgos antes de delatar cambio.
const FEATURE_MATCH_RATIO_FLOOR: f32 = 0.3;

/// Presupuesto de rasgos por frame de comparación.
const VIEW_FEATURE_BUDGET: usize = 500;

/// Pausa ante un colapso inesperado del ciclo (contrato 5 min).
const CYCLE_CRASH_BACKOFF_SECONDS: u64 = 300;

/// Resultado interno de la inspección de una cámara.
struct CameraInspectionOutcome {
    sample: CameraHealthSample,
    alerts: Vec<(CameraAlertType, AlertSeverity, String)>,
}

/// Inspector soberano de la flota de cámaras.
pub struct CameraInspector {
    control_plane: ControlPlaneClient,
    blob_vault: Arc<BlobVault>,
}

impl CameraInspector {
    /// Forja el inspector con sus enlaces de campo.
    pub fn new(control_plane: ControlPlaneClient, blob_vault: Arc<BlobVault>) -> Self {
        Self { control_plane, blob_vault }
    }

    /**
     * Bucle perpetuo del inspector: ciclo completo + pausa del periodo.
     */
    #[instrument(skip(self))]
    pub async fn run_forever(&self) {
        info!("🔭 [INSPECTOR]: Camera Inspection agent started.");

        loop {
            let directives = match self.control_plane.fetch_inspection_directives().await {
                Ok(directives) => directives,
                Err(uplink_fault) => {
                    warn!("⚠️ [INSPECTOR]: Directives fetch failed ({}); defaults in force.", uplink_fault);
                    InspectionDirectives::default()
                }
            };

            match self.run_inspection_cycle(&directives).await {
                Ok(()) => {
                    let sleep_minutes = directives.inspection_interval_minutes.max(1);
                    info!("💤 [INSPECTOR]: Sleeping {} minute(s) until next cycle.", sleep_minutes);
                    tokio::time::sleep(Duration::from_secs(sleep_minutes as u64 * 60)).await;
                }
                Err(cycle_fault) => {
                    error!("💥 [INSPECTOR]: Cycle collapsed: {} (backoff {}s)",
                        cycle_fault, CYCLE_CRASH_BACKOFF_SECONDS);
                    tokio::time::sleep(Duration::from_secs(CYCLE_CRASH_BACKOFF_SECONDS)).await;
                }
            }
        }
    }

    /**
     * Ciclo completo: ronda, inspección por cámara, reporte y sellado.
     */
    #[instrument(skip(self, directives))]
    pub async fn run_inspection_cycle(&self, directives: &InspectionDirectives) -> anyhow::Result<()> {
        info!("=== [INSPECTOR]: Starting inspection cycle ===");

        let camera_fleet = self.control_plane.list_cameras().await?;
        info!("📋 [INSPECTOR]: {} camera(s) to inspect.", camera_fleet.len());

        if camera_fleet.is_empty() {
            warn!("⚪ [INSPECTOR]: Empty fleet; cycle skipped.");
            return Ok(());
        }

        // Apertura de la ronda (la falta de ronda no detiene el ciclo).
        let inspection_run = match self.control_plane.open_inspection_run().await {
            Ok(run) => Some(run),
            Err(run_fault) => {
                warn!("⚠️ [INSPECTOR]: Run ledger unavailable: {}", run_fault);
                None
            }
        };

        let mut healthy_count = 0_u32;
        let mut warning_count = 0_u32;
        let mut failed_count = 0_u32;

        for camera in &camera_fleet {
            match self.inspect_camera(camera, directives).await {
                Ok(outcome) => {
                    match outcome.sample.status {
                        CameraStatus::Connected => healthy_count += 1,
                        CameraStatus::Degraded => warning_count += 1,
                        CameraStatus::Offline => failed_count += 1,
                    }

                    if let Err(report_fault) = self.control_plane.post_health_sample(&outcome.sample).await {
                        warn!("⚠️ [INSPECTOR]: Health report failed for {}: {}",
                            camera.display_name, report_fault);
                    }

                    for (alert_type, severity, message) in outcome.alerts {
                        let camera_alert = CameraAlert {
                            identifier: Uuid::new_v4().to_string(),
                            camera_identifier: camera.identifier.clone(),
                            alert_type,
                            severity,
                            message,
                            created_at: Utc::now(),
                        };
                        if let Err(alert_fault) = self.control_plane.post_camera_alert(&camera_alert).await {
                            warn!("⚠️ [INSPECTOR]: Alert delivery failed: {}", alert_fault);
                        }
                    }
                }
                Err(inspection_fault) => {
                    // Colapso inesperado: cuenta como fallida y el ciclo continúa.
                    error!("💥 [INSPECTOR]: Camera {} inspection collapsed: {}",
                        camera.display_name, inspection_fault);
                    failed_count += 1;
                }
            }
        }

        // Sellado de la ronda con los conteos finales.
        if let Some(run) = inspection_run {
            if let Err(seal_fault) = self
                .control_plane
                .seal_inspection_run(
                    &run.identifier,
                    camera_fleet.len() as u32,
                    healthy_count,
                    warning_count,
                    failed_count,
                )
                .await
            {
                warn!("⚠️ [INSPECTOR]: Run seal failed: {}", seal_fault);
            } else {
                info!(
                    "🔍 [INSPECTOR]: Run completed: {} healthy, {} warning, {} failed.",
                    healthy_count, warning_count, failed_count
                );
            }
        }

        info!("=== [INSPECTOR]: Inspection cycle complete ===");
        Ok(())
    }

    /**
     * Inspección completa de una cámara: conexión, FPS, calidad y vista.
     */
    #[instrument(skip(self, camera, directives), fields(camera = %camera.display_name))]
    async fn inspect_camera(
        &self,
        camera: &Camera,
        directives: &InspectionDirectives,
    ) -> anyhow::Result<CameraInspectionOutcome> {
        info!("🎥 [INSPECTOR]: Inspecting camera {} ({}).", camera.display_name, camera.identifier);

        let mut sample = CameraHealthSample {
            identifier: Uuid::new_v4().to_string(),
            camera_identifier: camera.identifier.clone(),
            status: CameraStatus::Offline,
            fps: 0.0,
            expected_fps: 30.0,
            resolution: "N/A".to_string(),
            latency_ms: 0,
            avg_brightness: None,
            sharpness_score: None,
            view_similarity_score: None,
            view_change_detected: false,
            recorded_at: Utc::now(),
        };

        let mut alerts = Vec::new();

        // 1. CONEXIÓN CON MEDICIÓN DE LATENCIA (ventana de 10 s)
        let mut frame_stream = ignite_frame_pipeline(CaptureDirectives {
            source_url: camera.rtsp_url.clone(),
            frames_per_second: sample.expected_fps as f64,
        });

        let connect_start = Instant::now();
        let first_frame = tokio::time::timeout(
            Duration::from_secs(CONNECT_TIMEOUT_SECONDS),
            frame_stream.next_frame(),
        )
        .await
        .ok()
        .flatten();

        sample.latency_ms = connect_start.elapsed().as_millis() as u64;

        let Some(first_frame) = first_frame else {
            frame_stream.stop().await;
            warn!("📴 [INSPECTOR]: Camera {} is offline (connection failed).", camera.display_name);
            alerts.push((
                CameraAlertType::Offline,
                AlertSeverity::Critical,
                format!("Camera {} is offline (connection failed)", camera.display_name),
            ));
            return Ok(CameraInspectionOutcome { sample, alerts });
        };

        sample.status = CameraStatus::Connected;

        // 2. MUESTREO DE FPS (30 frames o ventana acotada)
        let sampling_start = Instant::now();
        let mut frames_observed = 1_usize;
        while frames_observed < FPS_SAMPLE_FRAME_COUNT
            && sampling_start.elapsed() < Duration::from_secs(FPS_SAMPLE_WINDOW_SECONDS)
        {
            match tokio::time::timeout(Duration::from_secs(2), frame_stream.next_frame()).await {
                Ok(Some(_)) => frames_observed += 1,
                _ => break,
            }
        }
        let elapsed_seconds = sampling_start.elapsed().as_secs_f32().max(0.001);
        sample.fps = frames_observed as f32 / elapsed_seconds;

        frame_stream.stop().await;

        // 3. ANÁLISIS DEL FRAME CAPTURADO
        let rgb_frame = decode_rgb_image(&first_frame.jpeg_bytes)?;
        sample.resolution = format!("{}x{}", rgb_frame.width(), rgb_frame.height());

        let gray_frame = imageops::grayscale(&rgb_frame);
        let brightness = gray_frame.as_raw().iter().map(|p| *p as f64).sum::<f64>()
            / gray_frame.as_raw().len().max(1) as f64;
        sample.avg_brightness = Some(brightness as f32);
        sample.sharpness_score = Some(laplacian_variance(&gray_frame));

        // 4. CAMBIO DE VISTA CONTRA LA LÍNEA BASE (SSIM + rasgos)
        if let Some(baseline_path) = &camera.baseline_image_path {
            match self.hydrate_baseline(baseline_path).await {
                Some(baseline_gray) => {
                    let current_aligned = imageops::resize(
                        &gray_frame,
                        VIEW_COMPARE_WIDTH,
                        VIEW_COMPARE_HEIGHT,
                        imageops::FilterType::Triangle,
                    );
                    let baseline_aligned = imageops::resize(
                        &baseline_gray,
                        VIEW_COMPARE_WIDTH,
                        VIEW_COMPARE_HEIGHT,
                        imageops::FilterType::Triangle,
                    );

                    let similarity = structural_similarity(&baseline_aligned, &current_aligned);
                    sample.view_similarity_score = Some(similarity);

                    if similarity < directives.view_change_threshold {
                        info!("👁️ [INSPECTOR]: View change by SSIM {:.3} < {:.3}.",
                            similarity, directives.view_change_threshold);
                        sample.view_change_detected = true;
                    } else {
                        // Validación adicional por coincidencia de rasgos binarios.
                        let baseline_features =
                            detect_and_describe(&baseline_aligned, VIEW_FEATURE_BUDGET);
                        let current_features =
                            detect_and_describe(&current_aligned, VIEW_FEATURE_BUDGET);

                        if !baseline_features.is_empty() && !current_features.is_empty() {
                            let matches = match_descriptors(&baseline_features, &current_features);
                            let match_ratio = matches.len() as f32
                                / baseline_features.len().max(current_features.len()) as f32;

                            if match_ratio < FEATURE_MATCH_RATIO_FLOOR {
                                info!("👁️ [INSPECTOR]: View change by match ratio {:.3} < {:.1}.",
                                    match_ratio, FEATURE_MATCH_RATIO_FLOOR);
                                sample.view_change_detected = true;
                            }
                        }
                    }
                }
                None => warn!("⚠️ [INSPECTOR]: Baseline hydration failed for {}.", camera.display_name),
            }
        }

        // 5. TRIAJE DE DEGRADACIÓN (FPS caído o latencia excesiva)
        let fps_floor = sample.expected_fps * directives.fps_drop_threshold_pct;
        if sample.fps < fps_floor || sample.latency_ms > directives.latency_threshold_ms {
            sample.status = CameraStatus::Degraded;
        }

        // 6. PREDICADOS DE ALERTA
        if sample.fps > 0.0 && sample.fps < fps_floor {
            alerts.push((
                CameraAlertType::FpsDrop,
                AlertSeverity::Warning,
                format!("FPS dropped to {:.1} (expected {:.0})", sample.fps, sample.expected_fps),
            ));
        }

        if sample.view_change_detected {
            alerts.push((
                CameraAlertType::ViewChange,
                AlertSeverity::Critical,
                format!(
                    "Camera view has changed (similarity: {:.2})",
                    sample.view_similarity_score.unwrap_or(0.0)
                ),
            ));
        }

        if sample.latency_ms > directives.latency_threshold_ms {
            alerts.push((
                CameraAlertType::NetworkIssue,
                AlertSeverity::Warning,
                format!("High latency: {}ms", sample.latency_ms),
            ));
        }

        Ok(CameraInspectionOutcome { sample, alerts })
    }

    /// Hidrata la línea base desde la bóveda y la degrada a gris.
    async fn hydrate_baseline(&self, baseline_path: &str) -> Option<image::GrayImage> {
        let (container, blob_name) = split_blob_path(baseline_path).ok()?;
        let baseline_bytes = self.blob_vault.download(container, blob_name).await.ok()?;
        let baseline_rgb = decode_rgb_image(&baseline_bytes).ok()?;
        Some(imageops::grayscale(&baseline_rgb))
    }
}
