// [libs/infra/db/src/repositories/camera.rs]
/*!
 * =================================================================
 * APARATO: CAMERA SURVEILLANCE REPOSITORY (V4.1 - INSPECTION LEDGER)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: CÁMARAS, MUESTRAS DE SALUD, RONDAS Y ALERTAS DE CÁMARA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. RUN IDEMPOTENCE: Las escrituras del inspector son idempotentes por
 *    ronda; una ronda se abre 'running' y se sella 'completed' con los
 *    conteos finales.
 * 2. BASELINE CUSTODY: La ruta de la imagen de línea base y su marca de
 *    actualización viven junto a la cámara.
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::{text_to_timestamp, text_to_variant, variant_to_text};
use crate::TursoClient;
use chrono::Utc;
use intellioptics_domain_models::camera::{
    Camera, CameraAlert, CameraHealthSample, CameraStatus, InspectionRun, InspectionRunStatus,
};
use libsql::{params, Row};
use tracing::{info, instrument};
use uuid::Uuid;

/// Repositorio de autoridad única de vigilancia de cámaras.
pub struct CameraRepository {
    database_client: TursoClient,
}

impl CameraRepository {
    /// Construye el repositorio inyectando el cliente táctico.
    pub fn new(client: TursoClient) -> Self {
        Self { database_client: client }
    }

    /// Registra (o reemplaza) una cámara.
    #[instrument(skip(self, camera), fields(camera = %camera.identifier))]
    pub async fn upsert_camera(&self, camera: &Camera) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        database_connection
            .execute(
                "INSERT INTO cameras
                    (identifier, hub_identifier, display_name, rtsp_url, current_status,
                     health_score, baseline_image_path, baseline_updated_at,
                     view_change_detected, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(identifier) DO UPDATE SET
                    hub_identifier = excluded.hub_identifier,
                    display_name = excluded.display_name,
                    rtsp_url = excluded.rtsp_url",
                params![
                    camera.identifier.clone(),
                    camera.hub_identifier.clone(),
                    camera.display_name.clone(),
                    camera.rtsp_url.clone(),
                    variant_to_text(&camera.current_status),
                    camera.health_score as f64,
                    camera.baseline_image_path.clone(),
                    camera.baseline_updated_at.map(|stamp| stamp.to_rfc3339()),
                    camera.view_change_detected as i64,
                    camera.created_at.to_rfc3339()
                ],
            )
            .await?;

        Ok(())
    }

    /// Listado completo de cámaras registradas.
    #[instrument(skip(self))]
    pub async fn list_cameras(&self) -> Result<Vec<Camera>, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query(
                "SELECT identifier, hub_identifier, display_name, rtsp_url, current_status,
                        health_score, baseline_image_path, baseline_updated_at,
                        view_change_detected, created_at
                   FROM cameras ORDER BY created_at ASC",
                (),
            )
            .await?;

        let mut camera_fleet = Vec::new();
        while let Some(data_row) = query_results.next().await? {
            camera_fleet.push(map_row_to_camera(&data_row)?);
        }
        Ok(camera_fleet)
    }

    /// Hidrata una cámara por identificador.
    pub async fn fetch_camera(&self, camera_identifier: &str) -> Result<Camera, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query(
                "SELECT identifier, hub_identifier, display_name, rtsp_url, current_status,
                        health_score, baseline_image_path, baseline_updated_at,
                        view_change_detected, created_at
                   FROM cameras WHERE identifier = ?1",
                params![camera_identifier],
            )
            .await?;

        match query_results.next().await? {
            Some(data_row) => map_row_to_camera(&data_row),
            None => Err(DbError::not_found("camera", camera_identifier)),
        }
    }

    /**
     * Sella el estado vigente de una cámara tras una inspección.
     */
    #[instrument(skip(self))]
    pub async fn seal_camera_status(
        &self,
        camera_identifier: &str,
        status: CameraStatus,
        health_score: f32,
        view_change_detected: bool,
    ) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        let sealed_rows = database_connection
            .execute(
                "UPDATE cameras
                    SET current_status = ?1, health_score = ?2, view_change_detected = ?3
                  WHERE identifier = ?4",
                params![
                    variant_to_text(&status),
                    health_score as f64,
                    view_change_detected as i64,
                    camera_identifier
                ],
            )
            .await?;

        if sealed_rows == 0 {
            return Err(DbError::not_found("camera", camera_identifier));
        }
        Ok(())
    }

    /// Sella la línea base (ruta del blob) de una cámara.
    #[instrument(skip(self))]
    pub async fn seal_baseline(&self, camera_identifier: &str, baseline_path: &str) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        database_connection
            .execute(
                "UPDATE cameras SET baseline_image_path = ?1, baseline_updated_at = ?2
                  WHERE identifier = ?3",
                params![baseline_path, Utc::now().to_rfc3339(), camera_identifier],
            )
            .await?;
        Ok(())
    }

    /// Registra una muestra de salud de una inspección.
    #[instrument(skip(self, sample), fields(camera = %sample.camera_identifier))]
    pub async fn insert_health_sample(&self, sample: &CameraHealthSample) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        database_connection
            .execute(
                "INSERT INTO camera_health
                    (identifier, camera_identifier, status, fps, expected_fps, resolution,
                     latency_ms, avg_brightness, sharpness_score, view_similarity_score,
                     view_change_detected, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    sample.identifier.clone(),
                    sample.camera_identifier.clone(),
                    variant_to_text(&sample.status),
                    sample.fps as f64,
                    sample.expected_fps as f64,
                    sample.resolution.clone(),
                    sample.latency_ms as i64,
                    sample.avg_brightness.map(|v| v as f64),
                    sample.sharpness_score.map(|v| v as f64),
                    sample.view_similarity_score.map(|v| v as f64),
                    sample.view_change_detected as i64,
                    sample.recorded_at.to_rfc3339()
                ],
            )
            .await?;
        Ok(())
    }

    /// Registra una alerta de cámara emitida por el inspector.
    #[instrument(skip(self, alert), fields(camera = %alert.camera_identifier))]
    pub async fn insert_camera_alert(&self, alert: &CameraAlert) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        database_connection
            .execute(
                "INSERT INTO camera_alerts
                    (identifier, camera_identifier, alert_type, severity, message, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    alert.identifier.clone(),
                    alert.camera_identifier.clone(),
                    variant_to_text(&alert.alert_type),
                    variant_to_text(&alert.severity),
                    alert.message.clone(),
                    alert.created_at.to_rfc3339()
                ],
            )
            .await?;

        info!("🚨 [CAMERA_REPO]: Alert {:?} sealed for camera {}.",
            alert.alert_type, alert.camera_identifier);
        Ok(())
    }

    /**
     * Abre una ronda de inspección ('running').
     */
    #[instrument(skip(self))]
    pub async fn open_inspection_run(&self) -> Result<InspectionRun, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let run = InspectionRun {
            identifier: Uuid::new_v4().to_string(),
            status: InspectionRunStatus::Running,
            total_cameras: 0,
            cameras_inspected: 0,
            cameras_healthy: 0,
            cameras_warning: 0,
            cameras_failed: 0,
            started_at: Utc::now(),
            completed_at: None,
        };

        database_connection
            .execute(
                "INSERT INTO inspection_runs (identifier, status, started_at)
                 VALUES (?1, 'running', ?2)",
                params![run.identifier.clone(), run.started_at.to_rfc3339()],
            )
            .await?;

        info!("🔍 [CAMERA_REPO]: Inspection run {} opened.", run.identifier);
        Ok(run)
    }

    /**
     * Sella una ronda con sus conteos finales ('completed'). Idempotente
     * por ronda: re-sellar sobrescribe los mismos conteos.
     */
    #[instrument(skip(self))]
    pub async fn seal_inspection_run(
        &self,
        run_identifier: &str,
        total_cameras: u32,
        cameras_healthy: u32,
        cameras_warning: u32,
        cameras_failed: u32,
    ) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        let sealed_rows = database_connection
            .execute(
                "UPDATE inspection_runs
                    SET status = 'completed', total_cameras = ?1, cameras_inspected = ?1,
                        cameras_healthy = ?2, cameras_warning = ?3, cameras_failed = ?4,
                        completed_at = ?5
                  WHERE identifier = ?6",
                params![
                    total_cameras as i64,
                    cameras_healthy as i64,
                    cameras_warning as i64,
                    cameras_failed as i64,
                    Utc::now().to_rfc3339(),
                    run_identifier
                ],
            )
            .await?;

        if sealed_rows == 0 {
            return Err(DbError::not_found("inspection_run", run_identifier));
        }
        Ok(())
    }
}

/// Hidrata una cámara desde la fila SQL.
fn map_row_to_camera(data_row: &Row) -> Result<Camera, DbError> {
    let identifier: String = data_row.get(0)?;
    let hub_identifier: Option<String> = data_row.get::<String>(1).ok();
    let display_name: String = data_row.get(2)?;
    let rtsp_url: String = data_row.get(3)?;
    let status_text: String = data_row.get(4)?;
    let health_score: f64 = data_row.get(5)?;
    let baseline_image_path: Option<String> = data_row.get::<String>(6).ok();
    let baseline_updated_at_text: Option<String> = data_row.get::<String>(7).ok();
    let view_change_detected: i64 = data_row.get(8)?;
    let created_at_text: String = data_row.get(9)?;

    Ok(Camera {
        identifier,
        hub_identifier,
        display_name,
        rtsp_url,
        current_status: text_to_variant("cameras.current_status", &status_text)?,
        health_score: health_score as f32,
        baseline_image_path,
        baseline_updated_at: baseline_updated_at_text
            .map(|stamp| text_to_timestamp("cameras.baseline_updated_at", &stamp))
            .transpose()?,
        view_change_detected: view_change_detected != 0,
        created_at: text_to_timestamp("cameras.created_at", &created_at_text)?,
    })
}
