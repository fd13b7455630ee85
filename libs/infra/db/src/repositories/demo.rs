// [libs/infra/db/src/repositories/demo.rs]
/*!
 * =================================================================
 * APARATO: DEMO SESSION REPOSITORY (V4.1 - ATOMIC COUNTERS)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: SESIONES DE CAPTURA SUPERVISADA Y RESULTADOS POR FRAME
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. ATOMIC COUNTERS: Los incrementos de frames/detecciones se ejecutan
 *    como UPDATE relativo en el motor, no como read-modify-write.
 * 2. OBSERVABLE STATUS: active → stopped | error; el estado persiste el
 *    veredicto del supervisor de tareas.
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::{text_to_timestamp, text_to_variant, variant_to_text};
use crate::TursoClient;
use intellioptics_domain_models::demo::{DemoDetectionResult, DemoSession, DemoSessionStatus};
use intellioptics_domain_models::query::QueryStatus;
use libsql::{params, Row};
use tracing::{info, instrument};

/// Repositorio de autoridad única de sesiones de demo.
pub struct DemoRepository {
    database_client: TursoClient,
}

impl DemoRepository {
    /// Construye el repositorio inyectando el cliente táctico.
    pub fn new(client: TursoClient) -> Self {
        Self { database_client: client }
    }

    /// Cristaliza una sesión recién configurada.
    #[instrument(skip(self, session), fields(session = %session.identifier))]
    pub async fn create_session(&self, session: &DemoSession) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        database_connection
            .execute(
                "INSERT INTO demo_sessions
                    (identifier, source_url, capture_mode, detector_identifiers_json,
                     yoloworld_prompts, status, total_frames_captured, total_detections,
                     polling_interval_ms, motion_threshold, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    session.identifier.clone(),
                    session.source_url.clone(),
                    variant_to_text(&session.capture_mode),
                    serde_json::to_string(&session.detector_identifiers)
                        .map_err(|fault| DbError::MappingError(fault.to_string()))?,
                    session.yoloworld_prompts.clone(),
                    variant_to_text(&session.status),
                    session.total_frames_captured as i64,
                    session.total_detections as i64,
                    session.polling_interval_ms as i64,
                    session.motion_threshold as f64,
                    session.created_at.to_rfc3339()
                ],
            )
            .await?;

        info!("🎬 [DEMO_REPO]: Session {} crystallized.", session.identifier);
        Ok(())
    }

    /// Hidrata una sesión por identificador.
    pub async fn fetch_session(&self, session_identifier: &str) -> Result<DemoSession, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query(
                "SELECT identifier, source_url, capture_mode, detector_identifiers_json,
                        yoloworld_prompts, status, total_frames_captured, total_detections,
                        polling_interval_ms, motion_threshold, created_at
                   FROM demo_sessions WHERE identifier = ?1",
                params![session_identifier],
            )
            .await?;

        match query_results.next().await? {
            Some(data_row) => map_row_to_session(&data_row),
            None => Err(DbError::not_found("demo_session", session_identifier)),
        }
    }

    /// Sella el estado observable de una sesión.
    #[instrument(skip(self))]
    pub async fn seal_session_status(
        &self,
        session_identifier: &str,
        status: DemoSessionStatus,
    ) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        let sealed_rows = database_connection
            .execute(
                "UPDATE demo_sessions SET status = ?1 WHERE identifier = ?2",
                params![variant_to_text(&status), session_identifier],
            )
            .await?;

        if sealed_rows == 0 {
            return Err(DbError::not_found("demo_session", session_identifier));
        }
        Ok(())
    }

    /// Incremento atómico del contador de frames capturados.
    pub async fn increment_frames_captured(&self, session_identifier: &str) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        database_connection
            .execute(
                "UPDATE demo_sessions
                    SET total_frames_captured = total_frames_captured + 1
                  WHERE identifier = ?1",
                params![session_identifier],
            )
            .await?;
        Ok(())
    }

    /// Incremento atómico del contador de detecciones finalizadas.
    pub async fn increment_detections(&self, session_identifier: &str) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        database_connection
            .execute(
                "UPDATE demo_sessions
                    SET total_detections = total_detections + 1
                  WHERE identifier = ?1",
                params![session_identifier],
            )
            .await?;
        Ok(())
    }

    /// Cristaliza un resultado de detección por frame (PENDING).
    #[instrument(skip(self, result), fields(session = %result.session_identifier))]
    pub async fn insert_result(&self, result: &DemoDetectionResult) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        database_connection
            .execute(
                "INSERT INTO demo_detection_results
                    (identifier, session_identifier, query_identifier, detector_identifier,
                     frame_number, capture_method, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    result.identifier.clone(),
                    result.session_identifier.clone(),
                    result.query_identifier.clone(),
                    result.detector_identifier.clone(),
                    result.frame_number as i64,
                    variant_to_text(&result.capture_method),
                    variant_to_text(&result.status),
                    result.created_at.to_rfc3339()
                ],
            )
            .await?;
        Ok(())
    }

    /// Sella el estado final de un resultado de detección.
    pub async fn seal_result_status(
        &self,
        result_identifier: &str,
        status: QueryStatus,
    ) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        database_connection
            .execute(
                "UPDATE demo_detection_results SET status = ?1 WHERE identifier = ?2",
                params![variant_to_text(&status), result_identifier],
            )
            .await?;
        Ok(())
    }
}

/// Hidrata una sesión desde la fila SQL.
fn map_row_to_session(data_row: &Row) -> Result<DemoSession, DbError> {
    let identifier: String = data_row.get(0)?;
    let source_url: String = data_row.get(1)?;
    let capture_mode_text: String = data_row.get(2)?;
    let detector_identifiers_json: String = data_row.get(3)?;
    let yoloworld_prompts: Option<String> = data_row.get::<String>(4).ok();
    let status_text: String = data_row.get(5)?;
    let total_frames_captured: i64 = data_row.get(6)?;
    let total_detections: i64 = data_row.get(7)?;
    let polling_interval_ms: i64 = data_row.get(8)?;
    let motion_threshold: f64 = data_row.get(9)?;
    let created_at_text: String = data_row.get(10)?;

    Ok(DemoSession {
        identifier,
        source_url,
        capture_mode: text_to_variant("demo_sessions.capture_mode", &capture_mode_text)?,
        detector_identifiers: serde_json::from_str(&detector_identifiers_json)
            .map_err(|fault| DbError::MappingError(format!("detector_identifiers: {}", fault)))?,
        yoloworld_prompts,
        status: text_to_variant("demo_sessions.status", &status_text)?,
        total_frames_captured: total_frames_captured as u64,
        total_detections: total_detections as u64,
        polling_interval_ms: polling_interval_ms as u64,
        motion_threshold: motion_threshold as f32,
        created_at: text_to_timestamp("demo_sessions.created_at", &created_at_text)?,
    })
}
