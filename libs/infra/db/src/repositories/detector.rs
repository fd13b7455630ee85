// [libs/infra/db/src/repositories/detector.rs]
/*!
 * =================================================================
 * APARATO: DETECTOR REPOSITORY (V4.3 - SOFT DELETE GUARD)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: CUSTODIA DE DETECTORES Y SU CONFIGURACIÓN EXTENDIDA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. VISIBILITY DISCIPLINE: Ningún listado que excluya borrados retorna
 *    un detector con 'deleted_at' sellado; la resolución para inferencia
 *    distingue semánticamente 'ausente' de 'borrado lógicamente'.
 * 2. TYPED CONFIG LEDGER: La configuración extendida persiste como JSON
 *    tipado y se valida contra 'class_names' al hidratarse.
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::{text_to_timestamp, text_to_variant, variant_to_text};
use crate::TursoClient;
use chrono::Utc;
use intellioptics_domain_models::detector::{Detector, DetectorConfig};
use libsql::{params, Row};
use tracing::{debug, info, instrument};

/// Repositorio de autoridad única para la gestión de detectores.
pub struct DetectorRepository {
    database_client: TursoClient,
}

impl DetectorRepository {
    /// Construye el repositorio inyectando el cliente táctico.
    pub fn new(client: TursoClient) -> Self {
        Self { database_client: client }
    }

    /**
     * Registra un detector nuevo (o reemplaza su definición completa).
     */
    #[instrument(skip(self, detector), fields(detector = %detector.identifier))]
    pub async fn upsert_detector(&self, detector: &Detector) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        let class_names_json = serde_json::to_string(&detector.class_names)
            .map_err(|fault| DbError::MappingError(fault.to_string()))?;

        database_connection
            .execute(
                "INSERT INTO detectors
                    (identifier, display_name, group_name, query_text, mode,
                     class_names_json, confidence_threshold, patience_time_seconds,
                     primary_model_blob_path, oodd_model_blob_path, deleted_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                 ON CONFLICT(identifier) DO UPDATE SET
                    display_name = excluded.display_name,
                    group_name = excluded.group_name,
                    query_text = excluded.query_text,
                    mode = excluded.mode,
                    class_names_json = excluded.class_names_json,
                    confidence_threshold = excluded.confidence_threshold,
                    patience_time_seconds = excluded.patience_time_seconds,
                    primary_model_blob_path = excluded.primary_model_blob_path,
                    oodd_model_blob_path = excluded.oodd_model_blob_path",
                params![
                    detector.identifier.clone(),
                    detector.display_name.clone(),
                    detector.group_name.clone(),
                    detector.query_text.clone(),
                    variant_to_text(&detector.mode),
                    class_names_json,
                    detector.confidence_threshold as f64,
                    detector.patience_time_seconds as f64,
                    detector.primary_model_blob_path.clone(),
                    detector.oodd_model_blob_path.clone(),
                    detector.deleted_at.map(|stamp| stamp.to_rfc3339()),
                    detector.created_at.to_rfc3339()
                ],
            )
            .await?;

        info!("🧿 [DETECTOR_REPO]: Detector {} crystallized.", detector.identifier);
        Ok(())
    }

    /**
     * Resuelve un detector VISIBLE para inferencia.
     *
     * # Errors:
     * - `RecordNotFound`: El identificador no existe.
     * - `SoftDeleted`: El detector porta sello de borrado lógico.
     */
    #[instrument(skip(self))]
    pub async fn fetch_visible_detector(&self, detector_identifier: &str) -> Result<Detector, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query(
                "SELECT identifier, display_name, group_name, query_text, mode,
                        class_names_json, confidence_threshold, patience_time_seconds,
                        primary_model_blob_path, oodd_model_blob_path, deleted_at, created_at
                   FROM detectors WHERE identifier = ?1",
                params![detector_identifier],
            )
            .await?;

        let Some(data_row) = query_results.next().await? else {
            return Err(DbError::not_found("detector", detector_identifier));
        };

        let detector = map_row_to_detector(&data_row)?;

        if detector.deleted_at.is_some() {
            return Err(DbError::SoftDeleted {
                entity: "detector",
                identifier: detector_identifier.to_string(),
            });
        }

        Ok(detector)
    }

    /// Listado de detectores visibles (excluye borrados lógicos).
    #[instrument(skip(self))]
    pub async fn list_visible(&self) -> Result<Vec<Detector>, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query(
                "SELECT identifier, display_name, group_name, query_text, mode,
                        class_names_json, confidence_threshold, patience_time_seconds,
                        primary_model_blob_path, oodd_model_blob_path, deleted_at, created_at
                   FROM detectors
                  WHERE deleted_at IS NULL
                  ORDER BY created_at DESC",
                (),
            )
            .await?;

        let mut visible_detectors = Vec::new();
        while let Some(data_row) = query_results.next().await? {
            visible_detectors.push(map_row_to_detector(&data_row)?);
        }
        Ok(visible_detectors)
    }

    /**
     * Sella el borrado lógico de un detector.
     */
    #[instrument(skip(self))]
    pub async fn soft_delete(&self, detector_identifier: &str) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        let sealed_rows = database_connection
            .execute(
                "UPDATE detectors SET deleted_at = ?1 WHERE identifier = ?2 AND deleted_at IS NULL",
                params![Utc::now().to_rfc3339(), detector_identifier],
            )
            .await?;

        if sealed_rows == 0 {
            return Err(DbError::not_found("detector", detector_identifier));
        }

        info!("🪦 [DETECTOR_REPO]: Detector {} soft-deleted.", detector_identifier);
        Ok(())
    }

    /**
     * Hidrata la configuración extendida; en su ausencia rigen los defaults.
     */
    #[instrument(skip(self))]
    pub async fn fetch_config(&self, detector_identifier: &str) -> Result<DetectorConfig, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query(
                "SELECT per_class_thresholds_json, detection_params_json,
                        model_input_config_json, edge_inference_enabled
                   FROM detector_configs WHERE detector_identifier = ?1",
                params![detector_identifier],
            )
            .await?;

        let Some(data_row) = query_results.next().await? else {
            debug!("⚪ [DETECTOR_REPO]: No extended config for {}; defaults in force.", detector_identifier);
            return Ok(DetectorConfig {
                detector_identifier: detector_identifier.to_string(),
                ..DetectorConfig::default()
            });
        };

        let per_class_thresholds_json: String = data_row.get(0)?;
        let detection_params_json: String = data_row.get(1)?;
        let model_input_config_json: String = data_row.get(2)?;
        let edge_inference_enabled: i64 = data_row.get(3)?;

        Ok(DetectorConfig {
            detector_identifier: detector_identifier.to_string(),
            per_class_thresholds: serde_json::from_str(&per_class_thresholds_json)
                .map_err(|fault| DbError::MappingError(format!("per_class_thresholds: {}", fault)))?,
            detection_params: serde_json::from_str(&detection_params_json)
                .unwrap_or_default(),
            model_input_config: serde_json::from_str(&model_input_config_json)
                .unwrap_or_default(),
            edge_inference_enabled: edge_inference_enabled != 0,
        })
    }

    /**
     * Persiste la configuración extendida de un detector.
     */
    #[instrument(skip(self, config), fields(detector = %config.detector_identifier))]
    pub async fn upsert_config(&self, config: &DetectorConfig) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        let serialize = |label: &str, value: serde_json::Result<String>| {
            value.map_err(|fault| DbError::MappingError(format!("{}: {}", label, fault)))
        };

        database_connection
            .execute(
                "INSERT INTO detector_configs
                    (detector_identifier, per_class_thresholds_json, detection_params_json,
                     model_input_config_json, edge_inference_enabled)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(detector_identifier) DO UPDATE SET
                    per_class_thresholds_json = excluded.per_class_thresholds_json,
                    detection_params_json = excluded.detection_params_json,
                    model_input_config_json = excluded.model_input_config_json,
                    edge_inference_enabled = excluded.edge_inference_enabled",
                params![
                    config.detector_identifier.clone(),
                    serialize("per_class_thresholds", serde_json::to_string(&config.per_class_thresholds))?,
                    serialize("detection_params", serde_json::to_string(&config.detection_params))?,
                    serialize("model_input_config", serde_json::to_string(&config.model_input_config))?,
                    config.edge_inference_enabled as i64
                ],
            )
            .await?;

        Ok(())
    }
}

/// Hidrata un registro de detector desde la fila SQL.
fn map_row_to_detector(data_row: &Row) -> Result<Detector, DbError> {
    let identifier: String = data_row.get(0)?;
    let display_name: String = data_row.get(1)?;
    let group_name: Option<String> = data_row.get::<String>(2).ok();
    let query_text: String = data_row.get(3)?;
    let mode_text: String = data_row.get(4)?;
    let class_names_json: String = data_row.get(5)?;
    let confidence_threshold: f64 = data_row.get(6)?;
    let patience_time_seconds: f64 = data_row.get(7)?;
    let primary_model_blob_path: Option<String> = data_row.get::<String>(8).ok();
    let oodd_model_blob_path: Option<String> = data_row.get::<String>(9).ok();
    let deleted_at_text: Option<String> = data_row.get::<String>(10).ok();
    let created_at_text: String = data_row.get(11)?;

    Ok(Detector {
        identifier,
        display_name,
        group_name,
        query_text,
        mode: text_to_variant("detectors.mode", &mode_text)?,
        class_names: serde_json::from_str(&class_names_json)
            .map_err(|fault| DbError::MappingError(format!("class_names: {}", fault)))?,
        confidence_threshold: confidence_threshold as f32,
        patience_time_seconds: patience_time_seconds as f32,
        primary_model_blob_path,
        oodd_model_blob_path,
        deleted_at: deleted_at_text
            .map(|stamp| text_to_timestamp("detectors.deleted_at", &stamp))
            .transpose()?,
        created_at: text_to_timestamp("detectors.created_at", &created_at_text)?,
    })
}
