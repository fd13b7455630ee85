// [libs/infra/db/src/repositories/query.rs]
/*!
 * =================================================================
 * APARATO: QUERY REPOSITORY (V4.5 - LIFECYCLE LEDGER)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: CICLO DE VIDA DE CONSULTAS, REVISIÓN Y CASCADA DE BORRADO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. STATE MACHINE SEAL: PENDING → DONE | ESCALATED | ERROR con sellos
 *    explícitos por transición; sin mutación de estados arbitraria.
 * 2. CONSECUTIVE WINDOW: Lecturas 'best-effort' de los últimos N
 *    veredictos por detector para el conteo consecutivo de alertas
 *    (linealizabilidad estricta NO requerida).
 * 3. CASCADE DISCIPLINE: El borrado elimina derivaciones, feedback y
 *    anotaciones en una transacción y retorna la ruta del blob para la
 *    purga externa.
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::{text_to_timestamp, text_to_variant, variant_to_text};
use crate::TursoClient;
use chrono::{DateTime, Utc};
use intellioptics_domain_models::inference::Detection;
use intellioptics_domain_models::query::{Annotation, Escalation, Feedback, Query, QueryStatus};
use libsql::params::Params;
use libsql::{params, Row};
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Tope duro de paginación del listado de consultas.
const LIST_PAGE_HARD_CAP: u32 = 100;

/// Filtros del listado paginado de consultas.
#[derive(Debug, Clone, Default)]
pub struct QueryListFilter {
    /// Registros a omitir (paginación).
    pub skip: u32,
    /// Tamaño de página solicitado (recortado al tope duro).
    pub limit: u32,
    /// true incluye consultas ya verificadas (con ground_truth).
    pub show_verified: bool,
    /// Filtro 'contiene' insensible a mayúsculas sobre result_label.
    pub label_filter: Option<String>,
    /// Solo consultas con confianza ≤ este valor.
    pub max_confidence: Option<f32>,
}

/// Agregado de métricas de verdad de terreno.
#[derive(Debug, Clone, serde::Serialize)]
pub struct GroundTruthMetrics {
    /// Consultas con verdad de terreno sellada.
    pub reviewed_count: u64,
    /// Veredictos correctos dentro de las revisadas.
    pub correct_count: u64,
    /// Matriz de confusión (predicho, verdad, conteo).
    pub confusion: Vec<(String, String, u64)>,
}

/// Repositorio de autoridad única del ciclo de vida de consultas.
pub struct QueryRepository {
    database_client: TursoClient,
}

impl QueryRepository {
    /// Construye el repositorio inyectando el cliente táctico.
    pub fn new(client: TursoClient) -> Self {
        Self { database_client: client }
    }

    /**
     * Cristaliza una consulta recién creada (estado PENDING).
     */
    #[instrument(skip(self, query), fields(query = %query.identifier))]
    pub async fn create(&self, query: &Query) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        database_connection
            .execute(
                "INSERT INTO queries
                    (identifier, detector_identifier, image_blob_path, status, result_label,
                     confidence, detections_json, local_inference, escalated, ground_truth,
                     is_correct, reviewed_by, reviewed_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    query.identifier.clone(),
                    query.detector_identifier.clone(),
                    query.image_blob_path.clone(),
                    variant_to_text(&query.status),
                    query.result_label.clone(),
                    query.confidence.map(|c| c as f64),
                    serde_json::to_string(&query.detections)
                        .map_err(|fault| DbError::MappingError(fault.to_string()))?,
                    query.local_inference as i64,
                    query.escalated as i64,
                    query.ground_truth.clone(),
                    query.is_correct.map(|c| c as i64),
                    query.reviewed_by.clone(),
                    query.reviewed_at.map(|stamp| stamp.to_rfc3339()),
                    query.created_at.to_rfc3339()
                ],
            )
            .await?;

        Ok(())
    }

    /// Hidrata una consulta por identificador.
    #[instrument(skip(self))]
    pub async fn fetch(&self, query_identifier: &str) -> Result<Query, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query(
                &format!("{} WHERE identifier = ?1", SELECT_QUERY_COLUMNS),
                params![query_identifier],
            )
            .await?;

        match query_results.next().await? {
            Some(data_row) => map_row_to_query(&data_row),
            None => Err(DbError::not_found("query", query_identifier)),
        }
    }

    /**
     * Sella el veredicto de inferencia de una consulta.
     */
    #[instrument(skip(self, detections))]
    pub async fn seal_inference_outcome(
        &self,
        query_identifier: &str,
        status: QueryStatus,
        result_label: &str,
        confidence: f32,
        detections: &[Detection],
        local_inference: bool,
    ) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        let sealed_rows = database_connection
            .execute(
                "UPDATE queries
                    SET status = ?1, result_label = ?2, confidence = ?3,
                        detections_json = ?4, local_inference = ?5
                  WHERE identifier = ?6",
                params![
                    variant_to_text(&status),
                    result_label,
                    confidence as f64,
                    serde_json::to_string(detections)
                        .map_err(|fault| DbError::MappingError(fault.to_string()))?,
                    local_inference as i64,
                    query_identifier
                ],
            )
            .await?;

        if sealed_rows == 0 {
            return Err(DbError::not_found("query", query_identifier));
        }
        Ok(())
    }

    /// Sella el colapso de inferencia (estado ERROR).
    #[instrument(skip(self))]
    pub async fn seal_error(&self, query_identifier: &str) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        database_connection
            .execute(
                "UPDATE queries SET status = 'ERROR' WHERE identifier = ?1",
                params![query_identifier],
            )
            .await?;
        Ok(())
    }

    /**
     * Sella la derivación de una consulta y registra la Escalation.
     */
    #[instrument(skip(self))]
    pub async fn seal_escalation(
        &self,
        query_identifier: &str,
        reason: &str,
    ) -> Result<Escalation, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let escalation = Escalation {
            identifier: Uuid::new_v4().to_string(),
            query_identifier: query_identifier.to_string(),
            reason: reason.to_string(),
            resolved: false,
            created_at: Utc::now(),
        };

        let database_transaction = database_connection
            .transaction()
            .await
            .map_err(|_| DbError::TransactionError)?;

        database_transaction
            .execute(
                "UPDATE queries SET status = 'ESCALATED', escalated = 1 WHERE identifier = ?1",
                params![query_identifier],
            )
            .await?;

        database_transaction
            .execute(
                "INSERT INTO escalations (identifier, query_identifier, reason, resolved, created_at)
                 VALUES (?1, ?2, ?3, 0, ?4)",
                params![
                    escalation.identifier.clone(),
                    escalation.query_identifier.clone(),
                    escalation.reason.clone(),
                    escalation.created_at.to_rfc3339()
                ],
            )
            .await?;

        database_transaction.commit().await.map_err(|_| DbError::TransactionError)?;

        info!("⚠️ [QUERY_REPO]: Query {} escalated. Reason: {}", query_identifier, reason);
        Ok(escalation)
    }

    /// Cierra una derivación por decisión de revisor.
    #[instrument(skip(self))]
    pub async fn resolve_escalation(&self, escalation_identifier: &str) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        let sealed_rows = database_connection
            .execute(
                "UPDATE escalations SET resolved = 1 WHERE identifier = ?1",
                params![escalation_identifier],
            )
            .await?;

        if sealed_rows == 0 {
            return Err(DbError::not_found("escalation", escalation_identifier));
        }
        Ok(())
    }

    /**
     * Registra feedback de revisor y sobreescribe el veredicto.
     */
    #[instrument(skip(self, feedback), fields(query = %feedback.query_identifier))]
    pub async fn apply_feedback(&self, feedback: &Feedback) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        let database_transaction = database_connection
            .transaction()
            .await
            .map_err(|_| DbError::TransactionError)?;

        database_transaction
            .execute(
                "INSERT INTO feedback
                    (identifier, query_identifier, reviewer_identifier, label,
                     confidence, notes, count, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    feedback.identifier.clone(),
                    feedback.query_identifier.clone(),
                    feedback.reviewer_identifier.clone(),
                    feedback.label.clone(),
                    feedback.confidence.map(|c| c as f64),
                    feedback.notes.clone(),
                    feedback.count,
                    feedback.created_at.to_rfc3339()
                ],
            )
            .await?;

        // El veredicto humano desplaza al veredicto del modelo.
        database_transaction
            .execute(
                "UPDATE queries
                    SET result_label = ?1,
                        confidence = COALESCE(?2, confidence),
                        status = 'DONE', escalated = 0
                  WHERE identifier = ?3",
                params![
                    feedback.label.clone(),
                    feedback.confidence.map(|c| c as f64),
                    feedback.query_identifier.clone()
                ],
            )
            .await?;

        database_transaction.commit().await.map_err(|_| DbError::TransactionError)?;
        Ok(())
    }

    /**
     * Sella la verdad de terreno ya reconciliada en el dominio.
     */
    #[instrument(skip(self, query), fields(query = %query.identifier))]
    pub async fn seal_ground_truth(&self, query: &Query) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        let sealed_rows = database_connection
            .execute(
                "UPDATE queries
                    SET ground_truth = ?1, is_correct = ?2, reviewed_by = ?3, reviewed_at = ?4
                  WHERE identifier = ?5",
                params![
                    query.ground_truth.clone(),
                    query.is_correct.map(|c| c as i64),
                    query.reviewed_by.clone(),
                    query.reviewed_at.map(|stamp| stamp.to_rfc3339()),
                    query.identifier.clone()
                ],
            )
            .await?;

        if sealed_rows == 0 {
            return Err(DbError::not_found("query", query.identifier.clone()));
        }
        Ok(())
    }

    /// Registra una anotación de imagen (objetivo de cascada).
    pub async fn insert_annotation(&self, annotation: &Annotation) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        database_connection
            .execute(
                "INSERT INTO annotations (identifier, query_identifier, payload_json, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    annotation.identifier.clone(),
                    annotation.query_identifier.clone(),
                    annotation.payload_json.clone(),
                    annotation.created_at.to_rfc3339()
                ],
            )
            .await?;
        Ok(())
    }

    /**
     * Cascada de borrado: derivaciones, feedback, anotaciones y la
     * consulta, en una única transacción.
     *
     * # Returns:
     * La ruta del blob de imagen para la purga externa en la bóveda.
     */
    #[instrument(skip(self))]
    pub async fn delete_cascade(&self, query_identifier: &str) -> Result<String, DbError> {
        let query = self.fetch(query_identifier).await?;
        let database_connection = self.database_client.get_connection()?;

        let database_transaction = database_connection
            .transaction()
            .await
            .map_err(|_| DbError::TransactionError)?;

        for lateral_purge in [
            "DELETE FROM escalations WHERE query_identifier = ?1",
            "DELETE FROM feedback WHERE query_identifier = ?1",
            "DELETE FROM annotations WHERE query_identifier = ?1",
            "DELETE FROM queries WHERE identifier = ?1",
        ] {
            database_transaction
                .execute(lateral_purge, params![query_identifier])
                .await?;
        }

        database_transaction.commit().await.map_err(|_| DbError::TransactionError)?;

        info!("🗑️ [QUERY_REPO]: Query {} cascade-deleted.", query_identifier);
        Ok(query.image_blob_path)
    }

    /**
     * Listado paginado con filtros de revisión.
     *
     * # Logic:
     * Los filtros dinámicos se compilan a marcadores posicionales y sus
     * valores viajan como parámetros ligados; ningún valor del llamador
     * se interpola en el texto SQL.
     *
     * # Returns:
     * (página de consultas, total de coincidencias sin paginar).
     */
    #[instrument(skip(self))]
    pub async fn list(&self, filter: &QueryListFilter) -> Result<(Vec<Query>, u64), DbError> {
        let database_connection = self.database_client.get_connection()?;

        // 1. COMPILACIÓN DE PREDICADOS (marcadores + valores ligados)
        let mut predicates: Vec<String> = Vec::new();
        let mut bound_values: Vec<libsql::Value> = Vec::new();

        if !filter.show_verified {
            predicates.push("ground_truth IS NULL".to_string());
        }
        if let Some(label_fragment) = &filter.label_filter {
            bound_values.push(libsql::Value::Text(format!(
                "%{}%",
                label_fragment.to_lowercase()
            )));
            predicates.push(format!("LOWER(result_label) LIKE ?{}", bound_values.len()));
        }
        if let Some(max_confidence) = filter.max_confidence {
            if max_confidence < 1.0 {
                bound_values.push(libsql::Value::Real(max_confidence as f64));
                predicates.push(format!("confidence <= ?{}", bound_values.len()));
            }
        }

        let where_clause = if predicates.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", predicates.join(" AND "))
        };

        // 2. CONTEO TOTAL SIN PAGINAR (mismos parámetros ligados)
        let mut count_results = database_connection
            .query(
                &format!("SELECT COUNT(*) FROM queries{}", where_clause),
                Params::Positional(bound_values.clone()),
            )
            .await?;
        let total: i64 = match count_results.next().await? {
            Some(data_row) => data_row.get(0)?,
            None => 0,
        };

        // 3. PÁGINA ORDENADA (la numeración de marcadores continúa)
        let page_limit = filter.limit.min(LIST_PAGE_HARD_CAP).max(1);
        let limit_marker = bound_values.len() + 1;
        let offset_marker = bound_values.len() + 2;

        let mut page_values = bound_values;
        page_values.push(libsql::Value::Integer(page_limit as i64));
        page_values.push(libsql::Value::Integer(filter.skip as i64));

        let mut query_results = database_connection
            .query(
                &format!(
                    "{}{} ORDER BY created_at DESC LIMIT ?{} OFFSET ?{}",
                    SELECT_QUERY_COLUMNS, where_clause, limit_marker, offset_marker
                ),
                Params::Positional(page_values),
            )
            .await?;

        let mut page = Vec::new();
        while let Some(data_row) = query_results.next().await? {
            page.push(map_row_to_query(&data_row)?);
        }

        Ok((page, total as u64))
    }

    /**
     * Últimos N veredictos de un detector, del más reciente al más
     * antiguo (conteo consecutivo de alertas; lectura best-effort).
     */
    #[instrument(skip(self))]
    pub async fn recent_result_labels(
        &self,
        detector_identifier: &str,
        window_size: u32,
    ) -> Result<Vec<String>, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query(
                "SELECT result_label FROM queries
                  WHERE detector_identifier = ?1 AND result_label IS NOT NULL
                  ORDER BY created_at DESC
                  LIMIT ?2",
                params![detector_identifier, window_size as i64],
            )
            .await?;

        let mut recent_labels = Vec::new();
        while let Some(data_row) = query_results.next().await? {
            recent_labels.push(data_row.get::<String>(0)?);
        }
        Ok(recent_labels)
    }

    /**
     * Conteo de veredictos coincidentes dentro de una ventana temporal.
     */
    #[instrument(skip(self))]
    pub async fn count_label_since(
        &self,
        detector_identifier: &str,
        result_label: &str,
        window_start: DateTime<Utc>,
    ) -> Result<u64, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query(
                "SELECT COUNT(*) FROM queries
                  WHERE detector_identifier = ?1
                    AND result_label = ?2
                    AND created_at >= ?3",
                params![detector_identifier, result_label, window_start.to_rfc3339()],
            )
            .await?;

        let matching: i64 = match query_results.next().await? {
            Some(data_row) => data_row.get(0)?,
            None => 0,
        };
        Ok(matching as u64)
    }

    /**
     * Métricas de verdad de terreno: precisión y matriz de confusión,
     * restringidas a consultas con 'ground_truth' sellada.
     */
    #[instrument(skip(self))]
    pub async fn ground_truth_metrics(&self) -> Result<GroundTruthMetrics, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query(
                "SELECT COALESCE(result_label, ''), ground_truth, COUNT(*)
                   FROM queries
                  WHERE ground_truth IS NOT NULL
                  GROUP BY result_label, ground_truth",
                (),
            )
            .await?;

        let mut metrics = GroundTruthMetrics {
            reviewed_count: 0,
            correct_count: 0,
            confusion: Vec::new(),
        };

        while let Some(data_row) = query_results.next().await? {
            let predicted: String = data_row.get(0)?;
            let ground_truth: String = data_row.get(1)?;
            let bucket_count: i64 = data_row.get(2)?;

            metrics.reviewed_count += bucket_count as u64;
            if predicted.to_lowercase() == ground_truth.to_lowercase() {
                metrics.correct_count += bucket_count as u64;
            }
            metrics.confusion.push((predicted, ground_truth, bucket_count as u64));
        }

        debug!(
            "📊 [QUERY_REPO]: Ground truth metrics -> {}/{} correct.",
            metrics.correct_count, metrics.reviewed_count
        );
        Ok(metrics)
    }
}

/// Proyección SQL canónica de la entidad Query.
const SELECT_QUERY_COLUMNS: &str =
    "SELECT identifier, detector_identifier, image_blob_path, status, result_label,
            confidence, detections_json, local_inference, escalated, ground_truth,
            is_correct, reviewed_by, reviewed_at, created_at
       FROM queries";

/// Hidrata una consulta desde la fila SQL.
fn map_row_to_query(data_row: &Row) -> Result<Query, DbError> {
    let identifier: String = data_row.get(0)?;
    let detector_identifier: Option<String> = data_row.get::<String>(1).ok();
    let image_blob_path: String = data_row.get(2)?;
    let status_text: String = data_row.get(3)?;
    let result_label: Option<String> = data_row.get::<String>(4).ok();
    let confidence: Option<f64> = data_row.get::<f64>(5).ok();
    let detections_json: String = data_row.get(6)?;
    let local_inference: i64 = data_row.get(7)?;
    let escalated: i64 = data_row.get(8)?;
    let ground_truth: Option<String> = data_row.get::<String>(9).ok();
    let is_correct: Option<i64> = data_row.get::<i64>(10).ok();
    let reviewed_by: Option<String> = data_row.get::<String>(11).ok();
    let reviewed_at_text: Option<String> = data_row.get::<String>(12).ok();
    let created_at_text: String = data_row.get(13)?;

    let detections: Vec<Detection> = serde_json::from_str(&detections_json)
        .map_err(|fault| DbError::MappingError(format!("detections_json: {}", fault)))?;

    Ok(Query {
        identifier,
        detector_identifier,
        image_blob_path,
        status: text_to_variant("queries.status", &status_text)?,
        result_label,
        confidence: confidence.map(|c| c as f32),
        detections,
        local_inference: local_inference != 0,
        escalated: escalated != 0,
        ground_truth,
        is_correct: is_correct.map(|flag| flag != 0),
        reviewed_by,
        reviewed_at: reviewed_at_text
            .map(|stamp| text_to_timestamp("queries.reviewed_at", &stamp))
            .transpose()?,
        created_at: text_to_timestamp("queries.created_at", &created_at_text)?,
    })
}
