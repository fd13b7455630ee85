// [libs/infra/db/src/repositories/alert.rs]
/*!
 * =================================================================
 * APARATO: HERALD ALERT REPOSITORY (V4.2 - COOLDOWN SEAL)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: CONFIGURACIÓN DE ALERTAS, RASTRO HISTÓRICO Y COOLDOWN
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. PERSIST-BEFORE-SEND: El registro de alerta se cristaliza ANTES de
 *    cualquier despacho; las banderas de entrega se sellan después.
 * 2. COOLDOWN WINDOW: La verificación de cooldown observa todas las
 *    alertas previamente persistidas del detector (ordering garantizado
 *    dentro de una invocación del motor).
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::{text_to_timestamp, text_to_variant, variant_to_text};
use crate::TursoClient;
use chrono::{DateTime, Utc};
use intellioptics_domain_models::alert::{DetectorAlert, DetectorAlertConfig};
use libsql::params;
use tracing::{debug, info, instrument};

/// Repositorio de autoridad única del subsistema de alertas.
pub struct AlertRepository {
    database_client: TursoClient,
}

impl AlertRepository {
    /// Construye el repositorio inyectando el cliente táctico.
    pub fn new(client: TursoClient) -> Self {
        Self { database_client: client }
    }

    /**
     * Hidrata la configuración de alertado de un detector, si existe.
     */
    #[instrument(skip(self))]
    pub async fn fetch_alert_config(
        &self,
        detector_identifier: &str,
    ) -> Result<Option<DetectorAlertConfig>, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query(
                "SELECT enabled, condition_type, condition_value, consecutive_count,
                        time_window_minutes, alert_emails_json, alert_phones_json,
                        alert_webhooks_json, severity, cooldown_minutes, custom_message,
                        alert_name, include_image
                   FROM detector_alert_configs
                  WHERE detector_identifier = ?1",
                params![detector_identifier],
            )
            .await?;

        let Some(data_row) = query_results.next().await? else {
            return Ok(None);
        };

        let enabled: i64 = data_row.get(0)?;
        let condition_type_text: String = data_row.get(1)?;
        let condition_value: Option<String> = data_row.get::<String>(2).ok();
        let consecutive_count: i64 = data_row.get(3)?;
        let time_window_minutes: Option<i64> = data_row.get::<i64>(4).ok();
        let alert_emails_json: String = data_row.get(5)?;
        let alert_phones_json: String = data_row.get(6)?;
        let alert_webhooks_json: String = data_row.get(7)?;
        let severity_text: String = data_row.get(8)?;
        let cooldown_minutes: i64 = data_row.get(9)?;
        let custom_message: Option<String> = data_row.get::<String>(10).ok();
        let alert_name: Option<String> = data_row.get::<String>(11).ok();
        let include_image: i64 = data_row.get(12)?;

        let decode_list = |label: &str, raw: &str| -> Result<Vec<String>, DbError> {
            serde_json::from_str(raw)
                .map_err(|fault| DbError::MappingError(format!("{}: {}", label, fault)))
        };

        Ok(Some(DetectorAlertConfig {
            detector_identifier: detector_identifier.to_string(),
            enabled: enabled != 0,
            condition_type: text_to_variant("detector_alert_configs.condition_type", &condition_type_text)?,
            condition_value,
            consecutive_count: consecutive_count.max(1) as u32,
            time_window_minutes: time_window_minutes.map(|w| w as u32),
            alert_emails: decode_list("alert_emails", &alert_emails_json)?,
            alert_phones: decode_list("alert_phones", &alert_phones_json)?,
            alert_webhooks: decode_list("alert_webhooks", &alert_webhooks_json)?,
            severity: text_to_variant("detector_alert_configs.severity", &severity_text)?,
            cooldown_minutes: cooldown_minutes.max(0) as u32,
            custom_message,
            alert_name,
            include_image: include_image != 0,
        }))
    }

    /**
     * Persiste (o reemplaza) la configuración de alertado de un detector.
     */
    #[instrument(skip(self, config), fields(detector = %config.detector_identifier))]
    pub async fn upsert_alert_config(&self, config: &DetectorAlertConfig) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        let encode_list = |label: &str, list: &[String]| -> Result<String, DbError> {
            serde_json::to_string(list)
                .map_err(|fault| DbError::MappingError(format!("{}: {}", label, fault)))
        };

        database_connection
            .execute(
                "INSERT INTO detector_alert_configs
                    (detector_identifier, enabled, condition_type, condition_value,
                     consecutive_count, time_window_minutes, alert_emails_json,
                     alert_phones_json, alert_webhooks_json, severity, cooldown_minutes,
                     custom_message, alert_name, include_image)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                 ON CONFLICT(detector_identifier) DO UPDATE SET
                    enabled = excluded.enabled,
                    condition_type = excluded.condition_type,
                    condition_value = excluded.condition_value,
                    consecutive_count = excluded.consecutive_count,
                    time_window_minutes = excluded.time_window_minutes,
                    alert_emails_json = excluded.alert_emails_json,
                    alert_phones_json = excluded.alert_phones_json,
                    alert_webhooks_json = excluded.alert_webhooks_json,
                    severity = excluded.severity,
                    cooldown_minutes = excluded.cooldown_minutes,
                    custom_message = excluded.custom_message,
                    alert_name = excluded.alert_name,
                    include_image = excluded.include_image",
                params![
                    config.detector_identifier.clone(),
                    config.enabled as i64,
                    variant_to_text(&config.condition_type),
                    config.condition_value.clone(),
                    config.consecutive_count as i64,
                    config.time_window_minutes.map(|w| w as i64),
                    encode_list("alert_emails", &config.alert_emails)?,
                    encode_list("alert_phones", &config.alert_phones)?,
                    encode_list("alert_webhooks", &config.alert_webhooks)?,
                    variant_to_text(&config.severity),
                    config.cooldown_minutes as i64,
                    config.custom_message.clone(),
                    config.alert_name.clone(),
                    config.include_image as i64
                ],
            )
            .await?;

        Ok(())
    }

    /**
     * Cristaliza el registro histórico de una alerta (antes del despacho).
     */
    #[instrument(skip(self, alert), fields(alert = %alert.identifier))]
    pub async fn insert_alert(&self, alert: &DetectorAlert) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        database_connection
            .execute(
                "INSERT INTO detector_alerts
                    (identifier, detector_identifier, query_identifier, severity, message,
                     detection_label, detection_confidence, camera_name, image_blob_path,
                     acknowledged, email_sent, sms_sent, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    alert.identifier.clone(),
                    alert.detector_identifier.clone(),
                    alert.query_identifier.clone(),
                    variant_to_text(&alert.severity),
                    alert.message.clone(),
                    alert.detection_label.clone(),
                    alert.detection_confidence as f64,
                    alert.camera_name.clone(),
                    alert.image_blob_path.clone(),
                    alert.acknowledged as i64,
                    alert.email_sent as i64,
                    alert.sms_sent as i64,
                    alert.created_at.to_rfc3339()
                ],
            )
            .await?;

        info!("🔔 [ALERT_REPO]: Alert {} crystallized for detector {}.",
            alert.identifier, alert.detector_identifier);
        Ok(())
    }

    /**
     * Marca temporal de la alerta más reciente del detector posterior al
     * corte (verificación de cooldown).
     */
    #[instrument(skip(self))]
    pub async fn latest_alert_since(
        &self,
        detector_identifier: &str,
        cooldown_window_start: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut query_results = database_connection
            .query(
                "SELECT created_at FROM detector_alerts
                  WHERE detector_identifier = ?1 AND created_at > ?2
                  ORDER BY created_at DESC
                  LIMIT 1",
                params![detector_identifier, cooldown_window_start.to_rfc3339()],
            )
            .await?;

        match query_results.next().await? {
            Some(data_row) => {
                let created_at_text: String = data_row.get(0)?;
                Ok(Some(text_to_timestamp("detector_alerts.created_at", &created_at_text)?))
            }
            None => Ok(None),
        }
    }

    /// Sella la bandera de entrega de correo.
    pub async fn seal_email_delivery(&self, alert_identifier: &str) -> Result<(), DbError> {
        self.seal_delivery_flag(alert_identifier, "email_sent").await
    }

    /// Sella la bandera de entrega SMS.
    pub async fn seal_sms_delivery(&self, alert_identifier: &str) -> Result<(), DbError> {
        self.seal_delivery_flag(alert_identifier, "sms_sent").await
    }

    async fn seal_delivery_flag(
        &self,
        alert_identifier: &str,
        delivery_column: &'static str,
    ) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        database_connection
            .execute(
                &format!("UPDATE detector_alerts SET {} = 1 WHERE identifier = ?1", delivery_column),
                params![alert_identifier],
            )
            .await?;

        debug!("📮 [ALERT_REPO]: Delivery flag '{}' sealed for {}.", delivery_column, alert_identifier);
        Ok(())
    }

    /// Reconocimiento de una alerta por un operador.
    #[instrument(skip(self))]
    pub async fn acknowledge(&self, alert_identifier: &str, operator_identifier: &str) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        let sealed_rows = database_connection
            .execute(
                "UPDATE detector_alerts SET acknowledged = 1, acknowledged_by = ?1 WHERE identifier = ?2",
                params![operator_identifier, alert_identifier],
            )
            .await?;

        if sealed_rows == 0 {
            return Err(DbError::not_found("detector_alert", alert_identifier));
        }
        Ok(())
    }
}
