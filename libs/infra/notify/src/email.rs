// [libs/infra/notify/src/email.rs]
/*!
 * =================================================================
 * APARATO: EMAIL ALERT DISPATCHER (V4.2 - HTML TEMPLATED)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: DESPACHO DE CORREO HTML VÍA API DEL PROVEEDOR
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. PROVIDER API: Despacho por la API v3 de correo transaccional
 *    (Bearer key, payload 'personalizations'); sin SMTP embebido.
 * 2. TEMPLATE FALLBACK: El cuerpo HTML se renderiza desde la plantilla
 *    embebida de alerta con severidad, detector, confianza e imagen.
 * =================================================================
 */

use crate::errors::NotifyError;
use reqwest::Client;
use serde_json::json;
use tracing::{info, instrument, warn};

/// Endpoint de la API de correo transaccional.
const MAIL_API_ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";

/// Despachador soberano de correo de alertas.
pub struct EmailDispatcher {
    network_client: Client,
    provider_api_key: Option<String>,
    sender_address: String,
}

impl EmailDispatcher {
    /**
     * Forja el despachador. Sin API key el canal queda en no-op.
     */
    pub fn new(provider_api_key: Option<String>, sender_address: String) -> Self {
        if provider_api_key.is_none() {
            warn!("📭 [EMAIL]: Provider key absent; email channel in standby mode.");
        }

        Self {
            network_client: Client::builder()
                .timeout(std::time::Duration::from_secs(15))
                .build()
                .expect("FATAL: Email client initialization failed."),
            provider_api_key,
            sender_address,
        }
    }

    /**
     * Despacha un correo HTML a los destinatarios.
     *
     * # Errors:
     * - `ChannelUnconfigured`: Canal sin credenciales (no-op advertido).
     * - `ProviderRejection`: La API devolvió estatus no-2xx.
     */
    #[instrument(skip(self, html_body), fields(recipients = recipients.len()))]
    pub async fn send_html(
        &self,
        recipients: &[String],
        subject: &str,
        html_body: &str,
    ) -> Result<(), NotifyError> {
        let Some(api_key) = &self.provider_api_key else {
            return Err(NotifyError::ChannelUnconfigured("email"));
        };

        if recipients.is_empty() {
            warn!("📭 [EMAIL]: No recipients configured; dispatch skipped.");
            return Ok(());
        }

        let payload = json!({
            "personalizations": [{
                "to": recipients.iter().map(|address| json!({"email": address})).collect::<Vec<_>>(),
            }],
            "from": {"email": self.sender_address},
            "subject": subject,
            "content": [{"type": "text/html", "value": html_body}],
        });

        let provider_response = self
            .network_client
            .post(MAIL_API_ENDPOINT)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;

        if provider_response.status().is_success() {
            info!("📧 [EMAIL]: Alert mail delivered to {} recipient(s).", recipients.len());
            Ok(())
        } else {
            Err(NotifyError::ProviderRejection(provider_response.status().as_u16()))
        }
    }
}

/**
 * Renderiza el cuerpo HTML de una alerta de detector.
 *
 * # Logic:
 * Plantilla embebida de respaldo: título, imagen opcional, detector,
 * detección con confianza porcentual y marca temporal UTC.
 */
pub fn render_alert_email_html(
    alert_title: &str,
    detector_name: &str,
    detection_label: &str,
    confidence: f32,
    camera_name: Option<&str>,
    image_url: Option<&str>,
) -> String {
    let image_fragment = image_url
        .map(|url| format!(r#"<img src="{}" style="max-width: 400px;">"#, url))
        .unwrap_or_default();

    let camera_fragment = camera_name
        .map(|name| format!("<p><strong>Camera:</strong> {}</p>", name))
        .unwrap_or_default();

    format!(
        r#"<html>
<body style="font-family: Arial, sans-serif; background-color: #1a1a2e; color: white; padding: 20px;">
    <h2>IntelliOptics Alert</h2>
    <h3>{title}</h3>
    {image}
    <p><strong>Detector:</strong> {detector}</p>
    <p><strong>Detection:</strong> {label} ({confidence_pct}%)</p>
    {camera}
    <p><strong>Time:</strong> {timestamp}</p>
    <hr>
    <p><em>This is an automated alert from the IntelliOptics inspection platform.</em></p>
</body>
</html>"#,
        title = alert_title,
        image = image_fragment,
        detector = detector_name,
        label = detection_label,
        confidence_pct = (confidence * 100.0).round() as i64,
        camera = camera_fragment,
        timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn certify_template_rendering() {
        let html = render_alert_email_html(
            "fire detected",
            "Fire Watch",
            "fire",
            0.93,
            Some("dock-cam-02"),
            None,
        );

        assert!(html.contains("fire detected"));
        assert!(html.contains("Fire Watch"));
        assert!(html.contains("(93%)"));
        assert!(html.contains("dock-cam-02"));
        assert!(!html.contains("<img"));
    }
}
