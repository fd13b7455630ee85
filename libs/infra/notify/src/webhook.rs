// [libs/infra/notify/src/webhook.rs]
/*!
 * =================================================================
 * APARATO: WEBHOOK ALERT DISPATCHER (V4.0 - JSON POST)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: ENTREGA DEL REGISTRO DE ALERTA A ENDPOINTS EXTERNOS
 * =================================================================
 */

use crate::errors::NotifyError;
use reqwest::Client;
use serde::Serialize;
use tracing::{info, instrument, warn};

/// Despachador soberano de webhooks de alerta.
pub struct WebhookDispatcher {
    network_client: Client,
}

impl WebhookDispatcher {
    /// Forja el despachador con la ventana de contrato (10 s).
    pub fn new() -> Self {
        Self {
            network_client: Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("FATAL: Webhook client initialization failed."),
        }
    }

    /**
     * Entrega el payload a cada endpoint configurado (mejor esfuerzo).
     *
     * # Returns:
     * Cantidad de endpoints que aceptaron la entrega.
     */
    #[instrument(skip(self, payload), fields(endpoints = webhook_urls.len()))]
    pub async fn post_to_all<T: Serialize>(
        &self,
        webhook_urls: &[String],
        payload: &T,
    ) -> Result<usize, NotifyError> {
        let mut accepted_deliveries = 0_usize;

        for webhook_url in webhook_urls {
            match self.network_client.post(webhook_url).json(payload).send().await {
                Ok(endpoint_response) if endpoint_response.status().is_success() => {
                    info!("🪝 [WEBHOOK]: Alert delivered to {}.", webhook_url);
                    accepted_deliveries += 1;
                }
                Ok(endpoint_response) => {
                    warn!(
                        "⚠️ [WEBHOOK]: Endpoint {} rejected delivery: HTTP_{}",
                        webhook_url, endpoint_response.status()
                    );
                }
                Err(network_fault) => {
                    warn!("⚠️ [WEBHOOK]: Delivery to {} failed: {}", webhook_url, network_fault);
                }
            }
        }

        Ok(accepted_deliveries)
    }
}

impl Default for WebhookDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
