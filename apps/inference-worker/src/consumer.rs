// [apps/inference-worker/src/consumer.rs]
/*!
 * =================================================================
 * APARATO: IMAGE QUERY CONSUMER (V5.2 - TRIAGE DISCIPLINE)
 * CLASIFICACIÓN: WORKER EXECUTION LAYER (ESTRATO L1-WORKER)
 * RESPONSABILIDAD: CONSUMO DE 'image-queries' Y EMISIÓN DE RESULTADOS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SINGLE CONSUMER: Un receptor por instancia; el acuse ocurre en el
 *    mismo receptor que arrendó el mensaje.
 * 2. FAILURE TRIAGE: Payload imparseable o salida de modelo hostil →
 *    dead-letter (permanente); red o bóveda caída → abandon
 *    (redelivery).
 * 3. CREDENTIAL STRATEGY: URL con '?' porta credenciales embebidas
 *    (HTTP directo); en su ausencia, fallback a la bóveda con las
 *    credenciales de cuenta.
 * =================================================================
 */

use crate::engine::InferenceEngine;
use crate::errors::DispatchError;
use intellioptics_core_vision::VisionError;
use intellioptics_domain_models::inference::{ImageQueryEnvelope, InferenceResultEnvelope};
use intellioptics_infra_blob_vault::BlobVault;
use intellioptics_infra_queue::{LeasedMessage, QueueBroker};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn};

/// Tamaño de lote de recepción por ciclo.
const RECEIVE_BATCH_SIZE: usize = 10;

/// Ventana de visibilidad del arrendamiento (segundos).
const LEASE_VISIBILITY_SECONDS: i64 = 60;

/// Pausa tras un fallo del bucle de recepción.
const RECEIVE_FAULT_BACKOFF_SECONDS: u64 = 1;

/// Clasificación del fallo de procesamiento de un mensaje.
enum FailureClass {
    /// Fallo permanente: dead-letter.
    Permanent(String),
    /// Fallo transitorio: abandono para redelivery.
    Transient(String),
}

/// Consumidor soberano de la cola de consultas de imagen.
pub struct ImageQueryConsumer {
    queue_broker: QueueBroker,
    inference_engine: Arc<InferenceEngine>,
    blob_vault: Arc<BlobVault>,
    fetch_client: reqwest::Client,
    inbound_queue: String,
    outbound_queue: String,
}

impl ImageQueryConsumer {
    /// Forja el consumidor con sus enlaces inyectados.
    pub fn new(
        queue_broker: QueueBroker,
        inference_engine: Arc<InferenceEngine>,
        blob_vault: Arc<BlobVault>,
        inbound_queue: String,
        outbound_queue: String,
    ) -> Self {
        Self {
            queue_broker,
            inference_engine,
            blob_vault,
            fetch_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("FATAL: Consumer fetch client initialization failed."),
            inbound_queue,
            outbound_queue,
        }
    }

    /**
     * Bucle perpetuo de consumo (un receptor por instancia).
     */
    #[instrument(skip(self))]
    pub async fn run_forever(&self) {
        info!(
            "📡 [CONSUMER]: Listening IN=[{}] OUT=[{}]",
            self.inbound_queue, self.outbound_queue
        );

        loop {
            let leased_batch = match self
                .queue_broker
                .receive_batch(&self.inbound_queue, RECEIVE_BATCH_SIZE, LEASE_VISIBILITY_SECONDS)
                .await
            {
                Ok(batch) => batch,
                Err(receive_fault) => {
                    warn!("⚠️ [CONSUMER]: Receive loop fault: {} (sleep {}s)",
                        receive_fault, RECEIVE_FAULT_BACKOFF_SECONDS);
                    tokio::time::sleep(Duration::from_secs(RECEIVE_FAULT_BACKOFF_SECONDS)).await;
                    continue;
                }
            };

            if leased_batch.is_empty() {
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }

            for leased_message in leased_batch {
                self.process_leased_message(leased_message).await;
            }
        }
    }

    /// Procesa un mensaje arrendado con triaje de acuse.
    async fn process_leased_message(&self, leased_message: LeasedMessage) {
        let processing_start = Instant::now();

        match self.resolve_and_infer(&leased_message).await {
            Ok((image_query_id, report)) => {
                let latency_ms = processing_start.elapsed().as_millis() as u64;
                let detections_count = report.detections.len();

                let result_envelope = InferenceResultEnvelope {
                    image_query_id: image_query_id.clone(),
                    ok: true,
                    result: report,
                    latency_ms,
                };

                let enqueue_outcome = match serde_json::to_value(&result_envelope) {
                    Ok(payload) => self.queue_broker.enqueue(&self.outbound_queue, &payload).await,
                    Err(encode_fault) => {
                        error!("❌ [CONSUMER]: Result encoding collapsed: {}", encode_fault);
                        let _ = self
                            .queue_broker
                            .dead_letter(&leased_message, "RESULT_ENCODING_COLLAPSE")
                            .await;
                        return;
                    }
                };

                match enqueue_outcome {
                    Ok(_) => {
                        info!(
                            "✅ [CONSUMER]: msg_done iq={} latency_ms={} detections={}",
                            image_query_id, latency_ms, detections_count
                        );
                        if let Err(ack_fault) = self.queue_broker.complete(&leased_message).await {
                            warn!("⚠️ [CONSUMER]: Completion rejected: {}", ack_fault);
                        }
                    }
                    Err(enqueue_fault) => {
                        // El resultado no viajó: abandono para redelivery.
                        warn!("↩️ [CONSUMER]: Outbound enqueue failed: {}", enqueue_fault);
                        let _ = self.queue_broker.abandon(&leased_message).await;
                    }
                }
            }
            Err(FailureClass::Permanent(reason)) => {
                error!("💀 [CONSUMER]: Permanent failure -> dead-letter: {}", reason);
                if self.queue_broker.dead_letter(&leased_message, &reason).await.is_err() {
                    let _ = self.queue_broker.abandon(&leased_message).await;
                }
            }
            Err(FailureClass::Transient(reason)) => {
                warn!("↩️ [CONSUMER]: Transient failure -> abandon: {}", reason);
                let _ = self.queue_broker.abandon(&leased_message).await;
            }
        }
    }

    /// Resolución del sobre, adquisición de bytes e inferencia.
    async fn resolve_and_infer(
        &self,
        leased_message: &LeasedMessage,
    ) -> Result<(String, intellioptics_domain_models::inference::InferenceReport), FailureClass>
    {
        // 1. DECODIFICACIÓN DEL SOBRE (fallo permanente si corrupto)
        let envelope: ImageQueryEnvelope = leased_message
            .decode()
            .map_err(|decode_fault| FailureClass::Permanent(decode_fault.to_string()))?;

        if envelope.image_query_id.is_empty() || envelope.blob_url.is_empty() {
            return Err(FailureClass::Permanent(
                "Missing required fields: image_query_id and/or blob_url".to_string(),
            ));
        }

        info!("📥 [CONSUMER]: msg_start iq={} url={}",
            envelope.image_query_id, redact_presigned_material(&envelope.blob_url));

        // 2. ADQUISICIÓN DE BYTES (HTTP directo, fallback a la bóveda)
        let image_bytes = self.fetch_image_bytes(&envelope.blob_url).await?;

        // 3. INFERENCIA SOBRE EL MODELO POR DEFECTO
        let report = self
            .inference_engine
            .run_default_inference(&image_bytes)
            .await
            .map_err(|dispatch_fault| match &dispatch_fault {
                DispatchError::VisionFault(VisionError::ImageDecode(_))
                | DispatchError::VisionFault(VisionError::UnsupportedOutputLayout(_)) => {
                    FailureClass::Permanent(dispatch_fault.to_string())
                }
                _ => FailureClass::Transient(dispatch_fault.to_string()),
            })?;

        Ok((envelope.image_query_id, report))
    }

    /**
     * Adquiere los bytes de imagen.
     *
     * # Logic:
     * 1. HTTP directo (la URL con '?' porta credenciales embebidas).
     * 2. Fallback: resolución '{container}/{name}' desde la ruta de la
     *    URL y descarga con las credenciales de cuenta de la bóveda.
     */
    async fn fetch_image_bytes(&self, blob_url: &str) -> Result<Vec<u8>, FailureClass> {
        match self.fetch_client.get(blob_url).send().await {
            Ok(http_response) if http_response.status().is_success() => {
                return http_response
                    .bytes()
                    .await
                    .map(|body| body.to_vec())
                    .map_err(|body_fault| FailureClass::Transient(body_fault.to_string()));
            }
            Ok(http_response) => {
                warn!("⚠️ [CONSUMER]: HTTP fetch rejected: HTTP_{}", http_response.status());
            }
            Err(network_fault) => {
                warn!("⚠️ [CONSUMER]: HTTP fetch failed: {}", network_fault);
            }
        }

        if blob_url.contains('?') {
            // Credenciales embebidas agotadas: no hay fallback legítimo.
            return Err(FailureClass::Transient(format!(
                "Presigned fetch failed for {}",
                redact_presigned_material(blob_url)
            )));
        }

        let (container, blob_name) = parse_container_and_name(blob_url)
            .ok_or_else(|| FailureClass::Permanent(format!("Unparseable blob URL: {}", blob_url)))?;

        self.blob_vault
            .download(&container, &blob_name)
            .await
            .map_err(|vault_fault| FailureClass::Transient(vault_fault.to_string()))
    }
}

/// Extrae (container, blob_name) de la ruta de una URL de blob.
fn parse_container_and_name(blob_url: &str) -> Option<(String, String)> {
    let path_start = blob_url.find("://").map(|i| i + 3)?;
    let path = blob_url[path_start..].split_once('/')?.1;
    let path = path.split('?').next().unwrap_or(path);

    let (container, blob_name) = path.split_once('/')?;
    (!container.is_empty() && !blob_name.is_empty())
        .then(|| (container.to_string(), blob_name.to_string()))
}

/// Redacción del material pre-firmado en URLs para el rastro.
fn redact_presigned_material(blob_url: &str) -> String {
    match blob_url.split_once("sig=") {
        Some((public_prefix, _)) => format!("{}sig=REDACTED", public_prefix),
        None => blob_url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn certify_container_and_name_parsing() {
        let parsed = parse_container_and_name(
            "https://vault.intellioptics.example/images/queries/det-1/frame.jpg",
        );
        assert_eq!(
            parsed,
            Some(("images".to_string(), "queries/det-1/frame.jpg".to_string()))
        );
    }

    #[test]
    fn certify_presigned_material_redaction() {
        let redacted = redact_presigned_material("https://host/c/n?exp=1&sig=secretmaterial");
        assert_eq!(redacted, "https://host/c/n?exp=1&sig=REDACTED");
    }
}
