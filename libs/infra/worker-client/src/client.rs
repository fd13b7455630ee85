// [libs/infra/worker-client/src/client.rs]
/*!
 * =================================================================
 * APARATO: INFERENCE WORKER UPLINK (V11.2 - GOLD MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: NEGOCIACIÓN MULTIPART CON EL WORKER ONNX
 *
 * VISION HIPER-HOLÍSTICA:
 * Implementa el túnel de comunicación asíncrono entre el plano de
 * control y el worker de inferencia. Transporta la imagen y las
 * directivas del detector como multipart/form-data y decodifica el
 * reporte unificado de detecciones.
 * =================================================================
 */

use crate::errors::ClientError;
use intellioptics_domain_models::inference::{InferenceDirectives, InferenceReport};
use reqwest::{multipart, Client, StatusCode};
use tracing::{error, info, instrument};

/// Tope superior de una pasada de inferencia remota (contrato 60 s).
const INFERENCE_UPLINK_TIMEOUT_SECONDS: u64 = 60;

/// Cliente soberano del worker de inferencia.
pub struct InferenceWorkerClient {
    network_session_client: Client,
    worker_base_endpoint: String,
}

impl InferenceWorkerClient {
    /**
     * Inicializa el cliente de red contra el endpoint del worker.
     *
     * @param worker_base_url Endpoint raíz del worker ('http://worker:8081').
     */
    pub fn new(worker_base_url: String) -> Self {
        Self {
            network_session_client: Client::builder()
                .user_agent("IntelliOptics-ControlPlane/V11.2-Gold")
                .timeout(std::time::Duration::from_secs(INFERENCE_UPLINK_TIMEOUT_SECONDS))
                .build()
                .expect("FATAL: Inference client initialization failed."),
            worker_base_endpoint: worker_base_url.trim_end_matches('/').to_string(),
        }
    }

    /**
     * Somete una imagen con directivas de detector al endpoint /infer.
     *
     * # Errors:
     * - `ServerRejection`: Estatus no-200 del worker (el cuerpo de error
     *   viaja en el mensaje para el triaje forense).
     */
    #[instrument(skip(self, image_bytes, directives), fields(detector = %directives.detector_id))]
    pub async fn run_detector_inference(
        &self,
        image_bytes: Vec<u8>,
        directives: &InferenceDirectives,
    ) -> Result<InferenceReport, ClientError> {
        let target_url = format!("{}/infer", self.worker_base_endpoint);

        let directives_json = serde_json::to_string(directives)?;

        let multipart_form = multipart::Form::new()
            .part(
                "image",
                multipart::Part::bytes(image_bytes)
                    .file_name("frame.jpg")
                    .mime_str("image/jpeg")
                    .map_err(|fault| ClientError::ServerRejection(fault.to_string()))?,
            )
            .text("config", directives_json);

        let network_response = self
            .network_session_client
            .post(&target_url)
            .multipart(multipart_form)
            .send()
            .await?;

        if network_response.status() == StatusCode::OK {
            let report = network_response.json::<InferenceReport>().await?;
            info!(
                "🎯 [INFER_UPLINK]: {} detection(s) in {} ms.",
                report.detections.len(), report.latency_ms
            );
            Ok(report)
        } else {
            let status = network_response.status();
            let error_body = network_response.text().await.unwrap_or_default();
            error!("❌ [INFER_UPLINK]: Worker rejected inference: HTTP_{} {}", status, error_body);
            Err(ClientError::ServerRejection(format!("HTTP_{}: {}", status, error_body)))
        }
    }

    /**
     * Somete una imagen al endpoint de vocabulario abierto /yoloworld.
     *
     * @param prompts Lista de consignas separadas por comas.
     */
    #[instrument(skip(self, image_bytes))]
    pub async fn run_open_vocabulary_inference(
        &self,
        image_bytes: Vec<u8>,
        prompts: &str,
    ) -> Result<InferenceReport, ClientError> {
        let target_url = format!("{}/yoloworld", self.worker_base_endpoint);

        let multipart_form = multipart::Form::new().part(
            "image",
            multipart::Part::bytes(image_bytes)
                .file_name("frame.jpg")
                .mime_str("image/jpeg")
                .map_err(|fault| ClientError::ServerRejection(fault.to_string()))?,
        );

        let network_response = self
            .network_session_client
            .post(&target_url)
            .query(&[("prompts", prompts)])
            .multipart(multipart_form)
            .send()
            .await?;

        if network_response.status() == StatusCode::OK {
            Ok(network_response.json::<InferenceReport>().await?)
        } else {
            Err(ClientError::ServerRejection(format!("HTTP_{}", network_response.status())))
        }
    }

    /// Sondeo de vitalidad del worker (GET /health → "OK").
    pub async fn probe_health(&self) -> Result<(), ClientError> {
        let target_url = format!("{}/health", self.worker_base_endpoint);
        let network_response = self.network_session_client.get(&target_url).send().await?;

        if network_response.status().is_success() {
            Ok(())
        } else {
            Err(ClientError::ServerRejection(format!("HTTP_{}", network_response.status())))
        }
    }
}
