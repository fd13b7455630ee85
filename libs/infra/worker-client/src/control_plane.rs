// [libs/infra/worker-client/src/control_plane.rs]
/*!
 * =================================================================
 * APARATO: CONTROL PLANE UPLINK (V11.1 - FIELD AGENTS)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: ENLACE DE NODOS DE CAMPO CON LA API DEL ORCHESTRATOR
 *
 * VISION HIPER-HOLÍSTICA:
 * Túnel compartido por los agentes de campo: el nodo edge somete frames
 * como consultas y el inspector de cámaras reporta muestras de salud,
 * alertas y rondas de inspección.
 * =================================================================
 */

use crate::errors::ClientError;
use intellioptics_domain_models::camera::{
    Camera, CameraAlert, CameraHealthSample, InspectionDirectives, InspectionRun,
};
use intellioptics_domain_models::query::Query;
use reqwest::{multipart, Client, StatusCode};
use tracing::{info, instrument, warn};

/// Tope de las llamadas de reporte del inspector (contrato 10-60 s).
const CONTROL_PLANE_TIMEOUT_SECONDS: u64 = 30;

/// Cliente soberano de la API del plano de control.
pub struct ControlPlaneClient {
    network_session_client: Client,
    orchestrator_base_endpoint: String,
}

impl ControlPlaneClient {
    /**
     * Inicializa el cliente contra el endpoint del orchestrator.
     */
    pub fn new(orchestrator_base_url: String) -> Self {
        Self {
            network_session_client: Client::builder()
                .user_agent("IntelliOptics-FieldAgent/V11.1")
                .timeout(std::time::Duration::from_secs(CONTROL_PLANE_TIMEOUT_SECONDS))
                .build()
                .expect("FATAL: Control plane client initialization failed."),
            orchestrator_base_endpoint: orchestrator_base_url.trim_end_matches('/').to_string(),
        }
    }

    /**
     * Somete un frame como consulta síncrona (ruta de ingesta edge).
     */
    #[instrument(skip(self, frame_bytes), fields(detector = %detector_identifier))]
    pub async fn submit_frame_query(
        &self,
        detector_identifier: &str,
        frame_bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<Query, ClientError> {
        let target_url = format!("{}/api/v1/queries", self.orchestrator_base_endpoint);

        let multipart_form = multipart::Form::new()
            .text("detector_id", detector_identifier.to_string())
            .part(
                "image",
                multipart::Part::bytes(frame_bytes)
                    .file_name("frame.jpg")
                    .mime_str(content_type)
                    .map_err(|fault| ClientError::ServerRejection(fault.to_string()))?,
            );

        let network_response = self
            .network_session_client
            .post(&target_url)
            .multipart(multipart_form)
            .send()
            .await?;

        match network_response.status() {
            StatusCode::CREATED | StatusCode::OK => Ok(network_response.json::<Query>().await?),
            rejection_status => {
                warn!("⚠️ [FIELD_UPLINK]: Frame submission rejected: HTTP_{}", rejection_status);
                Err(ClientError::ServerRejection(format!("HTTP_{}", rejection_status)))
            }
        }
    }

    /// Flota completa de cámaras registradas.
    #[instrument(skip(self))]
    pub async fn list_cameras(&self) -> Result<Vec<Camera>, ClientError> {
        let target_url = format!("{}/api/v1/cameras", self.orchestrator_base_endpoint);
        let network_response = self.network_session_client.get(&target_url).send().await?;

        if network_response.status() == StatusCode::OK {
            Ok(network_response.json::<Vec<Camera>>().await?)
        } else {
            Err(ClientError::ServerRejection(format!("HTTP_{}", network_response.status())))
        }
    }

    /// Directivas vigentes del ciclo de inspección.
    pub async fn fetch_inspection_directives(&self) -> Result<InspectionDirectives, ClientError> {
        let target_url = format!("{}/api/v1/inspection/config", self.orchestrator_base_endpoint);
        let network_response = self.network_session_client.get(&target_url).send().await?;

        if network_response.status() == StatusCode::OK {
            Ok(network_response.json::<InspectionDirectives>().await?)
        } else {
            Err(ClientError::ServerRejection(format!("HTTP_{}", network_response.status())))
        }
    }

    /// Reporta la muestra de salud de una cámara inspeccionada.
    #[instrument(skip(self, health_sample), fields(camera = %health_sample.camera_identifier))]
    pub async fn post_health_sample(&self, health_sample: &CameraHealthSample) -> Result<(), ClientError> {
        let target_url = format!(
            "{}/api/v1/cameras/{}/health",
            self.orchestrator_base_endpoint, health_sample.camera_identifier
        );

        let network_response = self
            .network_session_client
            .post(&target_url)
            .json(health_sample)
            .send()
            .await?;

        if network_response.status().is_success() {
            Ok(())
        } else {
            Err(ClientError::ServerRejection(format!("HTTP_{}", network_response.status())))
        }
    }

    /// Reporta una alerta de cámara detectada por el inspector.
    #[instrument(skip(self, camera_alert), fields(camera = %camera_alert.camera_identifier))]
    pub async fn post_camera_alert(&self, camera_alert: &CameraAlert) -> Result<(), ClientError> {
        let target_url = format!("{}/api/v1/camera-alerts", self.orchestrator_base_endpoint);

        let network_response = self
            .network_session_client
            .post(&target_url)
            .json(camera_alert)
            .send()
            .await?;

        if network_response.status().is_success() {
            info!("🚨 [FIELD_UPLINK]: Camera alert {:?} delivered.", camera_alert.alert_type);
            Ok(())
        } else {
            Err(ClientError::ServerRejection(format!("HTTP_{}", network_response.status())))
        }
    }

    /// Abre una ronda de inspección en el plano de control.
    pub async fn open_inspection_run(&self) -> Result<InspectionRun, ClientError> {
        let target_url = format!("{}/api/v1/inspection/runs", self.orchestrator_base_endpoint);
        let network_response = self.network_session_client.post(&target_url).send().await?;

        if network_response.status().is_success() {
            Ok(network_response.json::<InspectionRun>().await?)
        } else {
            Err(ClientError::ServerRejection(format!("HTTP_{}", network_response.status())))
        }
    }

    /// Sella una ronda con sus conteos finales.
    #[instrument(skip(self))]
    pub async fn seal_inspection_run(
        &self,
        run_identifier: &str,
        total_cameras: u32,
        cameras_healthy: u32,
        cameras_warning: u32,
        cameras_failed: u32,
    ) -> Result<(), ClientError> {
        let target_url = format!(
            "{}/api/v1/inspection/runs/{}",
            self.orchestrator_base_endpoint, run_identifier
        );

        let network_response = self
            .network_session_client
            .put(&target_url)
            .json(&serde_json::json!({
                "total_cameras": total_cameras,
                "cameras_healthy": cameras_healthy,
                "cameras_warning": cameras_warning,
                "cameras_failed": cameras_failed,
            }))
            .send()
            .await?;

        if network_response.status().is_success() {
            Ok(())
        } else {
            Err(ClientError::ServerRejection(format!("HTTP_{}", network_response.status())))
        }
    }
}
