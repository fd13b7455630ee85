// [apps/orchestrator/src/state/mod.rs]
/*!
 * =================================================================
 * APARATO: SOVEREIGN STATE ORCHESTRATOR (V5.2 - SINGULARITY GOLD)
 * CLASIFICACIÓN: APPLICATION STATE (ESTRATO L1-APP)
 * RESPONSABILIDAD: ORQUESTACIÓN DE REPOSITORIOS, PASARELAS Y SUPERVISORES
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. COMPOSITION ROOT: El contenedor de aplicación se forja una única
 *    vez en el arranque y se inyecta por referencia; erradicación del
 *    singleton memoizado del plano de control heredado. Las pruebas
 *    construyen un contenedor fresco con dobles para las pasarelas.
 * 2. NOMINAL PURITY: Uso de 'Arc<T>' para inmutabilidad compartida.
 *
 * # Mathematical Proof (Deterministic State Hub):
 * Todo cambio de configuración de inspección es visible
 * instantáneamente por la API del inspector; los repositorios comparten
 * el mismo cliente táctico garantizando coherencia de lecturas.
 * =================================================================
 */

use crate::services::demo_sessions::DemoSessionSupervisor;
use intellioptics_domain_models::camera::InspectionDirectives;
use intellioptics_infra_blob_vault::BlobVault;
use intellioptics_infra_db::repositories::{
    AlertRepository, CameraRepository, DemoRepository, DetectorRepository, QueryRepository,
};
use intellioptics_infra_db::TursoClient;
use intellioptics_infra_notify::{EmailDispatcher, SmsDispatcher, WebhookDispatcher};
use intellioptics_infra_queue::QueueBroker;
use intellioptics_infra_worker_client::InferenceWorkerClient;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Directivas de runtime selladas en el arranque.
#[derive(Debug, Clone)]
pub struct RuntimeDirectives {
    /// Contenedor de imágenes de consultas y demos.
    pub images_container: String,
    /// Cola de fallback para consultas escaladas.
    pub fallback_queue: String,
    /// Vigencia de los tokens de fallback (minutos).
    pub access_token_expire_minutes: u32,
    /// Material de firma de los tokens de fallback.
    pub fallback_token_secret: String,
    /// Vigencia de las URLs firmadas de imágenes (segundos).
    pub signed_url_ttl_seconds: u64,
    /// Destinatarios de correo del camino de escalamiento.
    pub escalation_alert_emails: Vec<String>,
    /// Destinatarios SMS del camino de escalamiento.
    pub escalation_alert_phones: Vec<String>,
}

/**
 * Contenedor de estado compartido (Thread-Safe) para el Orchestrator.
 * Actúa como la placa base donde se conectan todos los estratos.
 */
#[derive(Clone)]
pub struct AppState {
    /// Cliente táctico del sustrato de persistencia.
    pub database_client: TursoClient,

    // --- REPOSITORIOS DE AUTORIDAD ---
    pub detector_repository: Arc<DetectorRepository>,
    pub query_repository: Arc<QueryRepository>,
    pub alert_repository: Arc<AlertRepository>,
    pub camera_repository: Arc<CameraRepository>,
    pub demo_repository: Arc<DemoRepository>,

    // --- PASARELAS DE INFRAESTRUCTURA ---
    /// Bóveda de objetos binarios (imágenes y líneas base).
    pub blob_vault: Arc<BlobVault>,
    /// Broker de mensajería (fallback y colas del worker).
    pub queue_broker: QueueBroker,
    /// Uplink al worker de inferencia.
    pub inference_uplink: Arc<InferenceWorkerClient>,
    /// Uplink del endpoint de vocabulario abierto (puede ser otro worker).
    pub open_vocabulary_uplink: Arc<InferenceWorkerClient>,

    // --- CANALES DE DESPACHO DE ALERTAS ---
    pub email_dispatcher: Arc<EmailDispatcher>,
    pub sms_dispatcher: Arc<SmsDispatcher>,
    pub webhook_dispatcher: Arc<WebhookDispatcher>,

    // --- SUPERVISIÓN DE SESIONES DE DEMO ---
    pub demo_supervisor: Arc<DemoSessionSupervisor>,

    // --- CONFIGURACIÓN VIVA DE INSPECCIÓN ---
    pub inspection_directives: Arc<RwLock<InspectionDirectives>>,

    /// Directivas de runtime selladas en el arranque.
    pub runtime: Arc<RuntimeDirectives>,
}

impl AppState {
    /**
     * Forja una nueva instancia del Estado Maestro inyectando todas las
     * dependencias ya construidas por el kernel.
     */
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        database_client: TursoClient,
        blob_vault: Arc<BlobVault>,
        queue_broker: QueueBroker,
        inference_uplink: Arc<InferenceWorkerClient>,
        open_vocabulary_uplink: Arc<InferenceWorkerClient>,
        email_dispatcher: Arc<EmailDispatcher>,
        sms_dispatcher: Arc<SmsDispatcher>,
        runtime: RuntimeDirectives,
    ) -> Self {
        debug!("🧬 [APP_STATE]: Executing sovereign ignition sequence V5.2...");

        // Pre-hidratación de repositorios soberanos.
        let detector_repository = Arc::new(DetectorRepository::new(database_client.clone()));
        let query_repository = Arc::new(QueryRepository::new(database_client.clone()));
        let alert_repository = Arc::new(AlertRepository::new(database_client.clone()));
        let camera_repository = Arc::new(CameraRepository::new(database_client.clone()));
        let demo_repository = Arc::new(DemoRepository::new(database_client.clone()));

        Self {
            database_client,
            detector_repository,
            query_repository,
            alert_repository,
            camera_repository,
            demo_repository,
            blob_vault,
            queue_broker,
            inference_uplink,
            open_vocabulary_uplink,
            email_dispatcher,
            sms_dispatcher,
            webhook_dispatcher: Arc::new(WebhookDispatcher::new()),
            demo_supervisor: Arc::new(DemoSessionSupervisor::new()),
            inspection_directives: Arc::new(RwLock::new(InspectionDirectives::default())),
            runtime: Arc::new(runtime),
        }
    }

    /**
     * Emite una URL firmada de lectura para una ruta de blob persistida.
     * Una ruta malformada degrada a None (sin abortar el listado).
     */
    pub fn sign_blob_path(&self, blob_path: &str) -> Option<String> {
        let (container, blob_name) = intellioptics_infra_blob_vault::split_blob_path(blob_path).ok()?;
        self.blob_vault
            .sign(container, blob_name, self.runtime.signed_url_ttl_seconds)
            .ok()
    }
}
