// [apps/orchestrator/src/kernel.rs]
/**
 * =================================================================
 * APARATO: ORCHESTRATOR SOVEREIGN KERNEL (V5.3 - GUARD ACTIVE)
 * CLASIFICACIÓN: COMPOSITION ROOT (ESTRATO L1-APP)
 * RESPONSABILIDAD: BOOTSTRAP DE INFRAESTRUCTURA E IGNICIÓN SEGURA
 *
 * VISION HIPER-HOLÍSTICA:
 * Actúa como la placa base donde se conectan todos los servicios:
 * persistencia, bóveda, broker, uplink de inferencia, canales de
 * despacho y el relevo de fallback como daemon residente.
 * =================================================================
 */

use crate::routes::create_sovereign_router;
use crate::services::fallback_relay;
use crate::state::{AppState, RuntimeDirectives};
use anyhow::{Context, Result};
use intellioptics_infra_blob_vault::BlobVault;
use intellioptics_infra_db::TursoClient;
use intellioptics_infra_notify::{EmailDispatcher, SmsDispatcher};
use intellioptics_infra_queue::QueueBroker;
use intellioptics_infra_worker_client::InferenceWorkerClient;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Directivas de ignición del kernel (forjadas por el shell).
pub struct KernelDirectives {
    /// URL del sustrato de persistencia.
    pub database_url: String,
    /// Token de acceso del cluster remoto.
    pub database_token: Option<String>,
    /// Descriptor de conexión de la bóveda.
    pub vault_connection_descriptor: String,
    /// Raíz física de la bóveda local.
    pub vault_root_directory: PathBuf,
    /// URL del broker de mensajería.
    pub queue_connection_url: String,
    /// Token de acceso del broker remoto.
    pub queue_access_token: Option<String>,
    /// Endpoint del worker de inferencia.
    pub worker_url: String,
    /// Endpoint del worker de vocabulario abierto (default: el mismo worker).
    pub yoloworld_worker_url: Option<String>,
    /// API key del proveedor de correo.
    pub email_api_key: Option<String>,
    /// Remitente de correo de alertas.
    pub alert_from_email: String,
    /// Credenciales del proveedor de telefonía.
    pub sms_account_sid: Option<String>,
    pub sms_auth_token: Option<String>,
    pub sms_from_phone: Option<String>,
    /// Directivas de runtime del pipeline.
    pub runtime: RuntimeDirectives,
    /// Puerto de la superficie HTTP.
    pub listen_port: u16,
}

/**
 * Secuencia de ignición completa del Orchestrator.
 *
 * # Errors:
 * - Colapso de cualquier enlace de infraestructura durante el bootstrap.
 */
pub async fn ignite_sovereign_kernel(directives: KernelDirectives) -> Result<()> {
    info!("🧬 [KERNEL]: Sovereign ignition sequence V5.3 starting...");

    // 1. SUSTRATO DE PERSISTENCIA
    let database_client = TursoClient::connect(&directives.database_url, directives.database_token.clone())
        .await
        .context("DB_FAULT: Tactical link failed.")?;

    // 2. BÓVEDA DE OBJETOS
    let blob_vault = Arc::new(
        BlobVault::open(&directives.vault_root_directory, &directives.vault_connection_descriptor)
            .context("VAULT_FAULT: Vault descriptor rejected.")?,
    );

    // 3. BROKER DE MENSAJERÍA
    let queue_broker = QueueBroker::connect(
        &directives.queue_connection_url,
        directives.queue_access_token.clone(),
    )
    .await
    .context("QUEUE_FAULT: Broker link failed.")?;

    // 4. UPLINK DE INFERENCIA Y CANALES DE DESPACHO
    let inference_uplink = Arc::new(InferenceWorkerClient::new(directives.worker_url.clone()));
    let open_vocabulary_uplink = Arc::new(InferenceWorkerClient::new(
        directives
            .yoloworld_worker_url
            .clone()
            .unwrap_or_else(|| directives.worker_url.clone()),
    ));
    let email_dispatcher = Arc::new(EmailDispatcher::new(
        directives.email_api_key.clone(),
        directives.alert_from_email.clone(),
    ));
    let sms_dispatcher = Arc::new(SmsDispatcher::new(
        directives.sms_account_sid.clone(),
        directives.sms_auth_token.clone(),
        directives.sms_from_phone.clone(),
    ));

    // 5. FORJA DEL ESTADO MAESTRO
    let application_state = AppState::new(
        database_client,
        blob_vault,
        queue_broker,
        inference_uplink,
        open_vocabulary_uplink,
        email_dispatcher,
        sms_dispatcher,
        directives.runtime,
    );

    // 6. DAEMON RESIDENTE: RELEVO DE FALLBACK
    {
        let relay_state = application_state.clone();
        tokio::spawn(async move { fallback_relay::run_relay_loop(relay_state).await });
    }

    // 7. IGNICIÓN DE LA SUPERFICIE HTTP CON APAGADO ORDENADO
    let demo_supervisor = std::sync::Arc::clone(&application_state.demo_supervisor);
    let sovereign_router = create_sovereign_router(application_state);
    let bind_address = format!("0.0.0.0:{}", directives.listen_port);

    info!("🚀 [KERNEL]: Control plane listening at http://{}/api/v1", bind_address);

    let tcp_listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .context("NETWORK_FAULT: Unable to bind control plane surface.")?;

    axum::serve(tcp_listener, sovereign_router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("NETWORK_FAULT: Control plane surface collapsed.")?;

    // 8. SELLADO DE SESIONES DE CAPTURA VIVAS
    demo_supervisor.stop_all().await;

    Ok(())
}
