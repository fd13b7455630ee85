// [apps/orchestrator/src/main.rs]
/*!
 * =================================================================
 * APARATO: ORCHESTRATOR SHELL (V5.3 - ZENITH SHELL)
 * CLASIFICACIÓN: APPLICATION LAYER (ENTRY POINT)
 * RESPONSABILIDAD: BOOTSTRAP DE ENTORNO E IGNICIÓN DEL KERNEL
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. ARCHITECTURAL PURITY: El shell actúa como switchboard puro de
 *    configuración; la totalidad de la operación vive en el kernel.
 * 2. ZERO ABBREVIATIONS: Nomenclatura nominal absoluta en directivas.
 * =================================================================
 */

use anyhow::Result;
use clap::Parser;
use intellioptics_orchestrator::kernel::{ignite_sovereign_kernel, KernelDirectives};
use intellioptics_orchestrator::state::RuntimeDirectives;
use std::path::PathBuf;
use tracing::info;

/**
 * Directivas de mando del plano de control.
 * Configuración inyectada vía CLI o variables de entorno.
 */
#[derive(Parser, Debug)]
#[command(
    author = "IntelliOptics Platform Engineering",
    version = "5.3",
    about = "IntelliOptics Control Plane // Query pipeline, alerting, demos and inspection API"
)]
struct OrchestratorShellDirectives {
    /// Puerto de la superficie HTTP del plano de control.
    #[arg(long, env = "PORT", default_value = "8080")]
    listen_port: u16,

    /// URL del sustrato de persistencia (archivo local, :memory: o libsql://).
    #[arg(long, env = "DATABASE_URL", default_value = "intellioptics.db")]
    database_url: String,

    /// Token de acceso del cluster remoto.
    #[arg(long, env = "DATABASE_AUTH_TOKEN")]
    database_token: Option<String>,

    /// Descriptor de conexión de la bóveda de objetos.
    #[arg(long, env = "AZURE_STORAGE_CONNECTION_STRING")]
    vault_connection_descriptor: String,

    /// Raíz física de la bóveda local.
    #[arg(long, env = "VAULT_ROOT", default_value = "blob-vault")]
    vault_root_directory: PathBuf,

    /// URL del broker de mensajería (comparte motor con la persistencia).
    #[arg(long, env = "SB_CONN", default_value = "intellioptics-queue.db")]
    queue_connection_url: String,

    /// Token de acceso del broker remoto.
    #[arg(long, env = "SB_TOKEN")]
    queue_access_token: Option<String>,

    /// Endpoint del worker de inferencia.
    #[arg(long, env = "WORKER_URL", default_value = "http://127.0.0.1:8081")]
    worker_url: String,

    /// Endpoint del worker de vocabulario abierto (default: WORKER_URL).
    #[arg(long, env = "YOLOWORLD_WORKER_URL")]
    yoloworld_worker_url: Option<String>,

    /// Contenedor de imágenes de consultas y demos.
    #[arg(long, env = "IMAGES_CONTAINER", default_value = "images")]
    images_container: String,

    /// Cola de fallback de consultas escaladas.
    #[arg(long, env = "FALLBACK_QUEUE", default_value = "escalations")]
    fallback_queue: String,

    /// Vigencia de los tokens de fallback (minutos).
    #[arg(long, env = "ACCESS_TOKEN_EXPIRE_MINUTES", default_value = "30")]
    access_token_expire_minutes: u32,

    /// Material de firma de los tokens de fallback.
    #[arg(long, env = "FALLBACK_TOKEN_SECRET", default_value = "intellioptics-fallback")]
    fallback_token_secret: String,

    /// Vigencia de las URLs firmadas de imágenes (segundos).
    #[arg(long, env = "SIGNED_URL_TTL_SECONDS", default_value = "3600")]
    signed_url_ttl_seconds: u64,

    /// Destinatarios de correo del camino de escalamiento (CSV).
    #[arg(long, env = "ALERT_EMAIL_TO", default_value = "")]
    escalation_alert_emails: String,

    /// Destinatario SMS del camino de escalamiento.
    #[arg(long, env = "ALERT_PHONE_TO")]
    escalation_alert_phone: Option<String>,

    /// API key del proveedor de correo transaccional.
    #[arg(long, env = "SENDGRID_API_KEY")]
    email_api_key: Option<String>,

    /// Remitente de correo de alertas.
    #[arg(long, env = "ALERT_FROM_EMAIL", default_value = "alerts@intellioptics.example")]
    alert_from_email: String,

    /// SID de cuenta del proveedor de telefonía.
    #[arg(long, env = "TWILIO_ACCOUNT_SID")]
    sms_account_sid: Option<String>,

    /// Token de autenticación del proveedor de telefonía.
    #[arg(long, env = "TWILIO_AUTH_TOKEN")]
    sms_auth_token: Option<String>,

    /// Número remitente de SMS de alertas.
    #[arg(long, env = "ALERT_PHONE_FROM")]
    sms_from_phone: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // 1. INICIALIZACIÓN DEL SISTEMA DE OBSERVABILIDAD
    intellioptics_shared_argus::init_tracing("intellioptics-orchestrator");

    info!("💠 [SHELL]: Control plane ignition sequence V5.3 starting...");

    // 2. PARSEO DE DIRECTIVAS ESTRATÉGICAS
    let shell_directives = OrchestratorShellDirectives::parse();

    let escalation_alert_emails: Vec<String> = shell_directives
        .escalation_alert_emails
        .split(',')
        .map(|address| address.trim().to_string())
        .filter(|address| !address.is_empty())
        .collect();

    let runtime = RuntimeDirectives {
        images_container: shell_directives.images_container.clone(),
        fallback_queue: shell_directives.fallback_queue.clone(),
        access_token_expire_minutes: shell_directives.access_token_expire_minutes,
        fallback_token_secret: shell_directives.fallback_token_secret.clone(),
        signed_url_ttl_seconds: shell_directives.signed_url_ttl_seconds,
        escalation_alert_emails,
        escalation_alert_phones: shell_directives
            .escalation_alert_phone
            .clone()
            .into_iter()
            .collect(),
    };

    // 3. TRANSFERENCIA DE MANDO AL KERNEL
    ignite_sovereign_kernel(KernelDirectives {
        database_url: shell_directives.database_url,
        database_token: shell_directives.database_token,
        vault_connection_descriptor: shell_directives.vault_connection_descriptor,
        vault_root_directory: shell_directives.vault_root_directory,
        queue_connection_url: shell_directives.queue_connection_url,
        queue_access_token: shell_directives.queue_access_token,
        worker_url: shell_directives.worker_url,
        yoloworld_worker_url: shell_directives.yoloworld_worker_url,
        email_api_key: shell_directives.email_api_key,
        alert_from_email: shell_directives.alert_from_email,
        sms_account_sid: shell_directives.sms_account_sid,
        sms_auth_token: shell_directives.sms_auth_token,
        sms_from_phone: shell_directives.sms_from_phone,
        runtime,
        listen_port: shell_directives.listen_port,
    })
    .await?;

    info!("🏁 [SHELL]: Shutdown sequence concluded. Control plane offline.");
    Ok(())
}
