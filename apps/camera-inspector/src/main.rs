// [apps/camera-inspector/src/main.rs]
/*!
 * =================================================================
 * APARATO: CAMERA INSPECTOR SHELL (V5.1 - ZENITH SHELL)
 * CLASIFICACIÓN: APPLICATION LAYER (ENTRY POINT)
 * RESPONSABILIDAD: BOOTSTRAP DE ENTORNO E IGNICIÓN DEL AGENTE DE CAMPO
 * =================================================================
 */

use anyhow::{Context, Result};
use clap::Parser;
use intellioptics_camera_inspector::CameraInspector;
use intellioptics_infra_blob_vault::BlobVault;
use intellioptics_infra_worker_client::ControlPlaneClient;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/**
 * Directivas de mando del inspector de cámaras.
 */
#[derive(Parser, Debug)]
#[command(
    author = "IntelliOptics Platform Engineering",
    version = "5.1",
    about = "IntelliOptics Camera Inspector // Periodic fleet health cycles"
)]
struct InspectorShellDirectives {
    /// Endpoint del plano de control.
    #[arg(long, env = "ORCHESTRATOR_URL", default_value = "http://127.0.0.1:8080")]
    orchestrator_url: String,

    /// Descriptor de conexión de la bóveda (líneas base).
    #[arg(long, env = "AZURE_STORAGE_CONNECTION_STRING")]
    vault_connection_descriptor: String,

    /// Raíz física de la bóveda local.
    #[arg(long, env = "VAULT_ROOT", default_value = "blob-vault")]
    vault_root_directory: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // 1. INICIALIZACIÓN DEL SISTEMA DE OBSERVABILIDAD
    intellioptics_shared_argus::init_tracing("intellioptics-camera-inspector");

    info!("💠 [SHELL]: Camera Inspector ignition sequence V5.1 starting...");

    // 2. PARSEO DE DIRECTIVAS Y FORJA DE ENLACES
    let shell_directives = InspectorShellDirectives::parse();

    let control_plane = ControlPlaneClient::new(shell_directives.orchestrator_url.clone());
    let blob_vault = Arc::new(
        BlobVault::open(
            &shell_directives.vault_root_directory,
            &shell_directives.vault_connection_descriptor,
        )
        .context("VAULT_FAULT: Vault descriptor rejected.")?,
    );

    // 3. TRANSFERENCIA DE MANDO AL AGENTE DE CAMPO
    let inspector = CameraInspector::new(control_plane, blob_vault);
    inspector.run_forever().await;

    info!("🏁 [SHELL]: Shutdown sequence concluded. Inspector offline.");
    Ok(())
}
