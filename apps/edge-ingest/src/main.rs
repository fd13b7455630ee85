// [apps/edge-ingest/src/main.rs]
/*!
 * =================================================================
 * APARATO: EDGE INGEST SHELL (V5.2 - ZENITH SHELL)
 * CLASIFICACIÓN: APPLICATION LAYER (ENTRY POINT)
 * RESPONSABILIDAD: BOOTSTRAP DE ENTORNO E IGNICIÓN DE LA FLOTA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. MANIFEST INGESTION: Las directivas de stream se hidratan desde un
 *    manifiesto serde-JSON plano; la carga de configuración rica es un
 *    colaborador externo.
 * 2. ORDERED SHUTDOWN: Ctrl-C dispara la detención cooperativa de la
 *    flota dentro de la ventana de 5 segundos del contrato.
 * =================================================================
 */

use anyhow::{Context, Result};
use clap::Parser;
use intellioptics_edge_ingest::stream_worker::StreamDirective;
use intellioptics_edge_ingest::supervisor::IngestSupervisor;
use std::path::PathBuf;
use tracing::{info, warn};

/**
 * Directivas de mando del nodo de ingesta edge.
 */
#[derive(Parser, Debug)]
#[command(
    author = "IntelliOptics Platform Engineering",
    version = "5.2",
    about = "IntelliOptics Edge Ingest // Supervised RTSP frame workers"
)]
struct EdgeShellDirectives {
    /// Ruta del manifiesto JSON de streams.
    #[arg(long, env = "STREAMS_MANIFEST", default_value = "streams.json")]
    streams_manifest: PathBuf,

    /// Endpoint del plano de control.
    #[arg(long, env = "ORCHESTRATOR_URL", default_value = "http://127.0.0.1:8080")]
    orchestrator_url: String,

    /// Endpoint del worker de inferencia (modo edge).
    #[arg(long, env = "WORKER_URL", default_value = "http://127.0.0.1:8081")]
    worker_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // 1. INICIALIZACIÓN DEL SISTEMA DE OBSERVABILIDAD
    intellioptics_shared_argus::init_tracing("intellioptics-edge-ingest");

    info!("💠 [SHELL]: Edge Ingest ignition sequence V5.2 starting...");

    // 2. PARSEO DE DIRECTIVAS E HIDRATACIÓN DEL MANIFIESTO
    let shell_directives = EdgeShellDirectives::parse();

    let stream_directives: Vec<StreamDirective> = if shell_directives.streams_manifest.exists() {
        let manifest_text = std::fs::read_to_string(&shell_directives.streams_manifest)
            .context("IO_FAULT: Streams manifest unreadable.")?;
        serde_json::from_str(&manifest_text).context("MANIFEST_FAULT: Streams manifest rejected.")?
    } else {
        warn!(
            "⚪ [SHELL]: Manifest {} absent; igniting with empty fleet.",
            shell_directives.streams_manifest.display()
        );
        Vec::new()
    };

    info!("📋 [SHELL]: {} stream directive(s) hydrated.", stream_directives.len());

    // 3. IGNICIÓN DE LA FLOTA SUPERVISADA
    let mut supervisor = IngestSupervisor::new(
        shell_directives.orchestrator_url.clone(),
        shell_directives.worker_url.clone(),
    );
    supervisor.ignite_fleet(stream_directives);

    // 4. ESPERA DE LA SEÑAL DE TERMINACIÓN ORDENADA
    tokio::signal::ctrl_c()
        .await
        .context("SIGNAL_FAULT: Termination listener collapsed.")?;
    warn!("⚠️ [SIGNAL]: Termination requested by host. Sealing current strata...");

    // 5. DETENCIÓN COOPERATIVA (≤ 5 segundos por contrato)
    supervisor.stop_fleet().await;

    info!("🏁 [SHELL]: Shutdown sequence concluded. Edge node offline.");
    Ok(())
}
