// [apps/inference-worker/src/main.rs]
/*!
 * =================================================================
 * APARATO: INFERENCE WORKER SHELL (V5.2 - ZENITH SHELL)
 * CLASIFICACIÓN: APPLICATION LAYER (ENTRY POINT)
 * RESPONSABILIDAD: BOOTSTRAP DE ENTORNO E IGNICIÓN DEL MOTOR
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. ARCHITECTURAL PURITY: El shell actúa como switchboard puro de
 *    configuración y señales; la totalidad de la operación vive en el
 *    'InferenceEngine', la superficie HTTP y el consumidor de cola.
 * 2. HTTP-ONLY FALLBACK: Con SB_CONN ausente o 'DISABLED' el worker
 *    opera en modo HTTP puro, preservando /infer y /health.
 *
 * # Mathematical Proof (Deterministic Init):
 * El worker solo transita a OPERATIONAL si la bóveda y el directorio
 * de caché son estables; el modelo por defecto es opcional y su
 * ausencia degrada (503) sin impedir el camino detector-aware.
 * =================================================================
 */

use anyhow::{Context, Result};
use clap::Parser;
use intellioptics_infra_blob_vault::BlobVault;
use intellioptics_infra_model_cache::{ModelArsenal, DEFAULT_ARSENAL_CAPACITY};
use intellioptics_infra_queue::QueueBroker;
use intellioptics_inference_worker::consumer::ImageQueryConsumer;
use intellioptics_inference_worker::engine::{EngineDirectives, InferenceEngine, IoMode};
use intellioptics_inference_worker::http::create_worker_router;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/**
 * Directivas de mando del worker de inferencia.
 * Configuración inyectada vía CLI o variables de entorno.
 */
#[derive(Parser, Debug)]
#[command(
    author = "IntelliOptics Platform Engineering",
    version = "5.2",
    about = "IntelliOptics ONNX Inference Worker // Primary + OODD dispatch"
)]
struct WorkerShellDirectives {
    /// Puerto de la superficie HTTP (health + inferencia).
    #[arg(long, env = "HEALTH_PORT", default_value = "8081")]
    health_port: u16,

    /// Directorio local de caché de artefactos de modelo.
    #[arg(long, env = "MODEL_CACHE_DIR", default_value = "/app/models")]
    model_cache_directory: PathBuf,

    /// Contenedor por defecto de artefactos en la bóveda.
    #[arg(long, env = "MODEL_REPOSITORY", default_value = "models")]
    model_repository: String,

    /// Ruta en la bóveda del modelo por defecto (camino octet-stream).
    #[arg(long, env = "MODEL_URI")]
    default_model_blob_path: Option<String>,

    /// Lado del lienzo de letterbox por defecto.
    #[arg(long, env = "IO_IMG_SIZE", default_value = "640")]
    io_img_size: u32,

    /// Umbral de confianza del camino por defecto.
    #[arg(long, env = "IO_CONF_THRESH", default_value = "0.50")]
    io_conf_thresh: f32,

    /// Umbral IoU de la supresión por defecto.
    #[arg(long, env = "IO_NMS_IOU", default_value = "0.45")]
    io_nms_iou: f32,

    /// Modo de gating: 'onnx' o 'binary'.
    #[arg(long, env = "IO_MODE", default_value = "onnx")]
    io_mode: String,

    /// Clase de compuerta del modo binario.
    #[arg(long, env = "IO_BINARY_CLASS", default_value = "person")]
    io_binary_class: String,

    /// Descriptor de conexión de la bóveda de objetos.
    #[arg(long, env = "AZURE_STORAGE_CONNECTION_STRING")]
    vault_connection_descriptor: String,

    /// Raíz física de la bóveda local.
    #[arg(long, env = "VAULT_ROOT", default_value = "blob-vault")]
    vault_root_directory: PathBuf,

    /// URL del broker de mensajería ('DISABLED' para modo HTTP puro).
    /// SERVICE_BUS_CONN actúa como alias heredado en ausencia de SB_CONN.
    #[arg(long, env = "SB_CONN")]
    queue_connection_url: Option<String>,

    /// Token de acceso del broker remoto.
    #[arg(long, env = "SB_TOKEN")]
    queue_access_token: Option<String>,

    /// Cola entrante de consultas de imagen.
    #[arg(long, env = "QUEUE_IN", default_value = "image-queries")]
    inbound_queue: String,

    /// Cola saliente de resultados de inferencia.
    #[arg(long, env = "QUEUE_OUT", default_value = "inference-results")]
    outbound_queue: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // 1. INICIALIZACIÓN DEL SISTEMA DE OBSERVABILIDAD
    intellioptics_shared_argus::init_tracing("intellioptics-inference-worker");

    info!("💠 [SHELL]: Inference Worker ignition sequence V5.2 starting...");

    // 2. PARSEO DE DIRECTIVAS ESTRATÉGICAS
    let shell_directives = WorkerShellDirectives::parse();

    // 3. PREPARACIÓN DEL ESTRATO DE PERSISTENCIA LOCAL
    if !shell_directives.model_cache_directory.exists() {
        std::fs::create_dir_all(&shell_directives.model_cache_directory)
            .context("IO_FAULT: Unable to claim model cache directory.")?;
        info!("📂 [SHELL]: Model cache strata materialized.");
    }

    // 4. CONSTRUCCIÓN DE LA BÓVEDA Y EL ARSENAL
    let blob_vault = Arc::new(
        BlobVault::open(
            &shell_directives.vault_root_directory,
            &shell_directives.vault_connection_descriptor,
        )
        .context("VAULT_FAULT: Vault descriptor rejected.")?,
    );

    let model_arsenal = Arc::new(ModelArsenal::new(
        Arc::clone(&blob_vault),
        shell_directives.model_cache_directory.clone(),
        DEFAULT_ARSENAL_CAPACITY,
        shell_directives.model_repository.clone(),
    ));

    // 5. IGNICIÓN DEL MOTOR DE INFERENCIA
    let engine_directives = EngineDirectives {
        default_input_side: shell_directives.io_img_size,
        default_conf_threshold: shell_directives.io_conf_thresh,
        default_nms_iou: shell_directives.io_nms_iou,
        io_mode: IoMode::from_env_text(&shell_directives.io_mode),
        binary_gate_class: shell_directives.io_binary_class.to_lowercase(),
    };

    let inference_engine = Arc::new(InferenceEngine::new(model_arsenal, engine_directives));

    if let Some(default_model_path) = &shell_directives.default_model_blob_path {
        match inference_engine.ignite_default_model(default_model_path).await {
            Ok(()) => info!("🧠 [SHELL]: Default model online."),
            Err(ignition_fault) => {
                warn!("⚠️ [SHELL]: Default model ignition failed: {}", ignition_fault)
            }
        }
    } else {
        warn!("⚪ [SHELL]: No default model configured; octet-stream path will return 503.");
    }

    // 6. CONSUMIDOR DE COLA (opcional: HTTP-only sin SB_CONN)
    // Alias heredado: SERVICE_BUS_CONN rige en ausencia de SB_CONN.
    let queue_connection_url = shell_directives
        .queue_connection_url
        .clone()
        .or_else(|| std::env::var("SERVICE_BUS_CONN").ok());

    match queue_connection_url.as_deref() {
        None => warn!("⚪ [SHELL]: Queue connection absent. Running in HTTP-only mode."),
        Some(connection_url) if connection_url.trim().eq_ignore_ascii_case("DISABLED") => {
            warn!("⚪ [SHELL]: Queue connection disabled. Running in HTTP-only mode.")
        }
        Some(connection_url) => {
            let queue_broker = QueueBroker::connect(
                connection_url,
                shell_directives.queue_access_token.clone(),
            )
            .await
            .context("QUEUE_FAULT: Broker link failed.")?;

            let consumer = ImageQueryConsumer::new(
                queue_broker,
                Arc::clone(&inference_engine),
                Arc::clone(&blob_vault),
                shell_directives.inbound_queue.clone(),
                shell_directives.outbound_queue.clone(),
            );

            tokio::spawn(async move { consumer.run_forever().await });
            info!("📡 [SHELL]: Queue consumer engaged.");
        }
    }

    // 7. IGNICIÓN DE LA SUPERFICIE HTTP
    let worker_router = create_worker_router(inference_engine);
    let bind_address = format!("0.0.0.0:{}", shell_directives.health_port);

    info!("🚀 [SHELL]: Worker surface listening at http://{}/infer", bind_address);

    let tcp_listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .context("NETWORK_FAULT: Unable to bind worker surface.")?;

    axum::serve(tcp_listener, worker_router)
        .await
        .context("NETWORK_FAULT: Worker surface collapsed.")?;

    info!("🏁 [SHELL]: Shutdown sequence concluded. Worker offline.");
    Ok(())
}
