// [apps/edge-ingest/src/supervisor.rs]
/*!
 * =================================================================
 * APARATO: INGEST SUPERVISOR (V5.2 - FLEET CUSTODY)
 * CLASIFICACIÓN: EDGE EXECUTION LAYER (ESTRATO L1-EDGE)
 * RESPONSABILIDAD: SUPERVISIÓN DE LA FLOTA DE WORKERS DE STREAM
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. ONE WORKER PER STREAM: Cada directiva del manifiesto engancha su
 *    propio worker con señal de parada compartida.
 * 2. FIVE SECOND SEAL: La detención cooperativa completa dentro de la
 *    ventana de 5 segundos del contrato; los workers rezagados se
 *    desacoplan con rastro de advertencia.
 * =================================================================
 */

use crate::stream_worker::{StreamDirective, StreamWorker};
use intellioptics_infra_worker_client::{ControlPlaneClient, InferenceWorkerClient};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

/// Ventana de detención cooperativa del contrato de ingesta.
const STOP_WINDOW_SECONDS: u64 = 5;

/// Supervisor soberano de la flota de ingesta.
pub struct IngestSupervisor {
    stop_signal: watch::Sender<bool>,
    stop_observer: watch::Receiver<bool>,
    worker_tasks: Vec<(String, JoinHandle<()>)>,
    orchestrator_url: String,
    worker_url: String,
}

impl IngestSupervisor {
    /// Forja el supervisor con los endpoints de los uplinks.
    pub fn new(orchestrator_url: String, worker_url: String) -> Self {
        let (stop_signal, stop_observer) = watch::channel(false);
        Self {
            stop_signal,
            stop_observer,
            worker_tasks: Vec::new(),
            orchestrator_url,
            worker_url,
        }
    }

    /**
     * Engancha un worker por cada directiva del manifiesto.
     */
    #[instrument(skip(self, stream_directives))]
    pub fn ignite_fleet(&mut self, stream_directives: Vec<StreamDirective>) {
        if stream_directives.is_empty() {
            info!("⚪ [SUPERVISOR]: No streams configured. Ingest supervisor is idle.");
            return;
        }

        for directive in stream_directives {
            let stream_name = directive.name.clone();
            let worker = StreamWorker::new(
                directive,
                ControlPlaneClient::new(self.orchestrator_url.clone()),
                InferenceWorkerClient::new(self.worker_url.clone()),
            );

            let observer = self.stop_observer.clone();
            let worker_task = tokio::spawn(async move { worker.run(observer).await });

            info!("🎥 [SUPERVISOR]: Stream worker '{}' engaged.", stream_name);
            self.worker_tasks.push((stream_name, worker_task));
        }
    }

    /**
     * Detención cooperativa de la flota completa (≤ 5 segundos).
     */
    #[instrument(skip(self))]
    pub async fn stop_fleet(self) {
        let _ = self.stop_signal.send(true);

        for (stream_name, worker_task) in self.worker_tasks {
            if tokio::time::timeout(Duration::from_secs(STOP_WINDOW_SECONDS), worker_task)
                .await
                .is_err()
            {
                warn!("⏱️ [SUPERVISOR]: Worker '{}' exceeded the stop window; detaching.", stream_name);
            }
        }

        info!("🏁 [SUPERVISOR]: Ingest fleet sealed.");
    }
}
