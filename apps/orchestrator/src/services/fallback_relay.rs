// [apps/orchestrator/src/services/fallback_relay.rs]
/*!
 * =================================================================
 * APARATO: FALLBACK RELAY SERVICE (V5.3 - CLOUD RESOLUTION)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L4)
 * RESPONSABILIDAD: RESOLUCIÓN ASÍNCRONA DE CONSULTAS ESCALADAS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. BACKPRESSURE VALVE: La cola de fallback es la válvula del camino
 *    caliente; este relevo re-invoca el despachador en la nube y sella
 *    el veredicto de las consultas que el borde no pudo decidir.
 * 2. TOKEN GATE: El sobre porta un token de autorización forjado en el
 *    escalamiento; un token inválido dead-letters el mensaje.
 * 3. FAILURE TRIAGE: Payload corrupto o token hostil → dead-letter;
 *    worker o bóveda caídos → abandon para redelivery.
 * =================================================================
 */

use crate::services::query_pipeline::{assemble_inference_directives, EMPTY_VERDICT_LABEL};
use crate::services::token::verify_fallback_token;
use crate::state::AppState;
use intellioptics_domain_models::inference::FallbackEnvelope;
use intellioptics_domain_models::query::QueryStatus;
use intellioptics_infra_blob_vault::split_blob_path;
use intellioptics_infra_queue::LeasedMessage;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// Tamaño de lote de recepción del relevo.
const RELAY_BATCH_SIZE: usize = 5;

/// Ventana de visibilidad del arrendamiento (segundos).
const RELAY_LEASE_SECONDS: i64 = 120;

/**
 * Bucle perpetuo del relevo de fallback (daemon del kernel).
 */
#[instrument(skip(state))]
pub async fn run_relay_loop(state: AppState) {
    info!("♻️ [FALLBACK_RELAY]: Cloud resolution daemon initiated on [{}].", state.runtime.fallback_queue);

    loop {
        let leased_batch = match state
            .queue_broker
            .receive_batch(&state.runtime.fallback_queue, RELAY_BATCH_SIZE, RELAY_LEASE_SECONDS)
            .await
        {
            Ok(batch) => batch,
            Err(receive_fault) => {
                warn!("⚠️ [FALLBACK_RELAY]: Receive fault: {} (sleep 1s)", receive_fault);
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }
        };

        if leased_batch.is_empty() {
            tokio::time::sleep(Duration::from_secs(2)).await;
            continue;
        }

        for leased_message in leased_batch {
            process_fallback_message(&state, leased_message).await;
        }
    }
}

/// Procesa un sobre de fallback con triaje de acuse.
async fn process_fallback_message(state: &AppState, leased_message: LeasedMessage) {
    // 1. DECODIFICACIÓN DEL SOBRE (corrupto → dead-letter)
    let envelope: FallbackEnvelope = match leased_message.decode() {
        Ok(envelope) => envelope,
        Err(decode_fault) => {
            error!("💀 [FALLBACK_RELAY]: Corrupt envelope -> dead-letter: {}", decode_fault);
            let _ = state.queue_broker.dead_letter(&leased_message, &decode_fault.to_string()).await;
            return;
        }
    };

    // 2. COMPUERTA DE AUTORIZACIÓN (token hostil → dead-letter)
    if !verify_fallback_token(&envelope.fallback_token, &state.runtime.fallback_token_secret) {
        error!("💀 [FALLBACK_RELAY]: Hostile fallback token for query {}.", envelope.query_id);
        let _ = state.queue_broker.dead_letter(&leased_message, "FALLBACK_TOKEN_REJECTED").await;
        return;
    }

    match resolve_escalated_query(state, &envelope).await {
        Ok(()) => {
            info!("✅ [FALLBACK_RELAY]: Query {} resolved in the cloud.", envelope.query_id);
            if let Err(ack_fault) = state.queue_broker.complete(&leased_message).await {
                warn!("⚠️ [FALLBACK_RELAY]: Completion rejected: {}", ack_fault);
            }
        }
        Err(RelayFault::Permanent(reason)) => {
            error!("💀 [FALLBACK_RELAY]: Permanent fault -> dead-letter: {}", reason);
            let _ = state.queue_broker.dead_letter(&leased_message, &reason).await;
        }
        Err(RelayFault::Transient(reason)) => {
            warn!("↩️ [FALLBACK_RELAY]: Transient fault -> abandon: {}", reason);
            let _ = state.queue_broker.abandon(&leased_message).await;
        }
    }
}

/// Clasificación del fallo de resolución.
enum RelayFault {
    Permanent(String),
    Transient(String),
}

/// Descarga, re-inferencia y sellado del veredicto en la nube.
async fn resolve_escalated_query(state: &AppState, envelope: &FallbackEnvelope) -> Result<(), RelayFault> {
    // 1. DETECTOR Y DIRECTIVAS (detector desaparecido → permanente)
    let detector = state
        .detector_repository
        .fetch_visible_detector(&envelope.detector_id)
        .await
        .map_err(|fetch_fault| RelayFault::Permanent(fetch_fault.to_string()))?;

    let directives = assemble_inference_directives(state, &detector)
        .await
        .map_err(|assembly_fault| RelayFault::Permanent(assembly_fault.to_string()))?;

    // 2. DESCARGA DEL BLOB (bóveda caída → transitorio)
    let (container, blob_name) = split_blob_path(&envelope.blob_path)
        .map_err(|path_fault| RelayFault::Permanent(path_fault.to_string()))?;

    let image_bytes = state
        .blob_vault
        .download(container, blob_name)
        .await
        .map_err(|vault_fault| RelayFault::Transient(vault_fault.to_string()))?;

    // 3. RE-INVOCACIÓN DEL DESPACHADOR EN LA NUBE
    let report = state
        .inference_uplink
        .run_detector_inference(image_bytes, &directives)
        .await
        .map_err(|uplink_fault| RelayFault::Transient(uplink_fault.to_string()))?;

    // 4. SELLADO DEL VEREDICTO DE NUBE
    let (result_label, confidence) = match report.top_detection() {
        Some(top) => (top.label.clone(), top.confidence),
        None => (EMPTY_VERDICT_LABEL.to_string(), 1.0),
    };

    state
        .query_repository
        .seal_inference_outcome(
            &envelope.query_id,
            QueryStatus::Done,
            &result_label,
            confidence,
            &report.detections,
            false,
        )
        .await
        .map_err(|seal_fault| RelayFault::Transient(seal_fault.to_string()))?;

    Ok(())
}
