// [apps/orchestrator/src/services/alert_engine.rs]
/*!
 * =================================================================
 * APARATO: HERALD ALERT ENGINE SERVICE (V5.4 - DISPATCH GOLD)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: EVALUACIÓN DE COMPUERTAS, PERSISTENCIA Y DESPACHO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. PERSIST-BEFORE-SEND: El registro DetectorAlert se cristaliza ANTES
 *    de cualquier envío; la verificación de cooldown observa todas las
 *    alertas previamente persistidas.
 * 2. BEST EFFORT CHANNELS: El fallo de un canal (correo, SMS, webhook)
 *    se registra y no impide los canales restantes; las banderas de
 *    entrega se sellan tras el éxito.
 * 3. NULL ON SUPPRESSION: Compuerta cerrada (condición, secuencia o
 *    cooldown) → registro de rastro y retorno None.
 * =================================================================
 */

use crate::state::AppState;
use chrono::{Duration, Utc};
use intellioptics_domain_alerting::{compose_alert_message, evaluate_alert_gates, GateVerdict};
use intellioptics_domain_models::alert::DetectorAlert;
use intellioptics_infra_notify::email::render_alert_email_html;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/**
 * Punto de entrada del motor de alertas por detector.
 *
 * # Returns:
 * El identificador de la alerta creada, o None si alguna compuerta
 * suprimió el disparo o el motor colapsó (mejor esfuerzo).
 */
#[instrument(skip(state), fields(detector = %detector_identifier, label = %result_label))]
pub async fn trigger_detector_alert(
    state: &AppState,
    detector_identifier: &str,
    query_identifier: &str,
    result_label: &str,
    confidence: f32,
    camera_name: Option<&str>,
    image_blob_path: Option<&str>,
) -> Option<String> {
    match evaluate_and_dispatch(
        state,
        detector_identifier,
        query_identifier,
        result_label,
        confidence,
        camera_name,
        image_blob_path,
    )
    .await
    {
        Ok(alert_identifier) => alert_identifier,
        Err(engine_fault) => {
            // Mejor esfuerzo absoluto: el motor jamás aborta al llamador.
            error!("⚠️ [HERALD_ENGINE]: Alert evaluation collapsed: {}", engine_fault);
            None
        }
    }
}

async fn evaluate_and_dispatch(
    state: &AppState,
    detector_identifier: &str,
    query_identifier: &str,
    result_label: &str,
    confidence: f32,
    camera_name: Option<&str>,
    image_blob_path: Option<&str>,
) -> anyhow::Result<Option<String>> {
    // 1. CONFIGURACIÓN DE ALERTADO (ausente o apagada → silencio)
    let Some(config) = state
        .alert_repository
        .fetch_alert_config(detector_identifier)
        .await?
    else {
        debug!("⚪ [HERALD_ENGINE]: No alert config for {}; silent.", detector_identifier);
        return Ok(None);
    };

    // 2. HIDRATACIÓN DE LAS COMPUERTAS (lecturas best-effort)
    let evaluation_instant = Utc::now();

    let recent_labels = state
        .query_repository
        .recent_result_labels(detector_identifier, config.consecutive_count.max(1))
        .await?;

    let matching_count_in_window = match config.time_window_minutes {
        Some(window_minutes) if window_minutes > 0 => {
            let window_start = evaluation_instant - Duration::minutes(window_minutes as i64);
            state
                .query_repository
                .count_label_since(detector_identifier, result_label, window_start)
                .await?
        }
        _ => 0,
    };

    let cooldown_window_start =
        evaluation_instant - Duration::minutes(config.cooldown_minutes as i64);
    let latest_alert_at = state
        .alert_repository
        .latest_alert_since(detector_identifier, cooldown_window_start)
        .await?;

    // 3. CADENA DE COMPUERTAS
    let gate_verdict = evaluate_alert_gates(
        &config,
        result_label,
        confidence,
        &recent_labels,
        matching_count_in_window,
        latest_alert_at,
        evaluation_instant,
    )?;

    if gate_verdict != GateVerdict::Fire {
        info!("🚪 [HERALD_ENGINE]: Alert suppressed for {}: {:?}", detector_identifier, gate_verdict);
        return Ok(None);
    }

    // 4. COMPOSICIÓN DEL MENSAJE Y CRISTALIZACIÓN DEL REGISTRO
    let detector = state
        .detector_repository
        .fetch_visible_detector(detector_identifier)
        .await?;

    let message = compose_alert_message(
        config.custom_message.as_deref(),
        &detector.display_name,
        result_label,
        confidence,
        camera_name,
    );

    let alert = DetectorAlert {
        identifier: Uuid::new_v4().to_string(),
        detector_identifier: detector_identifier.to_string(),
        query_identifier: Some(query_identifier.to_string()),
        severity: config.severity,
        message: message.clone(),
        detection_label: result_label.to_string(),
        detection_confidence: confidence,
        camera_name: camera_name.map(str::to_string),
        image_blob_path: image_blob_path.map(str::to_string),
        acknowledged: false,
        email_sent: false,
        sms_sent: false,
        created_at: evaluation_instant,
    };

    // Persistencia ANTES de cualquier envío (ordering del cooldown).
    state.alert_repository.insert_alert(&alert).await?;
    info!("🔔 [HERALD_ENGINE]: Alert {} created for detector {}.", alert.identifier, detector.display_name);

    // 5. URL DE IMAGEN FIRMADA PARA LOS CANALES VISUALES
    let signed_image_url = image_blob_path
        .filter(|_| config.include_image)
        .and_then(|blob_path| state.sign_blob_path(blob_path));

    // 6. DESPACHO MULTI-CANAL (mejor esfuerzo por canal)
    let alert_name = config
        .alert_name
        .clone()
        .unwrap_or_else(|| format!("{} Alert", detector.display_name));
    let alert_title = format!("{} detected", result_label);

    if !config.alert_emails.is_empty() {
        let subject = format!("[{}] {}", config.severity.as_subject_tag(), alert_name);
        let html_body = render_alert_email_html(
            &alert_title,
            &detector.display_name,
            result_label,
            confidence,
            camera_name,
            signed_image_url.as_deref(),
        );

        match state.email_dispatcher.send_html(&config.alert_emails, &subject, &html_body).await {
            Ok(()) => {
                if let Err(seal_fault) = state.alert_repository.seal_email_delivery(&alert.identifier).await {
                    warn!("⚠️ [HERALD_ENGINE]: Email flag seal failed: {}", seal_fault);
                }
            }
            Err(dispatch_fault) => {
                warn!("⚠️ [HERALD_ENGINE]: Email channel failed: {}", dispatch_fault)
            }
        }
    }

    if !config.alert_phones.is_empty() {
        let sms_body = format!("IntelliOptics Alert: {}", message);
        match state
            .sms_dispatcher
            .send_to_all(&config.alert_phones, &sms_body, signed_image_url.as_deref())
            .await
        {
            Ok(accepted) if accepted > 0 => {
                if let Err(seal_fault) = state.alert_repository.seal_sms_delivery(&alert.identifier).await {
                    warn!("⚠️ [HERALD_ENGINE]: SMS flag seal failed: {}", seal_fault);
                }
            }
            Ok(_) => {}
            Err(dispatch_fault) => {
                warn!("⚠️ [HERALD_ENGINE]: SMS channel failed: {}", dispatch_fault)
            }
        }
    }

    if !config.alert_webhooks.is_empty() {
        if let Err(dispatch_fault) = state
            .webhook_dispatcher
            .post_to_all(&config.alert_webhooks, &alert)
            .await
        {
            warn!("⚠️ [HERALD_ENGINE]: Webhook channel failed: {}", dispatch_fault);
        }
    }

    Ok(Some(alert.identifier))
}
