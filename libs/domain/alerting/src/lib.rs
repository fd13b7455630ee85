// [libs/domain/alerting/src/lib.rs]
/*!
 * =================================================================
 * APARATO: HERALD RULES ENGINE (V4.3 - CLOSED CONDITIONS)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: EVALUACIÓN PURA DE REGLAS DE ALERTADO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. STORAGE-FREE PURITY: El motor evalúa sobre datos ya hidratados
 *    (etiquetas recientes, conteos de ventana, marca del último
 *    disparo); toda la I/O vive en el servicio del Orchestrator.
 * 2. CONDITION SET SEAL: ALWAYS | LABEL_MATCH | CONFIDENCE_ABOVE |
 *    CONFIDENCE_BELOW — el conjunto prescrito, sin las variantes
 *    heredadas divergentes.
 * 3. WINDOW PRECEDENCE: Con 'time_window_minutes' positiva rige el modo
 *    de ventana; en su ausencia, el modo consecutivo estricto.
 *
 * # Mathematical Proof (Consecutive Gate):
 * Con N = consecutive_count y S = últimos N veredictos (recientes
 * primero), la compuerta exige |S| ≥ N ∧ ∀s ∈ S: s == etiqueta. Para
 * N = 1 la compuerta es tautológica: basta la condición base.
 * =================================================================
 */

pub mod message;

pub use message::compose_alert_message;

use chrono::{DateTime, Duration, Utc};
use intellioptics_domain_models::alert::{AlertConditionType, DetectorAlertConfig};
use thiserror::Error;
use tracing::{debug, warn};

/// Fallos de evaluación de reglas.
#[derive(Error, Debug)]
pub enum AlertingError {
    /// El valor de condición no parsea como umbral numérico.
    #[error("[L2_HERALD_FAULT]: INVALID_CONDITION_VALUE -> '{0}' is not a numeric threshold")]
    InvalidConditionValue(String),
}

/// Veredicto de la cadena completa de compuertas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateVerdict {
    /// Todas las compuertas abiertas: la alerta debe dispararse.
    Fire,
    /// El alertado está deshabilitado para el detector.
    Disabled,
    /// La condición base no se cumplió.
    ConditionUnmet,
    /// La secuencia consecutiva o el conteo de ventana no se alcanzó.
    SequenceUnmet,
    /// Una alerta previa vive dentro de la ventana de cooldown.
    CooldownActive,
}

/**
 * Evalúa la condición base contra el veredicto de la consulta.
 *
 * # Errors:
 * - `InvalidConditionValue`: Umbral de confianza no numérico.
 */
pub fn evaluate_base_condition(
    config: &DetectorAlertConfig,
    result_label: &str,
    confidence: f32,
) -> Result<bool, AlertingError> {
    let parse_threshold = || -> Result<f32, AlertingError> {
        let raw_value = config.condition_value.as_deref().unwrap_or_default();
        raw_value
            .trim()
            .parse::<f32>()
            .map_err(|_| AlertingError::InvalidConditionValue(raw_value.to_string()))
    };

    let condition_met = match config.condition_type {
        AlertConditionType::Always => true,
        AlertConditionType::LabelMatch => match config.condition_value.as_deref() {
            Some(target_label) => result_label.to_uppercase() == target_label.to_uppercase(),
            None => false,
        },
        AlertConditionType::ConfidenceAbove => confidence >= parse_threshold()?,
        AlertConditionType::ConfidenceBelow => confidence < parse_threshold()?,
    };

    Ok(condition_met)
}

/**
 * Compuerta consecutiva estricta: los últimos N veredictos (recientes
 * primero) deben igualar la etiqueta objetivo, en orden.
 */
pub fn consecutive_requirement_met(
    recent_labels_newest_first: &[String],
    target_label: &str,
    required_count: u32,
) -> bool {
    if required_count <= 1 {
        return true;
    }

    let required = required_count as usize;
    if recent_labels_newest_first.len() < required {
        return false;
    }

    recent_labels_newest_first[..required]
        .iter()
        .all(|observed_label| observed_label == target_label)
}

/// Compuerta de ventana temporal: conteo de coincidencias ≥ requerido.
pub fn time_window_requirement_met(matching_count_in_window: u64, required_count: u32) -> bool {
    matching_count_in_window >= required_count as u64
}

/**
 * Compuerta de cooldown: abierta si no existe alerta del detector
 * dentro de la ventana (la verificación observa todas las alertas
 * previamente persistidas).
 */
pub fn cooldown_expired(
    latest_alert_at: Option<DateTime<Utc>>,
    cooldown_minutes: u32,
    evaluation_instant: DateTime<Utc>,
) -> bool {
    match latest_alert_at {
        None => true,
        Some(last_fired_at) => {
            evaluation_instant - last_fired_at >= Duration::minutes(cooldown_minutes as i64)
        }
    }
}

/**
 * Cadena completa de compuertas sobre datos ya hidratados.
 *
 * # Logic:
 * enabled → condición base → (ventana temporal | consecutivo) →
 * cooldown. El primer cierre determina el veredicto.
 */
pub fn evaluate_alert_gates(
    config: &DetectorAlertConfig,
    result_label: &str,
    confidence: f32,
    recent_labels_newest_first: &[String],
    matching_count_in_window: u64,
    latest_alert_at: Option<DateTime<Utc>>,
    evaluation_instant: DateTime<Utc>,
) -> Result<GateVerdict, AlertingError> {
    if !config.enabled {
        return Ok(GateVerdict::Disabled);
    }

    if !evaluate_base_condition(config, result_label, confidence)? {
        debug!("🚪 [HERALD_GATES]: Base condition unmet for '{}'.", result_label);
        return Ok(GateVerdict::ConditionUnmet);
    }

    let sequence_open = match config.time_window_minutes {
        Some(window_minutes) if window_minutes > 0 => {
            time_window_requirement_met(matching_count_in_window, config.consecutive_count)
        }
        _ => consecutive_requirement_met(
            recent_labels_newest_first,
            result_label,
            config.consecutive_count,
        ),
    };

    if !sequence_open {
        debug!(
            "🚪 [HERALD_GATES]: Sequence gate closed (need {} of '{}').",
            config.consecutive_count, result_label
        );
        return Ok(GateVerdict::SequenceUnmet);
    }

    if !cooldown_expired(latest_alert_at, config.cooldown_minutes, evaluation_instant) {
        warn!(
            "🧊 [HERALD_GATES]: Cooldown active ({} min) — alert suppressed.",
            config.cooldown_minutes
        );
        return Ok(GateVerdict::CooldownActive);
    }

    Ok(GateVerdict::Fire)
}

#[cfg(test)]
mod tests {
    use super::*;
    use intellioptics_domain_models::alert::AlertSeverity;

    fn forge_config(condition_type: AlertConditionType, condition_value: Option<&str>) -> DetectorAlertConfig {
        DetectorAlertConfig {
            detector_identifier: "det-alpha".into(),
            enabled: true,
            condition_type,
            condition_value: condition_value.map(str::to_string),
            consecutive_count: 1,
            time_window_minutes: None,
            alert_emails: Vec::new(),
            alert_phones: Vec::new(),
            alert_webhooks: Vec::new(),
            severity: AlertSeverity::Warning,
            cooldown_minutes: 5,
            custom_message: None,
            alert_name: None,
            include_image: true,
        }
    }

    #[test]
    fn certify_label_match_is_case_folded() {
        let config = forge_config(AlertConditionType::LabelMatch, Some("YES"));
        assert!(evaluate_base_condition(&config, "yes", 0.9).unwrap());
        assert!(!evaluate_base_condition(&config, "no", 0.9).unwrap());
    }

    #[test]
    fn certify_confidence_thresholds() {
        let above = forge_config(AlertConditionType::ConfidenceAbove, Some("0.8"));
        assert!(evaluate_base_condition(&above, "fire", 0.8).unwrap());
        assert!(!evaluate_base_condition(&above, "fire", 0.79).unwrap());

        let below = forge_config(AlertConditionType::ConfidenceBelow, Some("0.5"));
        assert!(evaluate_base_condition(&below, "fire", 0.49).unwrap());
        assert!(!evaluate_base_condition(&below, "fire", 0.5).unwrap());
    }

    #[test]
    fn certify_hostile_threshold_rejected() {
        let hostile = forge_config(AlertConditionType::ConfidenceAbove, Some("not-a-number"));
        assert!(matches!(
            evaluate_base_condition(&hostile, "fire", 0.9),
            Err(AlertingError::InvalidConditionValue(_))
        ));
    }

    #[test]
    fn certify_consecutive_gate_sequence() {
        let labels = |raw: &[&str]| raw.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        // Secuencia YES NO YES YES YES (recientes primero tras el 5º envío):
        // [YES, YES, YES, NO, YES] → abre con required=3.
        assert!(consecutive_requirement_met(&labels(&["YES", "YES", "YES", "NO", "YES"]), "YES", 3));
        // Tras el 4º envío: [YES, YES, NO, YES] → cerrada.
        assert!(!consecutive_requirement_met(&labels(&["YES", "YES", "NO", "YES"]), "YES", 3));
        // Historia insuficiente.
        assert!(!consecutive_requirement_met(&labels(&["YES", "YES"]), "YES", 3));
        // required=1 es tautológica incluso sin historia.
        assert!(consecutive_requirement_met(&[], "YES", 1));
    }

    #[test]
    fn certify_cooldown_boundary() {
        let now = Utc::now();
        let five_minutes_ago = now - Duration::minutes(5);
        let one_minute_ago = now - Duration::minutes(1);

        assert!(cooldown_expired(Some(five_minutes_ago), 5, now));
        assert!(!cooldown_expired(Some(one_minute_ago), 5, now));
        assert!(cooldown_expired(None, 5, now));
    }

    #[test]
    fn certify_full_gate_chain_fire() {
        let mut config = forge_config(AlertConditionType::LabelMatch, Some("YES"));
        config.consecutive_count = 3;

        let recent = vec!["YES".to_string(), "YES".to_string(), "YES".to_string()];
        let verdict = evaluate_alert_gates(&config, "YES", 0.9, &recent, 0, None, Utc::now())
            .expect("gate chain must resolve");

        assert_eq!(verdict, GateVerdict::Fire);
    }

    #[test]
    fn certify_disabled_short_circuits() {
        let mut config = forge_config(AlertConditionType::Always, None);
        config.enabled = false;

        let verdict = evaluate_alert_gates(&config, "YES", 0.9, &[], 0, None, Utc::now())
            .expect("gate chain must resolve");
        assert_eq!(verdict, GateVerdict::Disabled);
    }
}
