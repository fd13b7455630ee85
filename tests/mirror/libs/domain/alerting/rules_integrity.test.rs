// [tests/mirror/libs/domain/alerting/rules_integrity.test.rs]
/**
 * =================================================================
 * APARATO: HERALD RULES CERTIFIER (V4.3 - GATE CHAIN PROOF)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L2-HERALD)
 * RESPONSABILIDAD: CERTIFICACIÓN DE LA CADENA COMPLETA DE COMPUERTAS
 * =================================================================
 */

use chrono::{Duration, Utc};
use intellioptics_domain_alerting::{
    compose_alert_message, consecutive_requirement_met, evaluate_alert_gates, GateVerdict,
};
use intellioptics_domain_models::alert::{
    AlertConditionType, AlertSeverity, DetectorAlertConfig,
};

fn forge_config() -> DetectorAlertConfig {
    DetectorAlertConfig {
        detector_identifier: "det-gate".to_string(),
        enabled: true,
        condition_type: AlertConditionType::LabelMatch,
        condition_value: Some("YES".to_string()),
        consecutive_count: 3,
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

fn labels(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|label| label.to_string()).collect()
}

/**
 * CERTIFICACIÓN: secuencia del contrato YES NO YES YES YES con
 * consecutive_count=3 — la alerta abre únicamente en el quinto envío.
 */
#[test]
fn certify_consecutive_sequence_scenario() {
    println!("\n🧪 [PROVING_GROUNDS]: Validating consecutive-count scenario...");

    // Historia vista tras cada envío (recientes primero).
    let history_per_submission: Vec<Vec<String>> = vec![
        labels(&["YES"]),
        labels(&["NO", "YES"]),
        labels(&["YES", "NO", "YES"]),
        labels(&["YES", "YES", "NO", "YES"]),
        labels(&["YES", "YES", "YES", "NO", "YES"]),
    ];
    let submission_labels = ["YES", "NO", "YES", "YES", "YES"];

    let mut firing_submissions = Vec::new();
    for (index, history) in history_per_submission.iter().enumerate() {
        if submission_labels[index] == "YES"
            && consecutive_requirement_met(history, "YES", 3)
        {
            firing_submissions.push(index + 1);
        }
    }

    assert_eq!(firing_submissions, vec![5], "The alert must fire only on the fifth submission.");
    println!("   ✅ Sequence: fires exactly on submission #5.");
}

/**
 * CERTIFICACIÓN: consecutive_count=1 dispara siempre que la condición
 * base coincide y el cooldown expiró.
 */
#[test]
fn certify_single_count_tautology() {
    let mut config = forge_config();
    config.consecutive_count = 1;

    let verdict = evaluate_alert_gates(&config, "YES", 0.9, &[], 0, None, Utc::now())
        .expect("gate chain resolves");
    assert_eq!(verdict, GateVerdict::Fire);
}

/**
 * CERTIFICACIÓN: escenario de cooldown del contrato — dos coincidencias
 * separadas 60 segundos con cooldown de 5 minutos → un solo disparo.
 */
#[test]
fn certify_cooldown_scenario() {
    println!("\n🧪 [PROVING_GROUNDS]: Validating cooldown scenario...");

    let mut config = forge_config();
    config.consecutive_count = 1;

    let first_submission_at = Utc::now();

    // 1. PRIMER ENVÍO: sin alertas previas → dispara.
    let first_verdict =
        evaluate_alert_gates(&config, "YES", 0.9, &[], 0, None, first_submission_at)
            .expect("gate chain resolves");
    assert_eq!(first_verdict, GateVerdict::Fire);

    // 2. SEGUNDO ENVÍO 60s DESPUÉS: la alerta previa vive en la ventana.
    let second_submission_at = first_submission_at + Duration::seconds(60);
    let second_verdict = evaluate_alert_gates(
        &config,
        "YES",
        0.9,
        &[],
        0,
        Some(first_submission_at),
        second_submission_at,
    )
    .expect("gate chain resolves");
    assert_eq!(second_verdict, GateVerdict::CooldownActive, "The second trigger must be suppressed.");

    // 3. TRAS EXPIRAR EL COOLDOWN: vuelve a disparar.
    let third_submission_at = first_submission_at + Duration::minutes(6);
    let third_verdict = evaluate_alert_gates(
        &config,
        "YES",
        0.9,
        &[],
        0,
        Some(first_submission_at),
        third_submission_at,
    )
    .expect("gate chain resolves");
    assert_eq!(third_verdict, GateVerdict::Fire);

    println!("   ✅ Cooldown: exactly one alert inside the window.");
}

/**
 * CERTIFICACIÓN: precedencia de la ventana temporal sobre el modo consecutivo.
 */
#[test]
fn certify_time_window_precedence() {
    let mut config = forge_config();
    config.time_window_minutes = Some(10);
    config.consecutive_count = 3;

    // Historia consecutiva rota, pero el conteo de ventana alcanza.
    let broken_history = labels(&["YES", "NO", "YES"]);

    let verdict =
        evaluate_alert_gates(&config, "YES", 0.9, &broken_history, 3, None, Utc::now())
            .expect("gate chain resolves");
    assert_eq!(verdict, GateVerdict::Fire, "Window mode must override the consecutive gate.");

    let starving_verdict =
        evaluate_alert_gates(&config, "YES", 0.9, &broken_history, 2, None, Utc::now())
            .expect("gate chain resolves");
    assert_eq!(starving_verdict, GateVerdict::SequenceUnmet);
}

/**
 * CERTIFICACIÓN: composición del mensaje con formato porcentual.
 */
#[test]
fn certify_message_composition() {
    let default_message = compose_alert_message(None, "Gate Watch", "YES", 0.9, None);
    assert_eq!(default_message, "Alert: Gate Watch detected 'YES' (confidence: 90.00%)");

    let templated = compose_alert_message(
        Some("{detector_name} saw {label} ({confidence})"),
        "Gate Watch",
        "YES",
        0.925,
        None,
    );
    assert_eq!(templated, "Gate Watch saw YES (92.50%)");
}
