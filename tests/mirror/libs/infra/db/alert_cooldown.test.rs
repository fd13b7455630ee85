// [tests/mirror/libs/infra/db/alert_cooldown.test.rs]
/**
 * =================================================================
 * APARATO: ALERT COOLDOWN CERTIFIER (V4.2 - EXCLUSION PROOF)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L3-DB)
 * RESPONSABILIDAD: CERTIFICACIÓN DEL RASTRO DE ALERTAS Y SU VENTANA
 *
 * # Mathematical Proof (Cooldown Exclusivity):
 * Para toda alerta creada en t, ninguna otra alerta del mismo detector
 * reside en (t − cooldown, t]; la consulta 'latest_alert_since' es la
 * autoridad de esa verificación.
 * =================================================================
 */

use chrono::{Duration, Utc};
use intellioptics_domain_models::alert::{
    AlertConditionType, AlertSeverity, DetectorAlert, DetectorAlertConfig,
};
use intellioptics_infra_db::repositories::AlertRepository;
use intellioptics_infra_db::TursoClient;
use uuid::Uuid;

async fn forge_repository() -> AlertRepository {
    let client = TursoClient::connect(":memory:", None).await.expect("memory ledger must ignite");
    AlertRepository::new(client)
}

fn forge_alert(detector: &str, created_at: chrono::DateTime<Utc>) -> DetectorAlert {
    DetectorAlert {
        identifier: Uuid::new_v4().to_string(),
        detector_identifier: detector.to_string(),
        query_identifier: Some(Uuid::new_v4().to_string()),
        severity: AlertSeverity::Warning,
        message: "Alert: Fire Watch detected 'YES' (confidence: 90.00%)".to_string(),
        detection_label: "YES".to_string(),
        detection_confidence: 0.9,
        camera_name: None,
        image_blob_path: None,
        acknowledged: false,
        email_sent: false,
        sms_sent: false,
        created_at,
    }
}

/**
 * CERTIFICACIÓN: la ventana de cooldown observa la alerta persistida.
 */
#[tokio::test]
async fn certify_cooldown_window_observation() {
    println!("\n🧪 [PROVING_GROUNDS]: Validating cooldown observation...");

    let repository = forge_repository().await;
    let now = Utc::now();

    // 1. ALERTA RECIENTE: hace 60 segundos, cooldown de 5 minutos.
    repository
        .insert_alert(&forge_alert("det-gate", now - Duration::seconds(60)))
        .await
        .expect("insert");

    let cooldown_window_start = now - Duration::minutes(5);
    let latest = repository
        .latest_alert_since("det-gate", cooldown_window_start)
        .await
        .expect("window query");
    assert!(latest.is_some(), "An alert 60s old must live inside a 5-minute window.");

    // 2. DETECTOR AJENO: la ventana es por detector.
    let foreign = repository
        .latest_alert_since("det-other", cooldown_window_start)
        .await
        .expect("window query");
    assert!(foreign.is_none());

    // 3. VENTANA ESTRECHA: la alerta queda fuera.
    let narrow_window_start = now - Duration::seconds(30);
    let outside = repository
        .latest_alert_since("det-gate", narrow_window_start)
        .await
        .expect("window query");
    assert!(outside.is_none(), "A 30s window must exclude the 60s-old alert.");

    println!("   ✅ Cooldown: per-detector window observation certified.");
}

/**
 * CERTIFICACIÓN: banderas de entrega y reconocimiento.
 */
#[tokio::test]
async fn certify_delivery_flags_and_acknowledgement() {
    let repository = forge_repository().await;
    let alert = forge_alert("det-gate", Utc::now());
    repository.insert_alert(&alert).await.expect("insert");

    repository.seal_email_delivery(&alert.identifier).await.expect("email flag");
    repository.seal_sms_delivery(&alert.identifier).await.expect("sms flag");
    repository.acknowledge(&alert.identifier, "operator-1").await.expect("acknowledgement");

    // Reconocer una alerta fantasma es un fallo semántico.
    assert!(repository.acknowledge("ghost-alert", "operator-1").await.is_err());
}

/**
 * CERTIFICACIÓN: ida y vuelta de la configuración de alertado.
 */
#[tokio::test]
async fn certify_alert_config_roundtrip() {
    let repository = forge_repository().await;

    assert!(repository.fetch_alert_config("det-gate").await.expect("fetch").is_none());

    let config = DetectorAlertConfig {
        detector_identifier: "det-gate".to_string(),
        enabled: true,
        condition_type: AlertConditionType::LabelMatch,
        condition_value: Some("YES".to_string()),
        consecutive_count: 3,
        time_window_minutes: None,
        alert_emails: vec!["ops@example.com".to_string()],
        alert_phones: vec!["+15550001111".to_string()],
        alert_webhooks: Vec::new(),
        severity: AlertSeverity::Critical,
        cooldown_minutes: 5,
        custom_message: Some("{detector_name}: {label} at {confidence}".to_string()),
        alert_name: Some("Gate Watch".to_string()),
        include_image: true,
    };
    repository.upsert_alert_config(&config).await.expect("upsert");

    let hydrated = repository
        .fetch_alert_config("det-gate")
        .await
        .expect("fetch")
        .expect("config must exist");
    assert_eq!(hydrated.condition_type, AlertConditionType::LabelMatch);
    assert_eq!(hydrated.consecutive_count, 3);
    assert_eq!(hydrated.severity, AlertSeverity::Critical);
    assert_eq!(hydrated.alert_emails, vec!["ops@example.com".to_string()]);
}
