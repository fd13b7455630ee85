// [tests/mirror/libs/infra/db/detector_soft_delete.test.rs]
/**
 * =================================================================
 * APARATO: DETECTOR SOFT DELETE CERTIFIER (V4.2 - VISIBILITY PROOF)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L3-DB)
 * RESPONSABILIDAD: CERTIFICACIÓN DEL BORRADO LÓGICO Y LA CONFIGURACIÓN
 * =================================================================
 */

use chrono::Utc;
use intellioptics_domain_models::detector::{Detector, DetectorConfig, DetectionMode};
use intellioptics_infra_db::repositories::DetectorRepository;
use intellioptics_infra_db::{DbError, TursoClient};

async fn forge_repository() -> DetectorRepository {
    let client = TursoClient::connect(":memory:", None).await.expect("memory ledger must ignite");
    DetectorRepository::new(client)
}

fn forge_detector(identifier: &str) -> Detector {
    Detector {
        identifier: identifier.to_string(),
        display_name: "Fire Watch".to_string(),
        group_name: Some("safety".to_string()),
        query_text: "Is there a fire?".to_string(),
        mode: DetectionMode::BoundingBox,
        class_names: vec!["fire".to_string(), "smoke".to_string()],
        confidence_threshold: 0.5,
        patience_time_seconds: 30.0,
        primary_model_blob_path: Some("models/det-fire/primary/model.onnx".to_string()),
        oodd_model_blob_path: Some("models/det-fire/oodd/model.onnx".to_string()),
        deleted_at: None,
        created_at: Utc::now(),
    }
}

/**
 * CERTIFICACIÓN: un detector borrado lógicamente desaparece de todo
 * listado que excluya borrados y su resolución distingue 409 de 404.
 */
#[tokio::test]
async fn certify_soft_delete_visibility() {
    println!("\n🧪 [PROVING_GROUNDS]: Validating soft delete discipline...");

    let repository = forge_repository().await;
    repository.upsert_detector(&forge_detector("det-fire")).await.expect("upsert");
    repository.upsert_detector(&forge_detector("det-intact")).await.expect("upsert");

    // 1. VISIBILIDAD NOMINAL
    assert_eq!(repository.list_visible().await.expect("list").len(), 2);
    assert!(repository.fetch_visible_detector("det-fire").await.is_ok());

    // 2. SELLADO DEL BORRADO LÓGICO
    repository.soft_delete("det-fire").await.expect("soft delete");

    let survivors = repository.list_visible().await.expect("list");
    assert_eq!(survivors.len(), 1);
    assert_eq!(survivors[0].identifier, "det-intact");

    // 3. TRIAJE SEMÁNTICO: borrado ≠ ausente.
    let soft_deleted_fault = repository.fetch_visible_detector("det-fire").await;
    assert!(matches!(soft_deleted_fault, Err(DbError::SoftDeleted { .. })));

    let missing_fault = repository.fetch_visible_detector("det-phantom").await;
    assert!(matches!(missing_fault, Err(DbError::RecordNotFound { .. })));

    // 4. IDEMPOTENCIA: re-borrar un borrado es RecordNotFound (ya oculto).
    let repeat_fault = repository.soft_delete("det-fire").await;
    assert!(repeat_fault.is_err());

    println!("   ✅ Soft delete: visibility and semantic triage certified.");
}

/**
 * CERTIFICACIÓN: configuración extendida con defaults e hidratación.
 */
#[tokio::test]
async fn certify_extended_config_roundtrip() {
    let repository = forge_repository().await;
    let detector = forge_detector("det-fire");
    repository.upsert_detector(&detector).await.expect("upsert");

    // 1. SIN CONFIGURACIÓN: rigen los defaults.
    let defaults = repository.fetch_config("det-fire").await.expect("defaults");
    assert!((defaults.detection_params.min_score_threshold - 0.25).abs() < f32::EPSILON);
    assert_eq!(defaults.model_input_config.input_width, 640);

    // 2. CONFIGURACIÓN EXPLÍCITA CON UMBRALES POR CLASE.
    let mut explicit = DetectorConfig {
        detector_identifier: "det-fire".to_string(),
        ..DetectorConfig::default()
    };
    explicit.per_class_thresholds.insert("fire".to_string(), 0.7);
    explicit.detection_params.max_detections = 25;
    explicit.edge_inference_enabled = true;

    explicit.validate_thresholds(&detector.class_names).expect("subset invariant holds");
    repository.upsert_config(&explicit).await.expect("config upsert");

    let hydrated = repository.fetch_config("det-fire").await.expect("hydration");
    assert_eq!(hydrated.per_class_thresholds.get("fire"), Some(&0.7));
    assert_eq!(hydrated.detection_params.max_detections, 25);
    assert!(hydrated.edge_inference_enabled);
}
