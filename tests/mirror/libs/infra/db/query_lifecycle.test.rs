// [tests/mirror/libs/infra/db/query_lifecycle.test.rs]
/**
 * =================================================================
 * APARATO: QUERY LIFECYCLE CERTIFIER (V4.3 - STATE MACHINE PROOF)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L3-DB)
 * RESPONSABILIDAD: CERTIFICACIÓN DEL CICLO PENDING → DONE/ESCALATED,
 *                  VERDAD DE TERRENO Y CASCADA DE BORRADO
 * =================================================================
 */

use chrono::Utc;
use intellioptics_domain_models::inference::Detection;
use intellioptics_domain_models::query::{Annotation, Query, QueryStatus};
use intellioptics_infra_db::repositories::QueryRepository;
use intellioptics_infra_db::{DbError, TursoClient};
use uuid::Uuid;

async fn forge_repository() -> QueryRepository {
    let client = TursoClient::connect(":memory:", None).await.expect("memory ledger must ignite");
    QueryRepository::new(client)
}

fn forge_pending_query(detector: Option<&str>) -> Query {
    Query {
        identifier: Uuid::new_v4().to_string(),
        detector_identifier: detector.map(str::to_string),
        image_blob_path: "images/queries/det-1/frame.jpg".to_string(),
        status: QueryStatus::Pending,
        result_label: None,
        confidence: None,
        detections: Vec::new(),
        local_inference: false,
        escalated: false,
        ground_truth: None,
        is_correct: None,
        reviewed_by: None,
        reviewed_at: None,
        created_at: Utc::now(),
    }
}

/**
 * CERTIFICACIÓN: sellado DONE con el veredicto de máxima confianza.
 */
#[tokio::test]
async fn certify_done_seal_with_top_detection() {
    println!("\n🧪 [PROVING_GROUNDS]: Validating DONE seal...");

    let repository = forge_repository().await;
    let query = forge_pending_query(Some("det-fire"));
    repository.create(&query).await.expect("creation must succeed");

    let detections = vec![
        Detection { label: "smoke".into(), confidence: 0.4, bbox: [0.0, 0.0, 10.0, 10.0], oodd_adjusted: false },
        Detection { label: "fire".into(), confidence: 0.9, bbox: [10.0, 10.0, 100.0, 100.0], oodd_adjusted: false },
    ];

    repository
        .seal_inference_outcome(&query.identifier, QueryStatus::Done, "fire", 0.9, &detections, true)
        .await
        .expect("seal must succeed");

    let hydrated = repository.fetch(&query.identifier).await.expect("fetch resolves");
    assert_eq!(hydrated.status, QueryStatus::Done);
    assert_eq!(hydrated.result_label.as_deref(), Some("fire"));
    assert_eq!(hydrated.detections.len(), 2);
    assert!(hydrated.local_inference);

    println!("   ✅ DONE seal: verdict and embedded detections certified.");
}

/**
 * CERTIFICACIÓN: escalamiento transaccional con fila de derivación.
 */
#[tokio::test]
async fn certify_escalation_seal() {
    let repository = forge_repository().await;
    let query = forge_pending_query(Some("det-fire"));
    repository.create(&query).await.expect("creation");

    let escalation = repository
        .seal_escalation(&query.identifier, "Low confidence (0.30)")
        .await
        .expect("escalation must seal");

    assert!(escalation.reason.contains("Low confidence"));
    assert!(!escalation.resolved);

    let hydrated = repository.fetch(&query.identifier).await.expect("fetch");
    assert_eq!(hydrated.status, QueryStatus::Escalated);
    assert!(hydrated.escalated);

    // Resolución por revisor.
    repository.resolve_escalation(&escalation.identifier).await.expect("resolution");
}

/**
 * CERTIFICACIÓN: reconciliación de verdad de terreno (case-insensitive).
 */
#[tokio::test]
async fn certify_ground_truth_reconciliation() {
    println!("\n🧪 [PROVING_GROUNDS]: Validating ground truth seal...");

    let repository = forge_repository().await;
    let query = forge_pending_query(Some("det-fire"));
    repository.create(&query).await.expect("creation");
    repository
        .seal_inference_outcome(&query.identifier, QueryStatus::Done, "FIRE", 0.9, &[], true)
        .await
        .expect("seal");

    let mut hydrated = repository.fetch(&query.identifier).await.expect("fetch");
    hydrated.reconcile_ground_truth("fire", "reviewer-7");
    repository.seal_ground_truth(&hydrated).await.expect("ground truth seal");

    let reviewed = repository.fetch(&query.identifier).await.expect("fetch");
    assert_eq!(reviewed.is_correct, Some(true), "FIRE vs fire must reconcile as correct.");
    assert_eq!(reviewed.reviewed_by.as_deref(), Some("reviewer-7"));

    let metrics = repository.ground_truth_metrics().await.expect("metrics");
    assert_eq!(metrics.reviewed_count, 1);
    assert_eq!(metrics.correct_count, 1);

    println!("   ✅ Ground truth: is_correct ⟺ case-folded equality.");
}

/**
 * CERTIFICACIÓN: la cascada elimina derivaciones, feedback y anotaciones.
 */
#[tokio::test]
async fn certify_delete_cascade() {
    println!("\n🧪 [PROVING_GROUNDS]: Validating delete cascade...");

    let repository = forge_repository().await;
    let query = forge_pending_query(Some("det-fire"));
    repository.create(&query).await.expect("creation");
    repository.seal_escalation(&query.identifier, "Low confidence (0.30)").await.expect("escalation");
    repository
        .insert_annotation(&Annotation {
            identifier: Uuid::new_v4().to_string(),
            query_identifier: query.identifier.clone(),
            payload_json: "{\"boxes\":[]}".to_string(),
            created_at: Utc::now(),
        })
        .await
        .expect("annotation");

    let blob_path = repository.delete_cascade(&query.identifier).await.expect("cascade");
    assert_eq!(blob_path, "images/queries/det-1/frame.jpg");

    let post_mortem = repository.fetch(&query.identifier).await;
    assert!(matches!(post_mortem, Err(DbError::RecordNotFound { .. })));

    println!("   ✅ Cascade: lateral rows purged, blob path surfaced for vault purge.");
}

/**
 * CERTIFICACIÓN: ventana de veredictos recientes (recientes primero).
 */
#[tokio::test]
async fn certify_recent_labels_window() {
    let repository = forge_repository().await;

    for (sequence, label) in ["YES", "NO", "YES", "YES", "YES"].iter().enumerate() {
        let mut query = forge_pending_query(Some("det-gate"));
        // Separación temporal estricta para el orden del ledger.
        query.created_at = Utc::now() + chrono::Duration::milliseconds(sequence as i64 * 10);
        repository.create(&query).await.expect("creation");
        repository
            .seal_inference_outcome(&query.identifier, QueryStatus::Done, label, 0.9, &[], true)
            .await
            .expect("seal");
    }

    let recent = repository.recent_result_labels("det-gate", 3).await.expect("window");
    assert_eq!(recent, vec!["YES".to_string(), "YES".to_string(), "YES".to_string()]);
}
