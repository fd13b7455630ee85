// [tests/mirror/libs/domain/models/serialization_integrity.test.rs]
/**
 * =================================================================
 * APARATO: DOMAIN SERIALIZATION CERTIFIER (V4.2 - WIRE PARITY)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L2-MODELS)
 * RESPONSABILIDAD: CERTIFICACIÓN DE PARIDAD JSON DE CONTRATOS CABLEADOS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. DISCRIMINATOR SEAL: Los estados de máquina viajan en
 *    SCREAMING_SNAKE_CASE y las severidades en lowercase; cualquier
 *    deriva rompe la paridad con el plano de control.
 * 2. ENVELOPE PARITY: Los sobres de cola preservan el esquema cableado
 *    bit-perfecto en ida y vuelta.
 * =================================================================
 */

use intellioptics_domain_models::alert::AlertConditionType;
use intellioptics_domain_models::detector::DetectionMode;
use intellioptics_domain_models::inference::{
    Detection, FallbackEnvelope, ImageQueryEnvelope, InferenceDirectives,
};
use intellioptics_domain_models::query::QueryStatus;

/**
 * CERTIFICACIÓN: Roundtrip de los sobres de mensajería.
 */
#[test]
fn certify_queue_envelope_roundtrip() {
    println!("\n🧪 [PROVING_GROUNDS]: Validating queue envelope wire parity...");

    let inbound_envelope = ImageQueryEnvelope {
        image_query_id: "iq-7f3a".to_string(),
        blob_url: "https://vault.example/images/queries/det-1/frame.jpg".to_string(),
    };

    // 1. SERIALIZACIÓN: Transformación a ráfaga de texto JSON.
    let serialized_json = serde_json::to_string(&inbound_envelope)
        .expect("CRITICAL_FAULT: Serialization strata collapsed.");

    // 2. AUDITORÍA DE FIRMA DE PROTOCOLO (llaves cableadas exactas).
    assert!(serialized_json.contains("\"image_query_id\""));
    assert!(serialized_json.contains("\"blob_url\""));

    // 3. DESERIALIZACIÓN: Reconstrucción del objeto en RAM.
    let recovered: ImageQueryEnvelope = serde_json::from_str(&serialized_json)
        .expect("CRITICAL_FAULT: Deserialization failed. Schema drift detected.");
    assert_eq!(recovered.image_query_id, "iq-7f3a");

    let fallback_envelope = FallbackEnvelope {
        query_id: "q-1".to_string(),
        detector_id: "det-1".to_string(),
        blob_path: "images/queries/det-1/frame.jpg".to_string(),
        fallback_token: "det-1.123.abc".to_string(),
    };
    let fallback_json = serde_json::to_string(&fallback_envelope).expect("fallback serialization");
    assert!(fallback_json.contains("\"fallback_token\""));

    println!("   ✅ Envelope parity: OK.");
}

/**
 * CERTIFICACIÓN: Discriminadores de variantes cerradas.
 */
#[test]
fn certify_closed_variant_discriminators() {
    println!("\n🧪 [PROVING_GROUNDS]: Validating closed variant discriminators...");

    assert_eq!(serde_json::to_string(&QueryStatus::Escalated).unwrap(), "\"ESCALATED\"");
    assert_eq!(serde_json::to_string(&DetectionMode::BoundingBox).unwrap(), "\"BOUNDING_BOX\"");
    assert_eq!(
        serde_json::to_string(&AlertConditionType::ConfidenceBelow).unwrap(),
        "\"CONFIDENCE_BELOW\""
    );

    // Valores hostiles rechazados en la frontera.
    assert!(serde_json::from_str::<QueryStatus>("\"LIMBO\"").is_err());
    assert!(serde_json::from_str::<AlertConditionType>("\"CONFIDENCE_THRESHOLD\"").is_err());

    println!("   ✅ Closed variants: hostile values rejected at the boundary.");
}

/**
 * CERTIFICACIÓN: Rechazo de campos desconocidos en las directivas.
 */
#[test]
fn certify_unknown_directive_fields_rejected() {
    println!("\n🧪 [PROVING_GROUNDS]: Validating typed configuration boundary...");

    let hostile_payload = r#"{
        "detector_id": "det-1",
        "primary_model_blob_path": "models/det-1/primary/model.onnx",
        "phantom_reflection_knob": true
    }"#;

    let outcome = serde_json::from_str::<InferenceDirectives>(hostile_payload);
    assert!(outcome.is_err(), "CRITICAL: Unknown fields must be rejected at the boundary.");

    println!("   ✅ Typed boundary: reflection-era knobs rejected.");
}

/**
 * CERTIFICACIÓN: Sello por defecto de la atenuación OODD.
 */
#[test]
fn certify_detection_oodd_default() {
    let raw_detection = r#"{"label":"fire","confidence":0.9,"bbox":[1.0,2.0,3.0,4.0]}"#;
    let detection: Detection = serde_json::from_str(raw_detection).expect("detection decode");
    assert!(!detection.oodd_adjusted, "oodd_adjusted must default to false on the wire.");
}
