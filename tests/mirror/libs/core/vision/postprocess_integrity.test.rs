// [tests/mirror/libs/core/vision/postprocess_integrity.test.rs]
/**
 * =================================================================
 * APARATO: DETECTION HEAD CERTIFIER (V5.2 - TRI-LAYOUT PROOF)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L1-VISION)
 * RESPONSABILIDAD: CERTIFICACIÓN DE LAYOUTS, NMS Y FILTROS DE CLASE
 * =================================================================
 */

use intellioptics_core_vision::letterbox::LetterboxGeometry;
use intellioptics_core_vision::postprocess::{
    decode_detection_head, non_max_suppression, DetectionHeadDirectives,
};
use intellioptics_core_vision::VisionError;
use intellioptics_domain_models::inference::Detection;

fn identity_geometry() -> LetterboxGeometry {
    LetterboxGeometry {
        ratio: 1.0,
        pad_left: 0.0,
        pad_top: 0.0,
        original_width: 640,
        original_height: 640,
    }
}

/**
 * CERTIFICACIÓN: Layout YOLO (1, N, 4+C) con clases personalizadas.
 */
#[test]
fn certify_yolo_row_major_layout() {
    println!("\n🧪 [PROVING_GROUNDS]: Validating (1, N, 4+C) head decoding...");

    let class_names = vec!["fire".to_string(), "smoke".to_string()];
    // Dos filas de (cx, cy, w, h, score_fire, score_smoke).
    let data = [
        100.0_f32, 100.0, 40.0, 40.0, 0.9, 0.1,
        300.0, 300.0, 60.0, 60.0, 0.05, 0.08,
    ];

    let directives = DetectionHeadDirectives {
        conf_threshold: 0.25,
        iou_threshold: 0.45,
        max_detections: 100,
        class_names: &class_names,
    };

    let detections = decode_detection_head(&[1, 2, 6], &data, &identity_geometry(), &directives)
        .expect("layout must resolve");

    assert_eq!(detections.len(), 1, "Low-confidence row must be filtered.");
    assert_eq!(detections[0].label, "fire");
    // xywh → xyxy: centro (100,100) con lado 40 → [80, 80, 120, 120].
    assert!((detections[0].bbox[0] - 80.0).abs() < 1e-3);
    assert!((detections[0].bbox[3] - 120.0).abs() < 1e-3);

    println!("   ✅ Row-major head: verdict and geometry certified.");
}

/**
 * CERTIFICACIÓN: Layout transpuesto (1, 4+C, N) produce el mismo veredicto.
 */
#[test]
fn certify_channel_major_transposition() {
    let class_names = vec!["fire".to_string(), "smoke".to_string()];
    // Una fila en layout canal-primero: columnas = cajas.
    // Atributos: cx=100, cy=100, w=40, h=40, fire=0.9, smoke=0.1.
    let data = [100.0_f32, 100.0, 40.0, 40.0, 0.9, 0.1];

    let directives = DetectionHeadDirectives {
        conf_threshold: 0.25,
        iou_threshold: 0.45,
        max_detections: 100,
        class_names: &class_names,
    };

    let detections = decode_detection_head(&[1, 6, 1], &data, &identity_geometry(), &directives)
        .expect("transposed layout must resolve");

    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].label, "fire");
    assert!((detections[0].confidence - 0.9).abs() < 1e-6);
}

/**
 * CERTIFICACIÓN: Forma hostil → EBadModelOutput.
 */
#[test]
fn certify_hostile_layout_rejected() {
    let directives = DetectionHeadDirectives {
        conf_threshold: 0.25,
        iou_threshold: 0.45,
        max_detections: 100,
        class_names: &[],
    };

    let fault = decode_detection_head(&[2, 5, 7], &[0.0; 70], &identity_geometry(), &directives);
    assert!(matches!(fault, Err(VisionError::UnsupportedOutputLayout(_))));
}

/**
 * CERTIFICACIÓN: NMS(NMS(X)) == NMS(X) y tope de detecciones.
 */
#[test]
fn certify_nms_idempotence_and_cap() {
    println!("\n🧪 [PROVING_GROUNDS]: Validating NMS idempotence...");

    let forge = |label: &str, confidence: f32, origin: f32| Detection {
        label: label.to_string(),
        confidence,
        bbox: [origin, origin, origin + 50.0, origin + 50.0],
        oodd_adjusted: false,
    };

    let crowded = vec![
        forge("person", 0.95, 10.0),
        forge("person", 0.90, 12.0),  // Solapa con la campeona → suprimida.
        forge("person", 0.70, 200.0),
        forge("car", 0.80, 11.0),     // Clase distinta: sobrevive el solape.
    ];

    let first_pass = non_max_suppression(crowded, 0.45);
    let second_pass = non_max_suppression(first_pass.clone(), 0.45);

    assert_eq!(first_pass, second_pass, "NMS must be idempotent over its own output.");
    assert_eq!(first_pass.len(), 3);
    assert!(first_pass.iter().any(|d| d.label == "car"));

    println!("   ✅ NMS: idempotence and per-class suppression certified.");
}
