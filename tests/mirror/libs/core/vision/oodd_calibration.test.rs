// [tests/mirror/libs/core/vision/oodd_calibration.test.rs]
/**
 * =================================================================
 * APARATO: OODD CALIBRATION CERTIFIER (V5.1 - DOMAIN GATE PROOF)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L1-VISION)
 * RESPONSABILIDAD: CERTIFICACIÓN DEL VEREDICTO DE DOMINIO Y SU ATENUACIÓN
 * =================================================================
 */

use image::{Rgb, RgbImage};
use intellioptics_core_vision::oodd::{
    oodd_input_tensor, oodd_verdict_from_logits, CALIBRATED_THRESHOLD_DEFAULT, OODD_INPUT_SIDE,
};
use intellioptics_core_vision::postprocess::apply_oodd_attenuation;
use intellioptics_domain_models::inference::Detection;

/**
 * CERTIFICACIÓN: Tensor de entrada 224×224 NCHW normalizado ImageNet.
 */
#[test]
fn certify_input_tensor_contract() {
    println!("\n🧪 [PROVING_GROUNDS]: Validating OODD input contract...");

    let source = RgbImage::from_pixel(1280, 720, Rgb([124, 116, 104]));
    let tensor = oodd_input_tensor(&source);

    assert_eq!(tensor.shape(), &[1, 3, OODD_INPUT_SIDE as usize, OODD_INPUT_SIDE as usize]);

    // Canal R: (124/255 - 0.485) / 0.229 ≈ 0.0056 (imagen casi-media ImageNet).
    let red_probe = tensor[[0, 0, 100, 100]];
    assert!(red_probe.abs() < 0.05, "ImageNet-mean image must normalize near zero, got {}", red_probe);

    println!("   ✅ Input tensor: 224×224 NCHW, ImageNet normalized.");
}

/**
 * CERTIFICACIÓN: score == umbral calibrado se trata como dentro de dominio.
 */
#[test]
fn certify_threshold_boundary_equality() {
    // Forzamos score exactamente en el umbral vía umbral=0.5 y logits simétricos.
    let verdict = oodd_verdict_from_logits(&[2.0, 2.0], 0.5).expect("symmetric logits resolve");
    assert!((verdict.in_domain_score - 0.5).abs() < 1e-6);
    assert!(verdict.is_in_domain, "Equality with the calibrated threshold is in-domain.");
}

/**
 * CERTIFICACIÓN: Escenario de degradación OODD del contrato extremo a extremo.
 *
 * primary conf 0.8, score OODD 0.2 → confianza final 0.8 · (0.2 · 0.5) = 0.08.
 */
#[test]
fn certify_end_to_end_attenuation_scenario() {
    println!("\n🧪 [PROVING_GROUNDS]: Validating OODD downgrade scenario...");

    // Logits cuya softmax produce score ≈ 0.2 para el índice dentro-de-dominio.
    // softmax([ln(4), 0])[1] = 1 / (4 + 1) = 0.2.
    let out_logit = 4.0_f32.ln();
    let verdict = oodd_verdict_from_logits(&[out_logit, 0.0], CALIBRATED_THRESHOLD_DEFAULT)
        .expect("logits resolve");

    assert!((verdict.in_domain_score - 0.2).abs() < 1e-4);
    assert!(!verdict.is_in_domain);
    assert!((verdict.confidence_adjustment - 0.1).abs() < 1e-4);

    let mut detections = vec![Detection {
        label: "fire".to_string(),
        confidence: 0.8,
        bbox: [10.0, 10.0, 100.0, 100.0],
        oodd_adjusted: false,
    }];

    apply_oodd_attenuation(&mut detections, &verdict);

    assert!((detections[0].confidence - 0.08).abs() < 1e-4,
        "Final confidence must be 0.8 * 0.2 * 0.5 = 0.08, got {}", detections[0].confidence);
    assert!(detections[0].oodd_adjusted);

    println!("   ✅ Downgrade: 0.8 → 0.08 with oodd_adjusted seal.");
}

/**
 * CERTIFICACIÓN: Camino sigmoide de un solo logit.
 */
#[test]
fn certify_single_logit_sigmoid() {
    let confident_in_domain = oodd_verdict_from_logits(&[6.0], CALIBRATED_THRESHOLD_DEFAULT)
        .expect("single logit resolves");
    assert!(confident_in_domain.in_domain_score > 0.99);
    assert!(confident_in_domain.is_in_domain);
}
