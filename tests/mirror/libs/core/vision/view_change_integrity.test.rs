// [tests/mirror/libs/core/vision/view_change_integrity.test.rs]
/**
 * =================================================================
 * APARATO: VIEW CHANGE CERTIFIER (V5.1 - SSIM + FEATURES)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L1-VISION)
 * RESPONSABILIDAD: CERTIFICACIÓN DE LA COMPUERTA DUAL DE CAMBIO DE VISTA
 * =================================================================
 */

use image::{GrayImage, Luma};
use intellioptics_core_vision::features::{detect_and_describe, match_descriptors};
use intellioptics_core_vision::ssim::structural_similarity;

/// Escena estructurada con retícula y banda diagonal.
fn structured_scene(width: u32, height: u32, phase: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let grid = if ((x / 16) + (y / 16)) % 2 == 0 { 200 } else { 40 };
        let diagonal = if (x + phase).abs_diff(y) < 6 { 255 } else { grid };
        Luma([diagonal])
    })
}

/**
 * CERTIFICACIÓN: Una escena estable supera ambas compuertas.
 */
#[test]
fn certify_stable_view_passes_both_gates() {
    println!("\n🧪 [PROVING_GROUNDS]: Validating stable view gates...");

    let baseline = structured_scene(320, 240, 0);
    let current = structured_scene(320, 240, 0);

    // 1. COMPUERTA SSIM
    let similarity = structural_similarity(&baseline, &current);
    assert!(similarity > 0.95, "Identical scene must score near 1, got {}", similarity);

    // 2. COMPUERTA DE RASGOS
    let baseline_features = detect_and_describe(&baseline, 500);
    let current_features = detect_and_describe(&current, 500);
    assert!(!baseline_features.is_empty());

    let matches = match_descriptors(&baseline_features, &current_features);
    let match_ratio =
        matches.len() as f32 / baseline_features.len().max(current_features.len()) as f32;
    assert!(match_ratio >= 0.3, "Stable view must keep match ratio ≥ 0.3, got {}", match_ratio);

    println!("   ✅ Stable view: SSIM {:.3}, match ratio {:.2}.", similarity, match_ratio);
}

/**
 * CERTIFICACIÓN: Una escena radicalmente distinta colapsa el SSIM.
 */
#[test]
fn certify_divergent_view_fails_ssim_gate() {
    println!("\n🧪 [PROVING_GROUNDS]: Validating divergent view triage...");

    let baseline = structured_scene(320, 240, 0);
    // Escena invertida y desfasada: vista físicamente distinta.
    let divergent = GrayImage::from_fn(320, 240, |x, y| {
        let original = structured_scene(320, 240, 120).get_pixel(x, y)[0];
        Luma([255 - original])
    });

    let similarity = structural_similarity(&baseline, &divergent);
    assert!(
        similarity < 0.7,
        "A physically changed view must fall under the 0.7 threshold, got {}",
        similarity
    );

    println!("   ✅ Divergent view: SSIM {:.3} < 0.7.", similarity);
}
