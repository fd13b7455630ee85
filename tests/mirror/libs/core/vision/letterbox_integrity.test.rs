// [tests/mirror/libs/core/vision/letterbox_integrity.test.rs]
/**
 * =================================================================
 * APARATO: LETTERBOX GEOMETRY CERTIFIER (V5.1 - BIJECTIVE PROOF)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L1-VISION)
 * RESPONSABILIDAD: CERTIFICACIÓN DE LA BIYECCIÓN LETTERBOX ↔ ORIGINAL
 *
 * # Mathematical Proof (Round Trip Tolerance):
 * Para ratio > 0.1, la composición reverse ∘ forward reconstruye toda
 * caja dentro de la tolerancia de un píxel.
 * =================================================================
 */

use image::{Rgb, RgbImage};
use intellioptics_core_vision::letterbox::{letterbox_to_tensor, LetterboxGeometry};
use proptest::prelude::*;

/// Transformación directa de una caja al espacio del lienzo.
fn forward_box(geometry: &LetterboxGeometry, original_box: [f32; 4]) -> [f32; 4] {
    [
        original_box[0] * geometry.ratio + geometry.pad_left,
        original_box[1] * geometry.ratio + geometry.pad_top,
        original_box[2] * geometry.ratio + geometry.pad_left,
        original_box[3] * geometry.ratio + geometry.pad_top,
    ]
}

/**
 * CERTIFICACIÓN: Geometría canónica 1280×720 → 640.
 */
#[test]
fn certify_canonical_geometry() {
    println!("\n🧪 [PROVING_GROUNDS]: Validating canonical letterbox geometry...");

    let source = RgbImage::from_pixel(1280, 720, Rgb([50, 60, 70]));
    let (tensor, geometry) = letterbox_to_tensor(&source, 640);

    assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
    assert!((geometry.ratio - 0.5).abs() < f32::EPSILON);
    assert_eq!(geometry.pad_left, 0.0);
    assert_eq!(geometry.pad_top, 140.0);

    println!("   ✅ Canonical geometry: ratio 0.5, pad (0, 140).");
}

/**
 * CERTIFICACIÓN: Ida y vuelta de una caja concreta dentro de 1 píxel.
 */
#[test]
fn certify_box_roundtrip_within_one_pixel() {
    let source = RgbImage::from_pixel(1280, 720, Rgb([0, 0, 0]));
    let (_, geometry) = letterbox_to_tensor(&source, 640);

    let original_box = [100.0_f32, 200.0, 400.0, 600.0];
    let canvas_box = forward_box(&geometry, original_box);
    let recovered_box = geometry.reverse_box(canvas_box);

    for axis in 0..4 {
        assert!(
            (recovered_box[axis] - original_box[axis]).abs() <= 1.0,
            "ROUND_TRIP_DRIFT: axis {} drifted {} px",
            axis,
            (recovered_box[axis] - original_box[axis]).abs()
        );
    }
}

proptest! {
    /**
     * CERTIFICACIÓN PROPIEDAD: Toda caja interior sobrevive la ida y
     * vuelta dentro de un píxel para ratios > 0.1.
     */
    #[test]
    fn certify_roundtrip_property(
        width in 64u32..1920,
        height in 64u32..1080,
        x1_fraction in 0.0f32..0.8,
        y1_fraction in 0.0f32..0.8,
        span_fraction in 0.05f32..0.2,
    ) {
        let source = RgbImage::from_pixel(width, height, Rgb([0, 0, 0]));
        let (_, geometry) = letterbox_to_tensor(&source, 640);

        prop_assume!(geometry.ratio > 0.1);

        let x1 = x1_fraction * width as f32;
        let y1 = y1_fraction * height as f32;
        let x2 = (x1 + span_fraction * width as f32).min(width as f32);
        let y2 = (y1 + span_fraction * height as f32).min(height as f32);

        let original_box = [x1, y1, x2, y2];
        let recovered_box = geometry.reverse_box(forward_box(&geometry, original_box));

        for axis in 0..4 {
            prop_assert!(
                (recovered_box[axis] - original_box[axis]).abs() <= 1.0,
                "ROUND_TRIP_DRIFT on axis {}", axis
            );
        }
    }
}
