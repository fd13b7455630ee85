// [tests/mirror/libs/core/vision/frame_health_integrity.test.rs]
/**
 * =================================================================
 * APARATO: FRAME HEALTH CERTIFIER (V5.2 - TAMPER PROOF)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L1-VISION)
 * RESPONSABILIDAD: CERTIFICACIÓN DE MÉTRICAS DE SALUD Y OBSTRUCCIÓN
 * =================================================================
 */

use image::{Rgb, RgbImage};
use intellioptics_core_vision::quality::{
    FrameHealthSentinel, HealthStatus, SentinelThresholds,
};

/// Frame brillante texturizado (referencia sana).
fn bright_textured_frame(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let texture = (((x / 8) + (y / 8)) % 2) as u8 * 60;
        Rgb([140 + texture, 140 + texture, 140 + texture])
    })
}

/// Frame con la mitad izquierda obstruida (píxeles casi negros).
fn half_obstructed_frame(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        if x < width / 2 {
            Rgb([5, 5, 5])
        } else {
            let texture = (((x / 8) + (y / 8)) % 2) as u8 * 60;
            Rgb([140 + texture, 140 + texture, 140 + texture])
        }
    })
}

/**
 * CERTIFICACIÓN: El primer frame ancla la referencia sin reportar sabotaje.
 */
#[test]
fn certify_first_frame_anchors_reference() {
    println!("\n🧪 [PROVING_GROUNDS]: Validating reference anchoring...");

    let mut sentinel = FrameHealthSentinel::new(SentinelThresholds::default());
    assert!(!sentinel.has_reference());

    let verdict = sentinel.assess(&bright_textured_frame(160, 120), true);

    assert!(sentinel.has_reference());
    assert!(verdict.tampering.is_none(), "First frame must not report tampering metrics.");
    assert!(verdict.tampering_issues.is_empty());

    println!("   ✅ Reference discipline: first frame anchored silently.");
}

/**
 * CERTIFICACIÓN: Escenario de obstrucción del contrato extremo a extremo.
 *
 * Referencia brillante + frame con 50% de píxeles < 30 → status critical
 * con obstruction_ratio ≈ 0.5.
 */
#[test]
fn certify_obstruction_scenario() {
    println!("\n🧪 [PROVING_GROUNDS]: Validating obstruction triage...");

    let mut sentinel = FrameHealthSentinel::new(SentinelThresholds::default());

    // 1. ANCLAJE: referencia brillante y texturizada.
    sentinel.reset_reference(Some(&bright_textured_frame(160, 120)));

    // 2. FRAME HOSTIL: mitad del sensor cubierta.
    let verdict = sentinel.assess(&half_obstructed_frame(160, 120), true);

    let tampering = verdict.tampering.expect("Tampering metrics must exist with a reference.");
    assert!(
        (tampering.obstruction_ratio - 0.5).abs() < 0.05,
        "Obstruction ratio must approximate 0.5, got {}",
        tampering.obstruction_ratio
    );
    assert_eq!(verdict.status, HealthStatus::Critical, "Obstruction forces critical triage.");

    println!("   ✅ Obstruction: ratio ≈ 0.5, status critical.");
}

/**
 * CERTIFICACIÓN: Frame oscuro plano acumula hallazgos de calidad.
 */
#[test]
fn certify_dark_flat_frame_quality_issues() {
    let mut sentinel = FrameHealthSentinel::new(SentinelThresholds::default());
    let dark_flat = RgbImage::from_pixel(160, 120, Rgb([8, 8, 8]));

    let verdict = sentinel.assess(&dark_flat, false);

    assert!(verdict.quality.brightness < 40.0);
    assert!(!verdict.quality_issues.is_empty(), "A dark flat frame must surface quality issues.");
    assert!(verdict.overall_score < 80.0);
}

/**
 * CERTIFICACIÓN: Un frame idéntico a la referencia permanece sano.
 */
#[test]
fn certify_identical_frame_stays_healthy() {
    let mut sentinel = FrameHealthSentinel::new(SentinelThresholds::default());
    let reference = bright_textured_frame(160, 120);

    sentinel.reset_reference(Some(&reference));
    let verdict = sentinel.assess(&reference, true);

    assert!(verdict.tampering_issues.is_empty(), "A twin frame must not report tampering.");
    assert_eq!(verdict.status, HealthStatus::Healthy);
}
