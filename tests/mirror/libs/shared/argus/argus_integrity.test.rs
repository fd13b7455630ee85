// [tests/mirror/libs/shared/argus/argus_integrity.test.rs]
/**
 * =================================================================
 * APARATO: ARGUS INTEGRITY CERTIFIER (V3.1 - HYGIENE FIXED)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L4-SHARED
 * RESPONSABILIDAD: VALIDACIÓN DE TRAZADO E INTERCEPCIÓN DE PÁNICOS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. MACRO SYNC: Validación de instrumentación nominal nivel L1.
 * 2. PHOENIX SHIELD: Certificación del hook global de pánicos.
 * =================================================================
 */

use intellioptics_shared_argus::init_tracing;
use std::panic;
use tracing::{info, instrument};

/**
 * Operación micro-instrumentada para validar la inyección de Spans.
 */
#[instrument(name = "test_instrumentation_strata")]
fn simulate_instrumented_operation() {
    info!("📡 [SIGNAL]: Executing traced micro-operation.");
}

/**
 * CERTIFICACIÓN: Validación del sistema nervioso y el escudo de pánicos.
 */
#[tokio::test]
async fn certify_argus_macro_and_panic_strata() {
    println!("\n👁️  [PROVING_GROUNDS]: Initiating Argus Observability Audit...");

    // 1. FASE DE IGNICIÓN SOBERANA
    init_tracing("argus_integrity_test");

    // 2. FASE DE MACRO SYNC
    println!("   🧪 Phase 1: Verifying macro visibility (#[instrument])...");
    simulate_instrumented_operation();
    println!("      ✅ Macro Dispatch: OK.");

    // 3. FASE PHOENIX SHIELD (Intercepción de colapso)
    println!("   🧪 Phase 2: Auditing Phoenix Shield (Global Panic Hook)...");

    let panic_capture_result = panic::catch_unwind(|| {
        println!("      🔥 Simulating task collapse for forensic validation...");
        panic!("INTENTIONAL_STRATA_FAILURE_FOR_TESTING");
    });

    assert!(panic_capture_result.is_err(), "CRITICAL: The panic hook failed to isolate the collapse.");
    println!("      ✅ Phoenix Shield: Interception confirmed.");

    println!("🏁 [COMPLETE]: Argus observability strata certified.\n");
}
