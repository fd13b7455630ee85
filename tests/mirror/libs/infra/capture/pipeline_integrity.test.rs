// [tests/mirror/libs/infra/capture/pipeline_integrity.test.rs]
/**
 * =================================================================
 * APARATO: CAPTURE PIPELINE CERTIFIER (V4.2 - SOI/EOI PROOF)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L3-CAPTURE)
 * RESPONSABILIDAD: CERTIFICACIÓN DEL ESCANEO JPEG Y EL GRABBER SINTÉTICO
 * =================================================================
 */

use intellioptics_infra_capture::pipeline::{
    extract_complete_jpeg, ignite_frame_pipeline, CaptureDirectives,
};

/**
 * CERTIFICACIÓN: extracción secuencial de múltiples frames del buffer.
 */
#[test]
fn certify_sequential_jpeg_extraction() {
    println!("\n🧪 [PROVING_GROUNDS]: Validating SOI/EOI scanning...");

    // Dos frames completos con ruido intermedio y cola truncada.
    let mut pipe_buffer: Vec<u8> = Vec::new();
    pipe_buffer.extend_from_slice(&[0x00, 0x01]);
    pipe_buffer.extend_from_slice(&[0xFF, 0xD8, 0x11, 0x22, 0xFF, 0xD9]);
    pipe_buffer.extend_from_slice(&[0x7F]);
    pipe_buffer.extend_from_slice(&[0xFF, 0xD8, 0x33, 0x44, 0x55, 0xFF, 0xD9]);
    pipe_buffer.extend_from_slice(&[0xFF, 0xD8, 0x66]); // Frame truncado.

    let (first_frame, first_consumed) =
        extract_complete_jpeg(&pipe_buffer).expect("first frame resolves");
    assert_eq!(first_frame, vec![0xFF, 0xD8, 0x11, 0x22, 0xFF, 0xD9]);
    pipe_buffer.drain(..first_consumed);

    let (second_frame, second_consumed) =
        extract_complete_jpeg(&pipe_buffer).expect("second frame resolves");
    assert_eq!(second_frame, vec![0xFF, 0xD8, 0x33, 0x44, 0x55, 0xFF, 0xD9]);
    pipe_buffer.drain(..second_consumed);

    // La cola truncada jamás emite un frame.
    assert!(extract_complete_jpeg(&pipe_buffer).is_none());

    println!("   ✅ Scanner: two frames recovered, truncated tail retained.");
}

/**
 * CERTIFICACIÓN: el grabber sintético emite JPEG decodificables a
 * cadencia y la parada cooperativa sella la tubería.
 */
#[tokio::test]
async fn certify_mock_grabber_cadence_and_stop() {
    println!("\n🧪 [PROVING_GROUNDS]: Validating synthetic grabber...");

    let mut frame_stream = ignite_frame_pipeline(CaptureDirectives {
        source_url: "mock://proving-grounds".to_string(),
        frames_per_second: 20.0,
    });

    // 1. COSECHA DE FRAMES SINTÉTICOS
    let mut harvested_frames = Vec::new();
    for _ in 0..3 {
        let frame = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            frame_stream.next_frame(),
        )
        .await
        .expect("grabber must emit within the window")
        .expect("stream must be alive");
        harvested_frames.push(frame);
    }

    // 2. NUMERACIÓN MONÓTONA Y PAYLOAD JPEG REAL
    assert!(harvested_frames.windows(2).all(|pair| pair[0].frame_number < pair[1].frame_number));
    for frame in &harvested_frames {
        assert!(frame.jpeg_bytes.starts_with(&[0xFF, 0xD8]), "Frame must open with SOI.");
        assert!(
            image::load_from_memory(&frame.jpeg_bytes).is_ok(),
            "Synthetic frame must decode as a real JPEG."
        );
    }

    // 3. PARADA COOPERATIVA (≤ 5 s por contrato)
    frame_stream.stop().await;

    println!("   ✅ Grabber: {} frames, monotonic numbering, cooperative stop.", harvested_frames.len());
}
