// [libs/infra/capture/src/mock.rs]
/*!
 * =================================================================
 * APARATO: SYNTHETIC FRAME GENERATOR (V4.1 - PROVING GROUNDS)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: EMISIÓN DE FRAMES SINTÉTICOS PARA FUENTES 'mock://'
 *
 * # Logic:
 * Genera lienzos de color sólido rotando una paleta fija, codificados
 * como JPEG reales, a la cadencia solicitada. Permite certificar la
 * tubería de inferencia completa sin una fuente de video viva.
 * =================================================================
 */

use crate::pipeline::CapturedFrame;
use image::{Rgb, RgbImage};
use std::io::Cursor;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

/// Paleta rotativa de los lienzos sintéticos.
const SYNTHETIC_PALETTE: [[u8; 3]; 6] = [
    [255, 100, 100], [100, 255, 100], [100, 100, 255],
    [255, 255, 100], [255, 100, 255], [100, 255, 255],
];

/// Geometría de los frames sintéticos.
const SYNTHETIC_WIDTH: u32 = 640;
const SYNTHETIC_HEIGHT: u32 = 480;

/**
 * Bucle generador de frames sintéticos a cadencia fija.
 */
pub async fn ignite_mock_generator(
    frames_per_second: f64,
    frame_sender: mpsc::Sender<CapturedFrame>,
    mut stop_observer: watch::Receiver<bool>,
) {
    let frame_interval = Duration::from_secs_f64(1.0 / frames_per_second.max(0.01));
    let mut frame_number: u64 = 0;

    info!("🎨 [MOCK_GRABBER]: Synthetic generator started at {:.2} fps", frames_per_second);

    loop {
        tokio::select! {
            _ = tokio::time::sleep(frame_interval) => {}
            _ = stop_observer.changed() => {
                if *stop_observer.borrow() { break; }
            }
        }

        if *stop_observer.borrow() {
            break;
        }

        frame_number += 1;
        let palette_entry = SYNTHETIC_PALETTE[(frame_number as usize) % SYNTHETIC_PALETTE.len()];
        let canvas = RgbImage::from_pixel(SYNTHETIC_WIDTH, SYNTHETIC_HEIGHT, Rgb(palette_entry));

        let mut jpeg_bytes = Vec::new();
        if let Err(encode_fault) =
            canvas.write_to(&mut Cursor::new(&mut jpeg_bytes), image::ImageFormat::Jpeg)
        {
            warn!("⚠️ [MOCK_GRABBER]: Frame encoding failed: {}", encode_fault);
            continue;
        }

        if frame_sender
            .send(CapturedFrame { jpeg_bytes, frame_number })
            .await
            .is_err()
        {
            break;
        }
    }

    info!("🏁 [MOCK_GRABBER]: Synthetic generator sealed.");
}
