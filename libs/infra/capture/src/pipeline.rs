// [libs/infra/capture/src/pipeline.rs]
/*!
 * =================================================================
 * APARATO: MJPEG FRAME PIPELINE (V4.4 - FFMPEG MANAGED)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: DECODIFICACIÓN PIPELINED DE FRAMES JPEG A CADENCIA FIJA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. FFMPEG CUSTODY: El decodificador corre como subproceso con
 *    'kill_on_drop'; la parada cooperativa lo ejecuta dentro de la
 *    ventana de 5 segundos del contrato de ingesta.
 * 2. SOI/EOI SCANNING: Los frames se extraen del pipe escaneando los
 *    marcadores JPEG (FFD8...FFD9); el buffer residual se recorta para
 *    impedir el crecimiento sin cota.
 * 3. NATURAL BACKPRESSURE: El canal acotado y el descarte por cadencia
 *    garantizan que la tubería jamás acumule frames.
 *
 * # Mathematical Proof (Bounded Memory):
 * |buffer| ≤ 10 MB por recorte explícito y |canal| ≤ 8 frames. El
 * consumo de memoria de la tubería es O(1) respecto a la duración.
 * =================================================================
 */

use crate::errors::CaptureError;
use crate::mock::ignite_mock_generator;
use crate::resolver::resolve_playable_url;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

/// Capacidad del canal de frames (backpressure natural).
const FRAME_CHANNEL_CAPACITY: usize = 8;

/// Tamaño de ráfaga de lectura del pipe de ffmpeg.
const PIPE_READ_CHUNK_BYTES: usize = 65_536;

/// Cota superior del buffer residual antes del recorte.
const BUFFER_TRIM_THRESHOLD_BYTES: usize = 10_000_000;

/// Cola retenida tras un recorte de buffer.
const BUFFER_RETAIN_TAIL_BYTES: usize = 1_000_000;

/// User-Agent de navegador para fuentes web restrictivas.
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Directivas de ignición de la tubería de captura.
#[derive(Debug, Clone)]
pub struct CaptureDirectives {
    /// Fuente de captura (rtsp://, https://, mock://).
    pub source_url: String,
    /// Cadencia objetivo de emisión de frames.
    pub frames_per_second: f64,
}

/// Frame JPEG capturado con su número de secuencia.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// Bytes JPEG completos (SOI..EOI).
    pub jpeg_bytes: Vec<u8>,
    /// Número de frame dentro de la sesión de captura.
    pub frame_number: u64,
}

/// Flujo de frames vivo con parada cooperativa.
pub struct FrameStream {
    frame_receiver: mpsc::Receiver<CapturedFrame>,
    stop_signal: watch::Sender<bool>,
    pipeline_task: JoinHandle<()>,
}

impl FrameStream {
    /// Próximo frame del flujo; None cuando la tubería terminó.
    pub async fn next_frame(&mut self) -> Option<CapturedFrame> {
        self.frame_receiver.recv().await
    }

    /**
     * Parada cooperativa: señal de stop, drenaje y espera del task.
     * Los subprocesos hijos mueren con el task (kill_on_drop).
     */
    pub async fn stop(self) {
        let _ = self.stop_signal.send(true);
        drop(self.frame_receiver);

        if tokio::time::timeout(Duration::from_secs(5), self.pipeline_task).await.is_err() {
            warn!("⏱️ [PIPELINE]: Capture task exceeded the 5s stop window; detaching.");
        }
    }
}

/**
 * Enciende la tubería de captura para una fuente.
 *
 * # Logic:
 * - 'mock://': generador sintético de frames (pruebas e integración).
 * - Resto: resolución de URL reproducible + decodificador ffmpeg
 *   image2pipe/mjpeg con reintentos de reconexión acotados.
 */
#[instrument(skip(directives), fields(source = %directives.source_url))]
pub fn ignite_frame_pipeline(directives: CaptureDirectives) -> FrameStream {
    let (frame_sender, frame_receiver) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
    let (stop_signal, stop_observer) = watch::channel(false);

    let pipeline_task = if directives.source_url.starts_with("mock://") {
        tokio::spawn(ignite_mock_generator(
            directives.frames_per_second,
            frame_sender,
            stop_observer,
        ))
    } else {
        tokio::spawn(run_ffmpeg_capture_loop(directives, frame_sender, stop_observer))
    };

    FrameStream { frame_receiver, stop_signal, pipeline_task }
}

/// Bucle perpetuo de captura con reconexión acotada.
async fn run_ffmpeg_capture_loop(
    directives: CaptureDirectives,
    frame_sender: mpsc::Sender<CapturedFrame>,
    mut stop_observer: watch::Receiver<bool>,
) {
    let mut retry_count: u32 = 0;
    let mut frame_number: u64 = 0;

    while !*stop_observer.borrow() {
        // 1. RESOLUCIÓN DE URL REPRODUCIBLE (extractor externo)
        let playable_url = match resolve_playable_url(&directives.source_url).await {
            Ok(url) => url,
            Err(resolution_fault) => {
                retry_count += 1;
                let backoff_seconds = (5 * retry_count).min(30) as u64;
                warn!(
                    "⚠️ [PIPELINE]: Resolution failed ({}); retrying in {}s...",
                    resolution_fault, backoff_seconds
                );
                if wait_or_stop(&mut stop_observer, backoff_seconds).await {
                    break;
                }
                continue;
            }
        };

        // 2. IGNICIÓN DEL DECODIFICADOR (ffmpeg → image2pipe mjpeg)
        info!("🎬 [PIPELINE]: Starting ffmpeg at {:.2} fps", directives.frames_per_second);
        let mut decoder_child = match Command::new("ffmpeg")
            .arg("-headers")
            .arg(format!("User-Agent: {}\r\n", BROWSER_USER_AGENT))
            .arg("-i")
            .arg(&playable_url)
            .arg("-vf")
            .arg(format!("fps={}", directives.frames_per_second))
            .arg("-f")
            .arg("image2pipe")
            .arg("-vcodec")
            .arg("mjpeg")
            .arg("-q:v")
            .arg("5")
            .arg("-")
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(spawn_fault) => {
                error!("❌ [PIPELINE]: ffmpeg ignition failed: {}", spawn_fault);
                retry_count += 1;
                if wait_or_stop(&mut stop_observer, 5).await {
                    break;
                }
                continue;
            }
        };

        let Some(mut decoder_stdout) = decoder_child.stdout.take() else {
            error!("❌ [PIPELINE]: ffmpeg stdout pipe unavailable.");
            break;
        };

        // 3. BUCLE DE EXTRACCIÓN DE FRAMES (escaneo SOI/EOI)
        let frame_interval = Duration::from_secs_f64(1.0 / directives.frames_per_second.max(0.01));
        let mut residual_buffer: Vec<u8> = Vec::new();
        let mut read_chunk = vec![0_u8; PIPE_READ_CHUNK_BYTES];
        let mut last_emission = Instant::now() - frame_interval;
        let mut emitted_this_connection = false;

        'decode: loop {
            let chunk_length = tokio::select! {
                read_outcome = decoder_stdout.read(&mut read_chunk) => match read_outcome {
                    Ok(0) => {
                        warn!("⚠️ [PIPELINE]: ffmpeg stream ended.");
                        break 'decode;
                    }
                    Ok(length) => length,
                    Err(read_fault) => {
                        warn!("⚠️ [PIPELINE]: Pipe read failed: {}", read_fault);
                        break 'decode;
                    }
                },
                _ = stop_observer.changed() => {
                    if *stop_observer.borrow() { break 'decode; }
                    continue 'decode;
                }
            };

            residual_buffer.extend_from_slice(&read_chunk[..chunk_length]);

            while let Some((jpeg_frame, consumed_until)) = extract_complete_jpeg(&residual_buffer) {
                residual_buffer.drain(..consumed_until);

                // Descarte por cadencia: sin buffering de frames atrasados.
                if last_emission.elapsed() < frame_interval {
                    continue;
                }

                last_emission = Instant::now();
                frame_number += 1;
                emitted_this_connection = true;

                if frame_sender
                    .send(CapturedFrame { jpeg_bytes: jpeg_frame, frame_number })
                    .await
                    .is_err()
                {
                    // Receptor liberado: fin de la sesión de captura.
                    let _ = decoder_child.kill().await;
                    return;
                }
            }

            if residual_buffer.len() > BUFFER_TRIM_THRESHOLD_BYTES {
                let trim_point = residual_buffer.len() - BUFFER_RETAIN_TAIL_BYTES;
                residual_buffer.drain(..trim_point);
            }
        }

        let _ = decoder_child.kill().await;

        if *stop_observer.borrow() {
            break;
        }

        retry_count = if emitted_this_connection { 0 } else { retry_count + 1 };
        let backoff_seconds = (3 * (retry_count + 1)).min(30) as u64;
        info!("🔁 [PIPELINE]: Stream ended; restarting in {}s...", backoff_seconds);
        if wait_or_stop(&mut stop_observer, backoff_seconds).await {
            break;
        }
    }

    info!("🏁 [PIPELINE]: Capture loop sealed.");
}

/// Espera acotada interrumpible por la señal de stop; true si hay stop.
async fn wait_or_stop(stop_observer: &mut watch::Receiver<bool>, seconds: u64) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(seconds)) => *stop_observer.borrow(),
        _ = stop_observer.changed() => *stop_observer.borrow(),
    }
}

/**
 * Extrae el primer JPEG completo del buffer (marcadores SOI..EOI).
 *
 * # Returns:
 * (frame, posición tras el EOI) o None si no hay frame completo.
 */
pub fn extract_complete_jpeg(buffer: &[u8]) -> Option<(Vec<u8>, usize)> {
    let soi_position = buffer.windows(2).position(|pair| pair == [0xFF, 0xD8])?;
    let eoi_relative = buffer[soi_position + 2..]
        .windows(2)
        .position(|pair| pair == [0xFF, 0xD9])?;
    let eoi_end = soi_position + 2 + eoi_relative + 2;

    Some((buffer[soi_position..eoi_end].to_vec(), eoi_end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn certify_jpeg_extraction_from_noisy_buffer() {
        let mut noisy_buffer = vec![0x00, 0x11, 0x22];
        noisy_buffer.extend_from_slice(&[0xFF, 0xD8, 0xAA, 0xBB, 0xCC, 0xFF, 0xD9]);
        noisy_buffer.extend_from_slice(&[0x33, 0x44]);

        let (frame, consumed) = extract_complete_jpeg(&noisy_buffer)
            .expect("A complete frame must be extracted.");

        assert_eq!(frame, vec![0xFF, 0xD8, 0xAA, 0xBB, 0xCC, 0xFF, 0xD9]);
        assert_eq!(consumed, 10);
    }

    #[test]
    fn certify_incomplete_jpeg_yields_nothing() {
        let truncated = [0xFF, 0xD8, 0xAA, 0xBB];
        assert!(extract_complete_jpeg(&truncated).is_none());
    }

    #[test]
    fn certify_missing_soi_yields_nothing() {
        let headless = [0xAA, 0xBB, 0xFF, 0xD9];
        assert!(extract_complete_jpeg(&headless).is_none());
    }
}
