// [libs/infra/capture/src/lib.rs]
/*!
 * =================================================================
 * APARATO: FRAME CAPTURE ROOT (V4.1 - SUBPROCESS DISCIPLINE)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: EXPOSICIÓN DE LA TUBERÍA DE CAPTURA Y SU RESOLUCIÓN
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SUBPROCESS CUSTODY: Todo proceso hijo (streamlink, ffmpeg) porta
 *    'kill_on_drop'; la parada cooperativa garantiza su limpieza.
 * 2. NO BUFFERING: La tubería descarta frames por cadencia; jamás
 *    acumula frames en memoria más allá del canal acotado.
 * =================================================================
 */

pub mod errors;
pub mod mock;
pub mod pipeline;
pub mod resolver;

pub use errors::CaptureError;
pub use pipeline::{ignite_frame_pipeline, CaptureDirectives, CapturedFrame, FrameStream};
pub use resolver::{inject_rtsp_credentials, resolve_playable_url};
