// [apps/inference-worker/src/engine.rs]
/*!
 * =================================================================
 * APARATO: ADAPTIVE INFERENCE ENGINE (V5.4 - DUAL STAGE GOLD)
 * CLASIFICACIÓN: WORKER EXECUTION LAYER (ESTRATO L1-WORKER)
 * RESPONSABILIDAD: ORQUESTACIÓN PRIMARY + OODD Y ENSAMBLAJE DEL REPORTE
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. TWO-STAGE PIPELINE: El veredicto OODD se computa antes de la pasada
 *    primaria; fuera de dominio, cada detección persiste su confianza
 *    atenuada con sello 'oodd_adjusted'.
 * 2. GRACEFUL OODD DEGRADATION: Un fallo de carga del clasificador de
 *    dominio degrada a pasada primaria pura (valor 'None', sin control
 *    de flujo por excepciones).
 * 3. SERIALIZED SESSIONS: Cada forward adquiere el candado de la sesión
 *    dentro del pool bloqueante bajo la ventana de 60 segundos.
 *
 * # Mathematical Proof (Latency Ledger):
 * latency_ms abarca [decodificación → post-proceso] inclusive. Las
 * adquisiciones de sesión quedan fuera del ledger: la caché single-flight
 * amortiza su coste a O(1) por ventana de residencia.
 * =================================================================
 */

use crate::errors::DispatchError;
use intellioptics_core_vision::prelude::*;
use intellioptics_core_vision::{
    apply_oodd_attenuation, apply_per_class_thresholds, filter_by_class_names,
    oodd_input_tensor, oodd_verdict_from_logits, CALIBRATED_THRESHOLD_DEFAULT,
};
use intellioptics_domain_models::detector::DetectionMode;
use intellioptics_domain_models::inference::{
    Detection, InferenceDirectives, InferenceReport, ModelInfo, OoddVerdict,
};
use intellioptics_infra_model_cache::{ModelArsenal, ModelRole, SharedOnnxSession};
use ndarray::Array4;
use ort::value::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

/// Ventana máxima de una ejecución de sesión (contrato 60 s).
const SESSION_FORWARD_TIMEOUT_SECONDS: u64 = 60;

/// Modo de gating del modelo por defecto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoMode {
    /// Emisión completa de clases.
    Onnx,
    /// Compuerta binaria sobre una única clase.
    Binary,
}

impl IoMode {
    /// Parse permisivo desde la variable de entorno IO_MODE.
    pub fn from_env_text(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("binary") { IoMode::Binary } else { IoMode::Onnx }
    }

    /// Forma nominal cableada al reporte.
    pub fn as_wire_mode(&self) -> DetectionMode {
        match self {
            IoMode::Onnx => DetectionMode::BoundingBox,
            IoMode::Binary => DetectionMode::Binary,
        }
    }
}

/// Directivas de afinación del motor (IO_* del entorno).
#[derive(Debug, Clone)]
pub struct EngineDirectives {
    /// Lado del lienzo por defecto (IO_IMG_SIZE).
    pub default_input_side: u32,
    /// Umbral de confianza del camino por defecto (IO_CONF_THRESH).
    pub default_conf_threshold: f32,
    /// Umbral IoU del camino por defecto (IO_NMS_IOU).
    pub default_nms_iou: f32,
    /// Modo de gating del modelo por defecto (IO_MODE).
    pub io_mode: IoMode,
    /// Clase de compuerta del modo binario (IO_BINARY_CLASS).
    pub binary_gate_class: String,
}

impl Default for EngineDirectives {
    fn default() -> Self {
        Self {
            default_input_side: 640,
            default_conf_threshold: 0.50,
            default_nms_iou: 0.45,
            io_mode: IoMode::Onnx,
            binary_gate_class: "person".to_string(),
        }
    }
}

/// Motor soberano de inferencia del worker.
pub struct InferenceEngine {
    model_arsenal: Arc<ModelArsenal>,
    directives: EngineDirectives,
    /// Sesión del modelo por defecto (camino octet-stream y open-vocabulary).
    default_session: RwLock<Option<(SharedOnnxSession, String)>>,
}

impl InferenceEngine {
    /// Forja el motor sobre el arsenal compartido.
    pub fn new(model_arsenal: Arc<ModelArsenal>, directives: EngineDirectives) -> Self {
        Self {
            model_arsenal,
            directives,
            default_session: RwLock::new(None),
        }
    }

    /**
     * Carga el modelo por defecto del proceso desde la bóveda.
     */
    #[instrument(skip(self))]
    pub async fn ignite_default_model(&self, model_blob_path: &str) -> Result<(), DispatchError> {
        let session = self
            .model_arsenal
            .acquire_session("default", ModelRole::Primary, model_blob_path)
            .await?;

        *self.default_session.write().await = Some((session, model_blob_path.to_string()));
        info!("🧠 [ENGINE]: Default model ignited from [{}].", model_blob_path);
        Ok(())
    }

    /// true si existe una sesión por defecto cargada.
    pub async fn has_default_model(&self) -> bool {
        self.default_session.read().await.is_some()
    }

    /**
     * Pasada completa detector-aware (Primary + OODD).
     *
     * # Errors:
     * - `MissingPrimaryModel`: Directivas sin ruta de modelo primario.
     * - `VisionFault`: Imagen indecodificable o layout de salida hostil.
     * - `InferenceTimeout`: Sesión fuera de la ventana de 60 segundos.
     */
    #[instrument(skip(self, image_bytes, directives), fields(detector = %directives.detector_id))]
    pub async fn run_detector_inference(
        &self,
        directives: &InferenceDirectives,
        image_bytes: &[u8],
    ) -> Result<InferenceReport, DispatchError> {
        // 1. VALIDACIÓN DEL ENSAMBLAJE
        let primary_blob_path = directives
            .primary_model_blob_path
            .as_deref()
            .filter(|path| !path.is_empty())
            .ok_or_else(|| DispatchError::MissingPrimaryModel(directives.detector_id.clone()))?;

        // 2. ADQUISICIÓN DE SESIONES (single-flight; OODD degradable)
        let primary_session = self
            .model_arsenal
            .acquire_session(&directives.detector_id, ModelRole::Primary, primary_blob_path)
            .await?;

        let oodd_session = match directives.oodd_model_blob_path.as_deref().filter(|p| !p.is_empty()) {
            None => None,
            Some(oodd_blob_path) => {
                match self
                    .model_arsenal
                    .acquire_session(&directives.detector_id, ModelRole::Oodd, oodd_blob_path)
                    .await
                {
                    Ok(session) => Some(session),
                    Err(oodd_load_fault) => {
                        // Degradación elegante: pasada primaria pura.
                        warn!(
                            "⚠️ [ENGINE]: OODD load failed ({}); continuing without domain gate.",
                            oodd_load_fault
                        );
                        None
                    }
                }
            }
        };

        // 3. DECODIFICACIÓN (apertura del ledger de latencia)
        let latency_ledger_start = Instant::now();
        let rgb_image = decode_rgb_image(image_bytes)?;

        // 4. VEREDICTO DE DOMINIO (si el clasificador cargó)
        let oodd_verdict = match oodd_session {
            None => None,
            Some(session) => Some(self.compute_oodd_verdict(session, &rgb_image).await?),
        };

        // 5. PREPROCESO LETTERBOX
        let input_side = directives.model_input_config.input_width;
        let (input_tensor, geometry) = letterbox_to_tensor(&rgb_image, input_side);

        // 6. FORWARD PRIMARIO
        let (output_shape, output_data) = run_session_forward(primary_session, input_tensor).await?;

        // 7. POST-PROCESO (decodificación, NMS, filtros)
        let head_directives = DetectionHeadDirectives {
            conf_threshold: directives.detection_params.min_score_threshold,
            iou_threshold: directives.detection_params.iou_threshold,
            max_detections: directives.detection_params.max_detections,
            class_names: &directives.class_names,
        };

        let mut detections =
            decode_detection_head(&output_shape, &output_data, &geometry, &head_directives)?;

        // 8. ATENUACIÓN OODD + FILTROS DE CLASE
        if let Some(verdict) = &oodd_verdict {
            apply_oodd_attenuation(&mut detections, verdict);
        }

        let detections = filter_by_class_names(detections, &directives.class_names);
        let detections = apply_per_class_thresholds(
            detections,
            &directives.per_class_thresholds,
            directives.confidence_threshold,
        );

        let latency_ms = latency_ledger_start.elapsed().as_millis() as u64;

        info!(
            "🎯 [ENGINE]: Detector {} -> {} detection(s) in {} ms.",
            directives.detector_id, detections.len(), latency_ms
        );

        Ok(InferenceReport {
            detections,
            latency_ms,
            oodd_result: oodd_verdict,
            model_info: ModelInfo {
                primary_model: primary_blob_path.to_string(),
                oodd_model: directives.oodd_model_blob_path.clone(),
                mode: directives.mode,
                input_size: input_side,
            },
        })
    }

    /**
     * Pasada sobre el modelo por defecto del proceso (octet-stream).
     *
     * # Errors:
     * - `DefaultModelUnavailable`: Sin modelo por defecto cargado (503).
     */
    #[instrument(skip(self, image_bytes))]
    pub async fn run_default_inference(
        &self,
        image_bytes: &[u8],
    ) -> Result<InferenceReport, DispatchError> {
        let (session, model_path) = self
            .default_session
            .read()
            .await
            .clone()
            .ok_or(DispatchError::DefaultModelUnavailable)?;

        let latency_ledger_start = Instant::now();
        let rgb_image = decode_rgb_image(image_bytes)?;

        let (input_tensor, geometry) =
            letterbox_to_tensor(&rgb_image, self.directives.default_input_side);
        let (output_shape, output_data) = run_session_forward(session, input_tensor).await?;

        let empty_class_table: Vec<String> = Vec::new();
        let head_directives = DetectionHeadDirectives {
            conf_threshold: self.directives.default_conf_threshold,
            iou_threshold: self.directives.default_nms_iou,
            max_detections: 100,
            class_names: &empty_class_table,
        };

        let mut detections =
            decode_detection_head(&output_shape, &output_data, &geometry, &head_directives)?;

        // Compuerta binaria opcional del camino por defecto (IO_MODE=binary).
        if self.directives.io_mode == IoMode::Binary {
            let gate_class = self.directives.binary_gate_class.to_lowercase();
            detections.retain(|detection| detection.label.to_lowercase() == gate_class);
        }

        let latency_ms = latency_ledger_start.elapsed().as_millis() as u64;

        Ok(InferenceReport {
            detections,
            latency_ms,
            oodd_result: None,
            model_info: ModelInfo {
                primary_model: model_path,
                oodd_model: None,
                mode: self.directives.io_mode.as_wire_mode(),
                input_size: self.directives.default_input_side,
            },
        })
    }

    /**
     * Pasada de vocabulario abierto: las consignas actúan como tabla de
     * clases y el filtro de pertenencia se omite.
     */
    #[instrument(skip(self, image_bytes), fields(prompts = prompts.len()))]
    pub async fn run_open_vocabulary_inference(
        &self,
        image_bytes: &[u8],
        prompts: &[String],
    ) -> Result<InferenceReport, DispatchError> {
        let (session, model_path) = self
            .default_session
            .read()
            .await
            .clone()
            .ok_or(DispatchError::DefaultModelUnavailable)?;

        let latency_ledger_start = Instant::now();
        let rgb_image = decode_rgb_image(image_bytes)?;

        let (input_tensor, geometry) =
            letterbox_to_tensor(&rgb_image, self.directives.default_input_side);
        let (output_shape, output_data) = run_session_forward(session, input_tensor).await?;

        let head_directives = DetectionHeadDirectives {
            conf_threshold: self.directives.default_conf_threshold,
            iou_threshold: self.directives.default_nms_iou,
            max_detections: 100,
            class_names: prompts,
        };

        // Llamador de vocabulario abierto: sin filtro de pertenencia.
        let detections =
            decode_detection_head(&output_shape, &output_data, &geometry, &head_directives)?;

        let latency_ms = latency_ledger_start.elapsed().as_millis() as u64;

        Ok(InferenceReport {
            detections,
            latency_ms,
            oodd_result: None,
            model_info: ModelInfo {
                primary_model: model_path,
                oodd_model: None,
                mode: DetectionMode::Multiclass,
                input_size: self.directives.default_input_side,
            },
        })
    }

    /// Veredicto del clasificador de dominio sobre la imagen completa.
    async fn compute_oodd_verdict(
        &self,
        oodd_session: SharedOnnxSession,
        rgb_image: &image::RgbImage,
    ) -> Result<OoddVerdict, DispatchError> {
        let oodd_tensor = oodd_input_tensor(rgb_image);
        let (_, oodd_logits) = run_session_forward(oodd_session, oodd_tensor).await?;

        let verdict = oodd_verdict_from_logits(&oodd_logits, CALIBRATED_THRESHOLD_DEFAULT)?;

        info!(
            "🧭 [ENGINE]: OODD verdict -> in_domain={} score={:.3}",
            verdict.is_in_domain, verdict.in_domain_score
        );
        Ok(verdict)
    }

    /// Compuerta binaria expuesta para el triaje del consumidor.
    pub fn binary_gate(&self, detections: &mut Vec<Detection>) {
        if self.directives.io_mode == IoMode::Binary {
            let gate_class = self.directives.binary_gate_class.to_lowercase();
            detections.retain(|detection| detection.label.to_lowercase() == gate_class);
        }
    }
}

/**
 * Ejecuta un forward serializado en el pool bloqueante bajo la ventana
 * de 60 segundos.
 *
 * # Returns:
 * (forma del tensor de salida, datos planos f32).
 */
async fn run_session_forward(
    session: SharedOnnxSession,
    input_tensor: Array4<f32>,
) -> Result<(Vec<usize>, Vec<f32>), DispatchError> {
    let forward_outcome = tokio::time::timeout(
        Duration::from_secs(SESSION_FORWARD_TIMEOUT_SECONDS),
        tokio::task::spawn_blocking(move || -> Result<(Vec<usize>, Vec<f32>), DispatchError> {
            let mut session_guard = session
                .lock()
                .map_err(|poison_fault| DispatchError::RuntimeFault(poison_fault.to_string()))?;

            let output_name = session_guard.outputs()[0].name().to_string();

            let input_value = Value::from_array(input_tensor)
                .map_err(|value_fault| DispatchError::RuntimeFault(value_fault.to_string()))?;

            let session_outputs = session_guard
                .run(ort::inputs![input_value])
                .map_err(|run_fault| DispatchError::RuntimeFault(run_fault.to_string()))?;

            let (output_shape, output_data) = session_outputs[output_name.as_str()]
                .try_extract_tensor::<f32>()
                .map_err(|extract_fault| DispatchError::RuntimeFault(extract_fault.to_string()))?;

            Ok((
                output_shape.iter().map(|dimension| *dimension as usize).collect(),
                output_data.to_vec(),
            ))
        }),
    )
    .await
    .map_err(|_| DispatchError::InferenceTimeout)?
    .map_err(|join_fault| DispatchError::RuntimeFault(join_fault.to_string()))??;

    Ok(forward_outcome)
}
