// [libs/core/vision/src/quality.rs]
/*!
 * =================================================================
 * APARATO: FRAME HEALTH SENTINEL (V5.5 - TAMPER AWARE)
 * CLASIFICACIÓN: CORE COMPUTATION (ESTRATO L1)
 * RESPONSABILIDAD: MÉTRICAS DE CALIDAD Y SABOTAJE POR FRAME CON PUNTUACIÓN
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. REFERENCE DISCIPLINE: El primer frame evaluado se convierte en la
 *    referencia de sabotaje (y no reporta sabotaje); 'reset_reference'
 *    permite re-anclar o limpiar la línea base.
 * 2. SCORE LEDGER: Puntuación 100 con deducciones por hallazgo (blur 20,
 *    brillo/contraste/exposición 10–15, obstrucción 50, movimiento 30,
 *    foco 20, cambio significativo 15), recortada a [0, 100].
 * 3. STATUS TRIAGE: critical si hay obstrucción O score < 50; warning en
 *    [50, 80); healthy en [80, 100].
 *
 * # Mathematical Proof (Obstruction Ratio):
 * obstruction_ratio = |{p : p < 30}| / |frame|. Con una lente cubierta al
 * 50% por material opaco, el ratio converge a ~0.5 > umbral 0.3,
 * forzando el triaje 'critical' con independencia del resto de métricas.
 * =================================================================
 */

use crate::features::{detect_and_describe, match_descriptors, mean_match_distance, FeatureDescriptor};
use image::{imageops, GrayImage, RgbImage};
use serde::Serialize;
use tracing::debug;

/// Presupuesto de rasgos binarios por frame de referencia.
const SENTINEL_FEATURE_BUDGET: usize = 500;

/// Estado de salud triado de un frame.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Puntuación ≥ 80 sin obstrucción.
    Healthy,
    /// Puntuación en [50, 80).
    Warning,
    /// Obstrucción detectada o puntuación < 50.
    Critical,
}

/// Hallazgos de calidad de imagen.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QualityIssue {
    /// Varianza del Laplaciano bajo el umbral de nitidez.
    Blur,
    /// Brillo medio bajo el piso configurado.
    LowBrightness,
    /// Brillo medio sobre el techo configurado.
    HighBrightness,
    /// Desviación estándar bajo el umbral de contraste.
    LowContrast,
    /// Más del 10% de píxeles saturados por encima del corte.
    Overexposure,
    /// Más del 30% de píxeles bajo el corte de subexposición.
    Underexposure,
}

/// Hallazgos de sabotaje contra la referencia.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TamperingIssue {
    /// Fracción de píxeles oscuros sobre el umbral de obstrucción.
    Obstruction,
    /// Distancia media de rasgos sobre el umbral o coincidencias < 4.
    CameraMoved,
    /// Cambio relativo de nitidez sobre el umbral de foco.
    FocusChanged,
    /// Diferencia media de frame sobre el umbral de cambio.
    SignificantChange,
}

/// Métricas de calidad crudas del frame.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct QualityMetrics {
    /// Varianza del Laplaciano (mayor = más nítido).
    pub blur_score: f32,
    /// Valor medio de píxel en [0, 255].
    pub brightness: f32,
    /// Desviación estándar de píxeles.
    pub contrast: f32,
    /// Nitidez normalizada contra el umbral, recortada a [0, 1].
    pub sharpness: f32,
}

/// Métricas de sabotaje contra la referencia.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TamperingMetrics {
    /// Fracción del frame bajo el corte de oscuridad.
    pub obstruction_ratio: f32,
    /// Distancia Hamming media de los rasgos emparejados.
    pub movement_score: f32,
    /// Cambio relativo de nitidez contra la referencia.
    pub focus_change_score: f32,
    /// Diferencia media absoluta normalizada contra la referencia.
    pub frame_diff_score: f32,
}

/// Umbrales del centinela (defaults del monitor de referencia).
#[derive(Debug, Clone, Copy)]
pub struct SentinelThresholds {
    /// Varianza de Laplaciano mínima para nitidez aceptable.
    pub blur_threshold: f32,
    /// Piso de brillo medio.
    pub brightness_low: f32,
    /// Techo de brillo medio.
    pub brightness_high: f32,
    /// Piso de contraste (desviación estándar).
    pub contrast_low: f32,
    /// Corte de saturación por píxel.
    pub overexposure_cutoff: u8,
    /// Corte de subexposición por píxel.
    pub underexposure_cutoff: u8,
    /// Corte de oscuridad para el ratio de obstrucción.
    pub obstruction_pixel_cutoff: u8,
    /// Umbral del ratio de obstrucción.
    pub obstruction_threshold: f32,
    /// Umbral de la distancia media de rasgos (movimiento).
    pub movement_threshold: f32,
    /// Umbral del cambio relativo de foco.
    pub focus_change_threshold: f32,
    /// Umbral de la diferencia media de frame.
    pub frame_diff_threshold: f32,
}

impl Default for SentinelThresholds {
    fn default() -> Self {
        Self {
            blur_threshold: 100.0,
            brightness_low: 40.0,
            brightness_high: 220.0,
            contrast_low: 30.0,
            overexposure_cutoff: 250,
            underexposure_cutoff: 20,
            obstruction_pixel_cutoff: 30,
            obstruction_threshold: 0.3,
            movement_threshold: 50.0,
            focus_change_threshold: 0.3,
            frame_diff_threshold: 0.4,
        }
    }
}

/// Veredicto completo de salud de un frame.
#[derive(Debug, Clone, Serialize)]
pub struct FrameHealthVerdict {
    /// Estado triado.
    pub status: HealthStatus,
    /// Puntuación de salud [0, 100].
    pub overall_score: f32,
    /// Métricas de calidad crudas.
    pub quality: QualityMetrics,
    /// Métricas de sabotaje; None sin referencia establecida.
    pub tampering: Option<TamperingMetrics>,
    /// Hallazgos de calidad.
    pub quality_issues: Vec<QualityIssue>,
    /// Hallazgos de sabotaje.
    pub tampering_issues: Vec<TamperingIssue>,
}

/// Línea base interna de sabotaje.
struct ReferenceAnchor {
    gray_frame: GrayImage,
    blur_score: f32,
    descriptors: Vec<FeatureDescriptor>,
}

/// Centinela de salud por frame para un stream de cámara.
pub struct FrameHealthSentinel {
    thresholds: SentinelThresholds,
    reference: Option<ReferenceAnchor>,
}

impl FrameHealthSentinel {
    /// Forja un centinela con los umbrales suministrados.
    pub fn new(thresholds: SentinelThresholds) -> Self {
        Self { thresholds, reference: None }
    }

    /// true si existe una referencia de sabotaje anclada.
    pub fn has_reference(&self) -> bool {
        self.reference.is_some()
    }

    /**
     * Re-ancla (o limpia con None) la referencia de sabotaje.
     */
    pub fn reset_reference(&mut self, frame: Option<&RgbImage>) {
        self.reference = frame.map(|rgb| Self::forge_anchor(&imageops::grayscale(rgb)));
    }

    fn forge_anchor(gray_frame: &GrayImage) -> ReferenceAnchor {
        ReferenceAnchor {
            blur_score: laplacian_variance(gray_frame),
            descriptors: detect_and_describe(gray_frame, SENTINEL_FEATURE_BUDGET),
            gray_frame: gray_frame.clone(),
        }
    }

    /**
     * Evalúa la salud de un frame.
     *
     * # Logic:
     * Sin referencia previa, el frame se ancla como línea base y el
     * veredicto omite las métricas de sabotaje. Con referencia, se
     * computan obstrucción, movimiento, foco y diferencia de frame.
     */
    pub fn assess(&mut self, frame: &RgbImage, check_tampering: bool) -> FrameHealthVerdict {
        let gray_frame = imageops::grayscale(frame);

        let quality = self.measure_quality(&gray_frame);
        let quality_issues = self.triage_quality(&gray_frame, &quality);

        let mut tampering = None;
        let mut tampering_issues = Vec::new();

        if check_tampering {
            if let Some(anchor) = self.reference.as_ref() {
                let metrics = self.measure_tampering(&gray_frame, anchor);
                tampering_issues = self.triage_tampering(&metrics);
                tampering = Some(metrics);
            } else {
                // Primer frame observado: se convierte en la referencia.
                self.reference = Some(Self::forge_anchor(&gray_frame));
            }
        }

        let (status, overall_score) = self.score(&quality_issues, &tampering_issues);

        debug!(
            "🩺 [FRAME_SENTINEL]: status={:?} score={:.1} blur={:.1} brightness={:.1}",
            status, overall_score, quality.blur_score, quality.brightness
        );

        FrameHealthVerdict {
            status,
            overall_score,
            quality,
            tampering,
            quality_issues,
            tampering_issues,
        }
    }

    fn measure_quality(&self, gray_frame: &GrayImage) -> QualityMetrics {
        let blur_score = laplacian_variance(gray_frame);
        let (brightness, contrast) = mean_and_stddev(gray_frame);

        QualityMetrics {
            blur_score,
            brightness,
            contrast,
            sharpness: (blur_score / self.thresholds.blur_threshold).min(1.0),
        }
    }

    fn triage_quality(&self, gray_frame: &GrayImage, metrics: &QualityMetrics) -> Vec<QualityIssue> {
        let mut issues = Vec::new();
        let t = &self.thresholds;

        if metrics.blur_score < t.blur_threshold {
            issues.push(QualityIssue::Blur);
        }
        if metrics.brightness < t.brightness_low {
            issues.push(QualityIssue::LowBrightness);
        }
        if metrics.brightness > t.brightness_high {
            issues.push(QualityIssue::HighBrightness);
        }
        if metrics.contrast < t.contrast_low {
            issues.push(QualityIssue::LowContrast);
        }
        if pixel_fraction_above(gray_frame, t.overexposure_cutoff) > 0.1 {
            issues.push(QualityIssue::Overexposure);
        }
        if pixel_fraction_below(gray_frame, t.underexposure_cutoff) > 0.3 {
            issues.push(QualityIssue::Underexposure);
        }

        issues
    }

    fn measure_tampering(&self, gray_frame: &GrayImage, anchor: &ReferenceAnchor) -> TamperingMetrics {
        let t = &self.thresholds;

        let obstruction_ratio = pixel_fraction_below(gray_frame, t.obstruction_pixel_cutoff);

        let movement_score = {
            let current_descriptors = detect_and_describe(gray_frame, SENTINEL_FEATURE_BUDGET);
            if anchor.descriptors.is_empty() || current_descriptors.is_empty() {
                0.0
            } else {
                let matches = match_descriptors(&anchor.descriptors, &current_descriptors);
                if matches.len() < 4 {
                    // Coincidencias insuficientes: cambio estructural severo.
                    100.0
                } else {
                    mean_match_distance(&matches)
                }
            }
        };

        let current_blur = laplacian_variance(gray_frame);
        let focus_change_score = if anchor.blur_score > 0.0 {
            (current_blur - anchor.blur_score).abs() / anchor.blur_score
        } else {
            0.0
        };

        let frame_diff_score = mean_absolute_difference(gray_frame, &anchor.gray_frame) / 255.0;

        TamperingMetrics {
            obstruction_ratio,
            movement_score,
            focus_change_score,
            frame_diff_score,
        }
    }

    fn triage_tampering(&self, metrics: &TamperingMetrics) -> Vec<TamperingIssue> {
        let mut issues = Vec::new();
        let t = &self.thresholds;

        if metrics.obstruction_ratio > t.obstruction_threshold {
            issues.push(TamperingIssue::Obstruction);
        }
        if metrics.movement_score > t.movement_threshold {
            issues.push(TamperingIssue::CameraMoved);
        }
        if metrics.focus_change_score > t.focus_change_threshold {
            issues.push(TamperingIssue::FocusChanged);
        }
        if metrics.frame_diff_score > t.frame_diff_threshold {
            issues.push(TamperingIssue::SignificantChange);
        }

        issues
    }

    fn score(
        &self,
        quality_issues: &[QualityIssue],
        tampering_issues: &[TamperingIssue],
    ) -> (HealthStatus, f32) {
        let mut score = 100.0_f32;

        for issue in quality_issues {
            score -= match issue {
                QualityIssue::Blur => 20.0,
                QualityIssue::LowBrightness | QualityIssue::HighBrightness => 15.0,
                QualityIssue::LowContrast => 10.0,
                QualityIssue::Overexposure | QualityIssue::Underexposure => 10.0,
            };
        }

        for issue in tampering_issues {
            score -= match issue {
                TamperingIssue::Obstruction => 50.0,
                TamperingIssue::CameraMoved => 30.0,
                TamperingIssue::FocusChanged => 20.0,
                TamperingIssue::SignificantChange => 15.0,
            };
        }

        let score = score.clamp(0.0, 100.0);

        let status = if tampering_issues.contains(&TamperingIssue::Obstruction) || score < 50.0 {
            HealthStatus::Critical
        } else if score < 80.0 {
            HealthStatus::Warning
        } else {
            HealthStatus::Healthy
        };

        (status, score)
    }
}

/// Varianza de la respuesta del Laplaciano 3×3 (cruz [0,1,0;1,-4,1;0,1,0]).
pub fn laplacian_variance(gray_frame: &GrayImage) -> f32 {
    let (width, height) = gray_frame.dimensions();
    if width < 3 || height < 3 {
        return 0.0;
    }

    let sample = |x: u32, y: u32| gray_frame.get_pixel(x, y)[0] as f64;

    let mut responses = Vec::with_capacity(((width - 2) * (height - 2)) as usize);
    for y in 1..(height - 1) {
        for x in 1..(width - 1) {
            let response = sample(x, y - 1) + sample(x - 1, y) + sample(x + 1, y)
                + sample(x, y + 1)
                - 4.0 * sample(x, y);
            responses.push(response);
        }
    }

    let count = responses.len() as f64;
    let mean = responses.iter().sum::<f64>() / count;
    let variance = responses.iter().map(|r| (r - mean) * (r - mean)).sum::<f64>() / count;

    variance as f32
}

/// Media y desviación estándar de los píxeles del frame.
fn mean_and_stddev(gray_frame: &GrayImage) -> (f32, f32) {
    let pixels = gray_frame.as_raw();
    if pixels.is_empty() {
        return (0.0, 0.0);
    }

    let count = pixels.len() as f64;
    let mean = pixels.iter().map(|p| *p as f64).sum::<f64>() / count;
    let variance = pixels
        .iter()
        .map(|p| {
            let delta = *p as f64 - mean;
            delta * delta
        })
        .sum::<f64>()
        / count;

    (mean as f32, variance.sqrt() as f32)
}

/// Fracción de píxeles estrictamente por encima del corte.
fn pixel_fraction_above(gray_frame: &GrayImage, cutoff: u8) -> f32 {
    let pixels = gray_frame.as_raw();
    if pixels.is_empty() {
        return 0.0;
    }
    pixels.iter().filter(|p| **p > cutoff).count() as f32 / pixels.len() as f32
}

/// Fracción de píxeles estrictamente por debajo del corte.
fn pixel_fraction_below(gray_frame: &GrayImage, cutoff: u8) -> f32 {
    let pixels = gray_frame.as_raw();
    if pixels.is_empty() {
        return 0.0;
    }
    pixels.iter().filter(|p| **p < cutoff).count() as f32 / pixels.len() as f32
}

/// Diferencia media absoluta entre dos frames (re-alinea dimensiones).
/// Expuesta para la compuerta de movimiento de las sesiones de captura.
pub fn mean_absolute_difference(current: &GrayImage, reference: &GrayImage) -> f32 {
    let (width, height) = reference.dimensions();
    let aligned;
    let current_view: &GrayImage = if current.dimensions() == (width, height) {
        current
    } else {
        aligned = imageops::resize(current, width, height, imageops::FilterType::Triangle);
        &aligned
    };

    let total: u64 = current_view
        .as_raw()
        .iter()
        .zip(reference.as_raw().iter())
        .map(|(a, b)| (*a as i32 - *b as i32).unsigned_abs() as u64)
        .sum();

    total as f32 / (width * height).max(1) as f32
}
