// [libs/core/vision/src/oodd.rs]
/*!
 * =================================================================
 * APARATO: OODD CALIBRATION ENGINE (V5.1 - IMAGENET NORMALIZED)
 * CLASIFICACIÓN: CORE COMPUTATION (ESTRATO L1)
 * RESPONSABILIDAD: PREPROCESO Y CALIBRACIÓN DEL CLASIFICADOR DE DOMINIO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. RESNET CONTRACT: Entrada 224×224 normalizada con media/desviación
 *    de ImageNet en layout NCHW, idéntica al clasificador de referencia.
 * 2. STABLE SOFTMAX: Dos logits → softmax numéricamente estable (resta
 *    del máximo); un logit → sigmoide. Clamp final a [0, 1].
 * 3. BOUNDARY EQUALITY: score == umbral calibrado se trata como dentro
 *    de dominio.
 *
 * # Mathematical Proof (Attenuation Monotonicity):
 * multiplier(score) = score si score ≥ τ, si no score·0.5. La función es
 * monótona no-decreciente en score, garantizando que una imagen más
 * dentro-de-dominio nunca reciba mayor atenuación que una menos afín.
 * =================================================================
 */

use crate::errors::VisionError;
use image::{imageops, RgbImage};
use intellioptics_domain_models::inference::OoddVerdict;
use ndarray::Array4;

/// Umbral calibrado por defecto del clasificador de dominio.
pub const CALIBRATED_THRESHOLD_DEFAULT: f32 = 0.444;

/// Lado del lienzo de entrada del clasificador (estándar ImageNet).
pub const OODD_INPUT_SIDE: u32 = 224;

/// Factor de atenuación adicional aplicado fuera de dominio.
const OUT_OF_DOMAIN_PENALTY: f32 = 0.5;

/// Media por canal de ImageNet (RGB).
const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// Desviación estándar por canal de ImageNet (RGB).
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/**
 * Tensoriza una imagen RGB para el clasificador de dominio.
 *
 * # Logic:
 * Redimensionado bilineal a 224×224 (sin letterbox: el clasificador
 * tolera distorsión de aspecto), normalización ImageNet y layout NCHW.
 */
pub fn oodd_input_tensor(rgb_image: &RgbImage) -> Array4<f32> {
    let resized = imageops::resize(
        rgb_image,
        OODD_INPUT_SIDE,
        OODD_INPUT_SIDE,
        imageops::FilterType::Triangle,
    );

    let side = OODD_INPUT_SIDE as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, side, side));

    for (x, y, pixel) in resized.enumerate_pixels() {
        let (col, row) = (x as usize, y as usize);
        for channel in 0..3 {
            let normalized = (pixel[channel] as f32 / 255.0 - IMAGENET_MEAN[channel])
                / IMAGENET_STD[channel];
            tensor[[0, channel, row, col]] = normalized;
        }
    }

    tensor
}

/**
 * Deriva el veredicto de dominio desde los logits crudos del clasificador.
 *
 * # Errors:
 * - `EmptyOoddOutput`: Si el clasificador no emitió logits.
 *
 * # Logic:
 * - Dos logits [fuera, dentro]: softmax estable, índice 1.
 * - Un logit: sigmoide.
 * - score == umbral se considera dentro de dominio.
 */
pub fn oodd_verdict_from_logits(
    raw_logits: &[f32],
    calibrated_threshold: f32,
) -> Result<OoddVerdict, VisionError> {
    let in_domain_score = match raw_logits {
        [] => return Err(VisionError::EmptyOoddOutput),
        [single_logit] => sigmoid(*single_logit),
        [out_logit, in_logit, ..] => stable_softmax_pair(*out_logit, *in_logit),
    }
    .clamp(0.0, 1.0);

    let is_in_domain = in_domain_score >= calibrated_threshold;
    let confidence_adjustment = if is_in_domain {
        in_domain_score
    } else {
        in_domain_score * OUT_OF_DOMAIN_PENALTY
    };

    Ok(OoddVerdict {
        in_domain_score,
        is_in_domain,
        confidence_adjustment,
        calibrated_threshold,
    })
}

/// Sigmoide escalar: 1 / (1 + e^{-x}).
fn sigmoid(logit: f32) -> f32 {
    1.0 / (1.0 + (-logit).exp())
}

/// Softmax estable de dos elementos; retorna la masa del índice 1.
fn stable_softmax_pair(out_logit: f32, in_logit: f32) -> f32 {
    let peak = out_logit.max(in_logit);
    let exp_out = (out_logit - peak).exp();
    let exp_in = (in_logit - peak).exp();
    exp_in / (exp_out + exp_in)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn certify_boundary_equality_is_in_domain() {
        // Logits simétricos: softmax exacto 0.5 ≥ 0.444 → dentro de dominio.
        let verdict = oodd_verdict_from_logits(&[1.0, 1.0], CALIBRATED_THRESHOLD_DEFAULT)
            .expect("two logits must resolve");
        assert!((verdict.in_domain_score - 0.5).abs() < 1e-6);
        assert!(verdict.is_in_domain);
        assert!((verdict.confidence_adjustment - verdict.in_domain_score).abs() < 1e-6);
    }

    #[test]
    fn certify_out_of_domain_penalty() {
        // Logit fuera-de-dominio dominante.
        let verdict = oodd_verdict_from_logits(&[4.0, -4.0], CALIBRATED_THRESHOLD_DEFAULT)
            .expect("two logits must resolve");
        assert!(!verdict.is_in_domain);
        assert!(
            (verdict.confidence_adjustment - verdict.in_domain_score * 0.5).abs() < 1e-6,
            "Out-of-domain multiplier must be score * 0.5"
        );
    }

    #[test]
    fn certify_single_logit_sigmoid_path() {
        let verdict = oodd_verdict_from_logits(&[0.0], CALIBRATED_THRESHOLD_DEFAULT)
            .expect("single logit must resolve");
        assert!((verdict.in_domain_score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn certify_empty_logits_rejected() {
        assert!(matches!(
            oodd_verdict_from_logits(&[], CALIBRATED_THRESHOLD_DEFAULT),
            Err(VisionError::EmptyOoddOutput)
        ));
    }

    #[test]
    fn certify_softmax_numerical_stability() {
        // Logits extremos: la resta del máximo evita el desbordamiento.
        let verdict = oodd_verdict_from_logits(&[-1000.0, 1000.0], CALIBRATED_THRESHOLD_DEFAULT)
            .expect("extreme logits must resolve");
        assert!((verdict.in_domain_score - 1.0).abs() < 1e-6);
        assert!(verdict.in_domain_score.is_finite());
    }
}
