// [libs/core/vision/src/ssim.rs]
/*!
 * =================================================================
 * APARATO: STRUCTURAL SIMILARITY ENGINE (V5.0 - WINDOWED)
 * CLASIFICACIÓN: CORE COMPUTATION (ESTRATO L1)
 * RESPONSABILIDAD: ÍNDICE SSIM ENTRE FRAME ACTUAL Y LÍNEA BASE
 *
 * # Mathematical Proof (SSIM Bounds):
 * SSIM(x, y) = ((2μxμy + C1)(2σxy + C2)) / ((μx² + μy² + C1)(σx² + σy² + C2))
 * con C1 = (0.01·255)², C2 = (0.03·255)². Para x == y el numerador y el
 * denominador coinciden, luego SSIM(x, x) == 1. El promedio por ventanas
 * 8×8 preserva la cota [-1, 1].
 * =================================================================
 */

use image::{imageops, GrayImage};

/// Lado de la ventana deslizante de comparación local.
const WINDOW_SIDE: u32 = 8;

/// Estabilizador del término de luminancia: (0.01 · 255)².
const C1: f64 = 6.5025;
/// Estabilizador del término de contraste: (0.03 · 255)².
const C2: f64 = 58.5225;

/**
 * Índice de similitud estructural medio entre dos frames en escala de grises.
 *
 * # Logic:
 * Si las dimensiones difieren, el frame candidato se re-escala a la
 * geometría de la referencia antes de comparar. El resultado es el
 * promedio del SSIM local sobre ventanas 8×8 no solapadas.
 */
pub fn structural_similarity(reference: &GrayImage, candidate: &GrayImage) -> f32 {
    let (width, height) = reference.dimensions();
    if width == 0 || height == 0 {
        return 0.0;
    }

    let aligned_candidate;
    let candidate_view: &GrayImage = if candidate.dimensions() == (width, height) {
        candidate
    } else {
        aligned_candidate = imageops::resize(
            candidate,
            width,
            height,
            imageops::FilterType::Triangle,
        );
        &aligned_candidate
    };

    let mut window_scores = Vec::new();

    let mut window_y = 0;
    while window_y + WINDOW_SIDE <= height {
        let mut window_x = 0;
        while window_x + WINDOW_SIDE <= width {
            window_scores.push(window_ssim(
                reference,
                candidate_view,
                window_x,
                window_y,
            ));
            window_x += WINDOW_SIDE;
        }
        window_y += WINDOW_SIDE;
    }

    if window_scores.is_empty() {
        // Frame menor que una ventana: comparación global degenerada.
        return window_ssim(reference, candidate_view, 0, 0) as f32;
    }

    (window_scores.iter().sum::<f64>() / window_scores.len() as f64) as f32
}

/// SSIM local sobre una ventana anclada en (origin_x, origin_y).
fn window_ssim(reference: &GrayImage, candidate: &GrayImage, origin_x: u32, origin_y: u32) -> f64 {
    let (width, height) = reference.dimensions();
    let span_x = WINDOW_SIDE.min(width - origin_x);
    let span_y = WINDOW_SIDE.min(height - origin_y);
    let sample_count = (span_x * span_y) as f64;
    if sample_count == 0.0 {
        return 0.0;
    }

    let mut sum_ref = 0.0;
    let mut sum_cand = 0.0;
    for dy in 0..span_y {
        for dx in 0..span_x {
            sum_ref += reference.get_pixel(origin_x + dx, origin_y + dy)[0] as f64;
            sum_cand += candidate.get_pixel(origin_x + dx, origin_y + dy)[0] as f64;
        }
    }

    let mean_ref = sum_ref / sample_count;
    let mean_cand = sum_cand / sample_count;

    let mut var_ref = 0.0;
    let mut var_cand = 0.0;
    let mut covariance = 0.0;
    for dy in 0..span_y {
        for dx in 0..span_x {
            let delta_ref = reference.get_pixel(origin_x + dx, origin_y + dy)[0] as f64 - mean_ref;
            let delta_cand = candidate.get_pixel(origin_x + dx, origin_y + dy)[0] as f64 - mean_cand;
            var_ref += delta_ref * delta_ref;
            var_cand += delta_cand * delta_cand;
            covariance += delta_ref * delta_cand;
        }
    }
    var_ref /= sample_count;
    var_cand /= sample_count;
    covariance /= sample_count;

    ((2.0 * mean_ref * mean_cand + C1) * (2.0 * covariance + C2))
        / ((mean_ref * mean_ref + mean_cand * mean_cand + C1) * (var_ref + var_cand + C2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn gradient_frame(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| Luma([((x + y) % 256) as u8]))
    }

    #[test]
    fn certify_identity_similarity() {
        let frame = gradient_frame(64, 48);
        let score = structural_similarity(&frame, &frame);
        assert!((score - 1.0).abs() < 1e-4, "SSIM(x, x) must be 1, got {}", score);
    }

    #[test]
    fn certify_divergent_frames_score_low() {
        let bright = GrayImage::from_pixel(64, 48, Luma([230]));
        let dark = GrayImage::from_pixel(64, 48, Luma([15]));
        let score = structural_similarity(&bright, &dark);
        assert!(score < 0.3, "Opposite frames must diverge, got {}", score);
    }

    #[test]
    fn certify_dimension_mismatch_realignment() {
        let reference = gradient_frame(64, 48);
        let larger = gradient_frame(128, 96);
        let score = structural_similarity(&reference, &larger);
        assert!(score.is_finite());
        assert!(score > 0.5, "Rescaled twin must remain similar, got {}", score);
    }
}
