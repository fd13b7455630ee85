// [libs/core/vision/src/features.rs]
/*!
 * =================================================================
 * APARATO: BINARY FEATURE ENGINE (V5.3 - FAST/BRIEF GOLD)
 * CLASIFICACIÓN: CORE COMPUTATION (ESTRATO L1)
 * RESPONSABILIDAD: ESQUINAS FAST, DESCRIPTORES BRIEF Y MATCHING HAMMING
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. ORB-CLASS PIPELINE: Detección FAST-9 + descripción binaria BRIEF-256
 *    sobre imagen suavizada, emparejada por fuerza bruta Hamming con
 *    verificación cruzada, replicando la tubería de sabotaje del legado.
 * 2. DETERMINISTIC PATTERN: El patrón de muestreo BRIEF se genera una
 *    única vez desde una semilla fija; dos procesos cualesquiera computan
 *    descriptores bit-idénticos para el mismo frame.
 * 3. BOUNDED BUDGET: Tope de rasgos por frame (default 500) ordenados por
 *    contraste de arco descendente.
 *
 * # Mathematical Proof (Cross-Check Symmetry):
 * Un par (a, b) sobrevive solo si b = argmin_d H(a, ·) y a = argmin_d H(·, b).
 * La relación resultante es una biyección parcial, eliminando los falsos
 * emparejamientos unidireccionales de baja distancia.
 * =================================================================
 */

use image::GrayImage;
use once_cell::sync::Lazy;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Radio del círculo de Bresenham del detector FAST.
const FAST_CIRCLE: [(i32, i32); 16] = [
    (0, -3), (1, -3), (2, -2), (3, -1), (3, 0), (3, 1), (2, 2), (1, 3),
    (0, 3), (-1, 3), (-2, 2), (-3, 1), (-3, 0), (-3, -1), (-2, -2), (-1, -3),
];

/// Longitud mínima del arco contiguo para certificar una esquina (FAST-9).
const FAST_ARC_LENGTH: usize = 9;

/// Umbral de contraste del detector de esquinas.
const FAST_THRESHOLD: i32 = 20;

/// Cantidad de bits del descriptor binario.
const BRIEF_BITS: usize = 256;

/// Radio del parche de muestreo del descriptor.
const BRIEF_PATCH_RADIUS: i32 = 12;

/// Margen de borde dentro del cual no se describen rasgos.
const BORDER_MARGIN: u32 = 16;

/// Semilla fija del patrón de muestreo (paridad entre procesos).
const BRIEF_PATTERN_SEED: u64 = 0x1011_0071C5;

/// Par de offsets de comparación de intensidad del patrón BRIEF.
static BRIEF_PATTERN: Lazy<Vec<((i32, i32), (i32, i32))>> = Lazy::new(|| {
    let mut pattern_rng = StdRng::seed_from_u64(BRIEF_PATTERN_SEED);
    (0..BRIEF_BITS)
        .map(|_| {
            (
                (
                    pattern_rng.gen_range(-BRIEF_PATCH_RADIUS..=BRIEF_PATCH_RADIUS),
                    pattern_rng.gen_range(-BRIEF_PATCH_RADIUS..=BRIEF_PATCH_RADIUS),
                ),
                (
                    pattern_rng.gen_range(-BRIEF_PATCH_RADIUS..=BRIEF_PATCH_RADIUS),
                    pattern_rng.gen_range(-BRIEF_PATCH_RADIUS..=BRIEF_PATCH_RADIUS),
                ),
            )
        })
        .collect()
});

/// Rasgo binario localizado: esquina FAST con descriptor BRIEF-256.
#[derive(Debug, Clone)]
pub struct FeatureDescriptor {
    /// Columna de la esquina en píxeles.
    pub x: u32,
    /// Fila de la esquina en píxeles.
    pub y: u32,
    /// Contraste acumulado del arco (para ordenar por fortaleza).
    pub score: u32,
    /// Descriptor binario de 256 bits empaquetado.
    pub bits: [u8; BRIEF_BITS / 8],
}

/**
 * Detecta esquinas FAST-9 y las describe con BRIEF-256.
 *
 * # Logic:
 * 1. Barrido FAST sobre el frame crudo con umbral de contraste fijo.
 * 2. Orden por fortaleza descendente y tope de presupuesto.
 * 3. Descripción sobre el frame suavizado (box blur 3×3) para
 *    estabilidad ante ruido de sensor.
 */
pub fn detect_and_describe(gray_frame: &GrayImage, max_features: usize) -> Vec<FeatureDescriptor> {
    let (width, height) = gray_frame.dimensions();
    if width <= 2 * BORDER_MARGIN || height <= 2 * BORDER_MARGIN {
        return Vec::new();
    }

    let mut corners = Vec::new();
    for y in BORDER_MARGIN..(height - BORDER_MARGIN) {
        for x in BORDER_MARGIN..(width - BORDER_MARGIN) {
            if let Some(score) = fast_corner_score(gray_frame, x, y) {
                corners.push((x, y, score));
            }
        }
    }

    corners.sort_by(|left, right| right.2.cmp(&left.2));
    corners.truncate(max_features);

    let smoothed = box_blur_3x3(gray_frame);

    corners
        .into_iter()
        .map(|(x, y, score)| FeatureDescriptor {
            x,
            y,
            score,
            bits: brief_descriptor(&smoothed, x, y),
        })
        .collect()
}

/// Certifica una esquina FAST-9; retorna el contraste acumulado del círculo.
fn fast_corner_score(gray_frame: &GrayImage, x: u32, y: u32) -> Option<u32> {
    let center = gray_frame.get_pixel(x, y)[0] as i32;
    let bright_floor = center + FAST_THRESHOLD;
    let dark_ceiling = center - FAST_THRESHOLD;

    let mut ring = [0_i32; 16];
    for (slot, (dx, dy)) in FAST_CIRCLE.iter().enumerate() {
        let px = (x as i32 + dx) as u32;
        let py = (y as i32 + dy) as u32;
        ring[slot] = gray_frame.get_pixel(px, py)[0] as i32;
    }

    // Búsqueda de arco contiguo (circular) de 9 píxeles homogéneamente
    // más brillantes o más oscuros que el centro.
    let mut has_arc = false;
    for polarity_bright in [true, false] {
        let mut run_length = 0_usize;
        for step in 0..(16 + FAST_ARC_LENGTH) {
            let sample = ring[step % 16];
            let qualifies = if polarity_bright {
                sample > bright_floor
            } else {
                sample < dark_ceiling
            };
            if qualifies {
                run_length += 1;
                if run_length >= FAST_ARC_LENGTH {
                    has_arc = true;
                    break;
                }
            } else {
                run_length = 0;
            }
        }
        if has_arc {
            break;
        }
    }

    if !has_arc {
        return None;
    }

    Some(ring.iter().map(|sample| (sample - center).unsigned_abs()).sum())
}

/// Suavizado box 3×3 para el muestreo del descriptor.
fn box_blur_3x3(gray_frame: &GrayImage) -> GrayImage {
    let (width, height) = gray_frame.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let mut accumulator = 0_u32;
        let mut samples = 0_u32;
        for dy in -1_i32..=1 {
            for dx in -1_i32..=1 {
                let sx = x as i32 + dx;
                let sy = y as i32 + dy;
                if sx >= 0 && sy >= 0 && (sx as u32) < width && (sy as u32) < height {
                    accumulator += gray_frame.get_pixel(sx as u32, sy as u32)[0] as u32;
                    samples += 1;
                }
            }
        }
        image::Luma([(accumulator / samples.max(1)) as u8])
    })
}

/// Computa el descriptor BRIEF-256 empaquetado para una esquina.
fn brief_descriptor(smoothed: &GrayImage, x: u32, y: u32) -> [u8; BRIEF_BITS / 8] {
    let mut packed = [0_u8; BRIEF_BITS / 8];

    for (bit_index, ((ax, ay), (bx, by))) in BRIEF_PATTERN.iter().enumerate() {
        let first = smoothed.get_pixel((x as i32 + ax) as u32, (y as i32 + ay) as u32)[0];
        let second = smoothed.get_pixel((x as i32 + bx) as u32, (y as i32 + by) as u32)[0];
        if first < second {
            packed[bit_index / 8] |= 1 << (bit_index % 8);
        }
    }

    packed
}

/// Distancia de Hamming entre dos descriptores empaquetados.
fn hamming_distance(left: &[u8; BRIEF_BITS / 8], right: &[u8; BRIEF_BITS / 8]) -> u32 {
    left.iter()
        .zip(right.iter())
        .map(|(a, b)| (a ^ b).count_ones())
        .sum()
}

/**
 * Emparejamiento por fuerza bruta Hamming con verificación cruzada.
 *
 * # Returns:
 * Tripletas (índice_referencia, índice_candidato, distancia) donde cada
 * lado es el vecino más próximo del otro.
 */
pub fn match_descriptors(
    reference: &[FeatureDescriptor],
    candidate: &[FeatureDescriptor],
) -> Vec<(usize, usize, u32)> {
    if reference.is_empty() || candidate.is_empty() {
        return Vec::new();
    }

    let nearest_of = |from: &[FeatureDescriptor], to: &[FeatureDescriptor]| -> Vec<(usize, u32)> {
        from.iter()
            .map(|descriptor| {
                let mut best_index = 0_usize;
                let mut best_distance = u32::MAX;
                for (probe_index, probe) in to.iter().enumerate() {
                    let distance = hamming_distance(&descriptor.bits, &probe.bits);
                    if distance < best_distance {
                        best_distance = distance;
                        best_index = probe_index;
                    }
                }
                (best_index, best_distance)
            })
            .collect()
    };

    let forward = nearest_of(reference, candidate);
    let backward = nearest_of(candidate, reference);

    forward
        .into_iter()
        .enumerate()
        .filter_map(|(ref_index, (cand_index, distance))| {
            // Verificación cruzada: simetría del vecino más próximo.
            (backward[cand_index].0 == ref_index).then_some((ref_index, cand_index, distance))
        })
        .collect()
}

/// Distancia media de un conjunto de emparejamientos (proxy de movimiento).
pub fn mean_match_distance(matches: &[(usize, usize, u32)]) -> f32 {
    if matches.is_empty() {
        return 0.0;
    }
    matches.iter().map(|(_, _, distance)| *distance as f32).sum::<f32>() / matches.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    /// Frame sintético con retícula de cuadros de alto contraste.
    fn checkerboard(width: u32, height: u32, cell: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            if ((x / cell) + (y / cell)) % 2 == 0 {
                Luma([235])
            } else {
                Luma([20])
            }
        })
    }

    #[test]
    fn certify_corner_harvest_on_checkerboard() {
        let frame = checkerboard(128, 128, 16);
        let features = detect_and_describe(&frame, 500);
        assert!(!features.is_empty(), "A checkerboard must yield FAST corners.");
    }

    #[test]
    fn certify_self_match_is_zero_distance() {
        let frame = checkerboard(128, 128, 16);
        let features = detect_and_describe(&frame, 200);
        let matches = match_descriptors(&features, &features);

        assert_eq!(matches.len(), features.len());
        assert!(matches.iter().all(|(a, b, d)| a == b && *d == 0));
        assert_eq!(mean_match_distance(&matches), 0.0);
    }

    #[test]
    fn certify_flat_frame_yields_no_features() {
        let flat = GrayImage::from_pixel(128, 128, Luma([128]));
        assert!(detect_and_describe(&flat, 500).is_empty());
    }
}
