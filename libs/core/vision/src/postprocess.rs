// [libs/core/vision/src/postprocess.rs]
/*!
 * =================================================================
 * APARATO: DETECTION HEAD DECODER (V5.4 - MULTI-LAYOUT GOLD)
 * CLASIFICACIÓN: CORE COMPUTATION (ESTRATO L1)
 * RESPONSABILIDAD: DECODIFICACIÓN DE SALIDAS, NMS Y FILTROS DE CLASE
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. TRI-LAYOUT RESOLUTION: Acepta (1, N, 4+C), (1, 4+C, N) y (1, N, 6);
 *    cualquier otra forma colapsa en 'UnsupportedOutputLayout'.
 * 2. PER-CLASS SUPPRESSION: NMS codicioso por clase con tope global de
 *    detecciones ordenado por confianza descendente.
 * 3. SPLIT FILTERS: El filtrado por clase y los umbrales por clase son
 *    operaciones separadas que el despachador compone; los llamadores de
 *    vocabulario abierto omiten el filtro de clase.
 *
 * # Mathematical Proof (NMS Idempotence):
 * La supresión codiciosa conserva, por clase, un conjunto donde todo par
 * tiene IoU < umbral. Re-aplicar la supresión sobre su propia salida no
 * encuentra pares supresores, luego NMS(NMS(X)) == NMS(X).
 * =================================================================
 */

use crate::coco::{class_space_cardinality, map_class_label};
use crate::errors::VisionError;
use crate::letterbox::LetterboxGeometry;
use intellioptics_domain_models::inference::{Detection, OoddVerdict};
use std::collections::HashMap;

/// Directivas de decodificación de la cabeza de detección.
#[derive(Debug, Clone)]
pub struct DetectionHeadDirectives<'a> {
    /// Umbral de confianza de filtrado de cajas (default 0.25).
    pub conf_threshold: f32,
    /// Umbral IoU de la supresión de no-máximos (default 0.45).
    pub iou_threshold: f32,
    /// Tope global de detecciones retenidas (default 100).
    pub max_detections: usize,
    /// Clases declaradas del detector; vacío habilita COCO-80.
    pub class_names: &'a [String],
}

/// Candidata interna previa al mapeo de etiquetas.
struct BoxCandidate {
    class_id: usize,
    confidence: f32,
    bbox: [f32; 4],
}

/**
 * Decodifica la salida cruda del modelo a detecciones en coordenadas
 * de la imagen original.
 *
 * # Errors:
 * - `UnsupportedOutputLayout`: Forma de tensor fuera del contrato.
 *
 * # Logic:
 * 1. Resolución de layout contra la cardinalidad de clases vigente.
 * 2. Filtrado por confianza y reversa de letterbox con recorte.
 * 3. NMS por clase, tope global y mapeo de etiquetas.
 */
pub fn decode_detection_head(
    output_shape: &[usize],
    output_data: &[f32],
    geometry: &LetterboxGeometry,
    directives: &DetectionHeadDirectives<'_>,
) -> Result<Vec<Detection>, VisionError> {
    if output_shape.len() != 3 || output_shape[0] != 1 {
        return Err(VisionError::UnsupportedOutputLayout(output_shape.to_vec()));
    }

    let attribute_channels = 4 + class_space_cardinality(directives.class_names);

    let candidates = if output_shape[2] == 6 {
        decode_xyxy_rows(output_shape[1], output_data, geometry, directives.conf_threshold)
    } else if output_shape[2] == attribute_channels {
        decode_yolo_rows(
            output_shape[1],
            attribute_channels,
            RowOrder::RowMajor,
            output_data,
            geometry,
            directives.conf_threshold,
        )
    } else if output_shape[1] == attribute_channels {
        decode_yolo_rows(
            output_shape[2],
            attribute_channels,
            RowOrder::ChannelMajor,
            output_data,
            geometry,
            directives.conf_threshold,
        )
    } else {
        return Err(VisionError::UnsupportedOutputLayout(output_shape.to_vec()));
    };

    // Supresión por clase y consolidación global.
    let mut survivors = suppress_per_class(candidates, directives.iou_threshold);
    survivors.sort_by(|left, right| {
        right.confidence.partial_cmp(&left.confidence).unwrap_or(std::cmp::Ordering::Equal)
    });
    survivors.truncate(directives.max_detections);

    Ok(survivors
        .into_iter()
        .map(|candidate| Detection {
            label: map_class_label(candidate.class_id, directives.class_names),
            confidence: candidate.confidence,
            bbox: candidate.bbox,
            oodd_adjusted: false,
        })
        .collect())
}

/// Orden de recorrido del tensor de salida.
enum RowOrder {
    /// (1, N, 4+C): atributos contiguos por fila.
    RowMajor,
    /// (1, 4+C, N): atributos separados por stride N (requiere transponer).
    ChannelMajor,
}

/// Decodifica filas YOLO (cx, cy, w, h, scores...) en espacio del lienzo.
fn decode_yolo_rows(
    row_count: usize,
    attribute_channels: usize,
    order: RowOrder,
    data: &[f32],
    geometry: &LetterboxGeometry,
    conf_threshold: f32,
) -> Vec<BoxCandidate> {
    let attribute_at = |row: usize, channel: usize| -> f32 {
        match order {
            RowOrder::RowMajor => data[row * attribute_channels + channel],
            RowOrder::ChannelMajor => data[channel * row_count + row],
        }
    };

    let mut candidates = Vec::new();

    for row in 0..row_count {
        let mut best_score = 0.0_f32;
        let mut best_class = 0_usize;
        for class_channel in 4..attribute_channels {
            let score = attribute_at(row, class_channel);
            if score > best_score {
                best_score = score;
                best_class = class_channel - 4;
            }
        }

        if best_score < conf_threshold {
            continue;
        }

        let center_x = attribute_at(row, 0);
        let center_y = attribute_at(row, 1);
        let width = attribute_at(row, 2);
        let height = attribute_at(row, 3);

        let recovered = geometry.reverse_box([
            center_x - width / 2.0,
            center_y - height / 2.0,
            center_x + width / 2.0,
            center_y + height / 2.0,
        ]);

        if recovered[2] > recovered[0] && recovered[3] > recovered[1] {
            candidates.push(BoxCandidate {
                class_id: best_class,
                confidence: best_score,
                bbox: recovered,
            });
        }
    }

    candidates
}

/// Decodifica filas [x1, y1, x2, y2, conf, class_id] en espacio del lienzo.
fn decode_xyxy_rows(
    row_count: usize,
    data: &[f32],
    geometry: &LetterboxGeometry,
    conf_threshold: f32,
) -> Vec<BoxCandidate> {
    let mut candidates = Vec::new();

    for row in 0..row_count {
        let base = row * 6;
        let confidence = data[base + 4];
        if confidence < conf_threshold {
            continue;
        }

        let recovered = geometry.reverse_box([
            data[base], data[base + 1], data[base + 2], data[base + 3],
        ]);

        if recovered[2] > recovered[0] && recovered[3] > recovered[1] {
            candidates.push(BoxCandidate {
                class_id: data[base + 5].max(0.0) as usize,
                confidence,
                bbox: recovered,
            });
        }
    }

    candidates
}

/// Intersección sobre unión de dos cajas [x1, y1, x2, y2].
fn intersection_over_union(left: &[f32; 4], right: &[f32; 4]) -> f32 {
    let inter_x1 = left[0].max(right[0]);
    let inter_y1 = left[1].max(right[1]);
    let inter_x2 = left[2].min(right[2]);
    let inter_y2 = left[3].min(right[3]);

    let inter_area = (inter_x2 - inter_x1).max(0.0) * (inter_y2 - inter_y1).max(0.0);
    let left_area = (left[2] - left[0]).max(0.0) * (left[3] - left[1]).max(0.0);
    let right_area = (right[2] - right[0]).max(0.0) * (right[3] - right[1]).max(0.0);

    inter_area / (left_area + right_area - inter_area + 1e-9)
}

/// NMS codicioso sobre candidatas ya agrupables por class_id.
fn suppress_per_class(candidates: Vec<BoxCandidate>, iou_threshold: f32) -> Vec<BoxCandidate> {
    let mut per_class: HashMap<usize, Vec<BoxCandidate>> = HashMap::new();
    for candidate in candidates {
        per_class.entry(candidate.class_id).or_default().push(candidate);
    }

    let mut survivors = Vec::new();
    for (_, mut class_pool) in per_class {
        class_pool.sort_by(|left, right| {
            right.confidence.partial_cmp(&left.confidence).unwrap_or(std::cmp::Ordering::Equal)
        });

        while let Some(champion) = class_pool.first().map(|c| BoxCandidate {
            class_id: c.class_id,
            confidence: c.confidence,
            bbox: c.bbox,
        }) {
            class_pool.remove(0);
            class_pool.retain(|challenger| {
                intersection_over_union(&champion.bbox, &challenger.bbox) < iou_threshold
            });
            survivors.push(champion);
        }
    }

    survivors
}

/**
 * Supresión de no-máximos por clase sobre detecciones ya etiquetadas.
 *
 * # Logic:
 * Agrupa por etiqueta, ordena por confianza descendente y suprime toda
 * caja con IoU ≥ umbral contra una campeona retenida. Idempotente.
 */
pub fn non_max_suppression(detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    let mut per_label: HashMap<String, Vec<Detection>> = HashMap::new();
    for detection in detections {
        per_label.entry(detection.label.clone()).or_default().push(detection);
    }

    let mut survivors = Vec::new();
    for (_, mut label_pool) in per_label {
        label_pool.sort_by(|left, right| {
            right.confidence.partial_cmp(&left.confidence).unwrap_or(std::cmp::Ordering::Equal)
        });

        while !label_pool.is_empty() {
            let champion = label_pool.remove(0);
            label_pool.retain(|challenger| {
                intersection_over_union(&champion.bbox, &challenger.bbox) < iou_threshold
            });
            survivors.push(champion);
        }
    }

    survivors.sort_by(|left, right| {
        right.confidence.partial_cmp(&left.confidence).unwrap_or(std::cmp::Ordering::Equal)
    });
    survivors
}

/**
 * Filtro de pertenencia de clase: retiene solo etiquetas declaradas.
 * Los llamadores de vocabulario abierto omiten esta operación.
 */
pub fn filter_by_class_names(detections: Vec<Detection>, class_names: &[String]) -> Vec<Detection> {
    if class_names.is_empty() {
        return detections;
    }

    detections
        .into_iter()
        .filter(|detection| class_names.iter().any(|declared| declared == &detection.label))
        .collect()
}

/**
 * Umbrales por clase: descarta detecciones bajo el corte de su clase,
 * con el umbral del detector como default para clases sin corte propio.
 */
pub fn apply_per_class_thresholds(
    detections: Vec<Detection>,
    per_class_thresholds: &HashMap<String, f32>,
    default_threshold: f32,
) -> Vec<Detection> {
    if per_class_thresholds.is_empty() {
        return detections;
    }

    detections
        .into_iter()
        .filter(|detection| {
            let cutoff = per_class_thresholds
                .get(&detection.label)
                .copied()
                .unwrap_or(default_threshold);
            detection.confidence >= cutoff
        })
        .collect()
}

/**
 * Atenuación OODD: con veredicto fuera-de-dominio, multiplica cada
 * confianza por el ajuste y sella 'oodd_adjusted'.
 */
pub fn apply_oodd_attenuation(detections: &mut [Detection], verdict: &OoddVerdict) {
    if verdict.is_in_domain {
        return;
    }

    for detection in detections.iter_mut() {
        detection.confidence *= verdict.confidence_adjustment;
        detection.oodd_adjusted = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_geometry(side: u32) -> LetterboxGeometry {
        LetterboxGeometry {
            ratio: 1.0,
            pad_left: 0.0,
            pad_top: 0.0,
            original_width: side,
            original_height: side,
        }
    }

    fn forge_detection(label: &str, confidence: f32, bbox: [f32; 4]) -> Detection {
        Detection { label: label.into(), confidence, bbox, oodd_adjusted: false }
    }

    #[test]
    fn certify_xyxy_layout_decoding() {
        let geometry = identity_geometry(640);
        // Dos filas: una sobreviviente, una filtrada por confianza.
        let data = [
            10.0, 10.0, 100.0, 100.0, 0.9, 0.0,
            5.0, 5.0, 50.0, 50.0, 0.1, 1.0,
        ];
        let class_names = vec!["fire".to_string(), "smoke".to_string()];
        let directives = DetectionHeadDirectives {
            conf_threshold: 0.25,
            iou_threshold: 0.45,
            max_detections: 100,
            class_names: &class_names,
        };

        let detections = decode_detection_head(&[1, 2, 6], &data, &geometry, &directives)
            .expect("layout must resolve");

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].label, "fire");
        assert!((detections[0].confidence - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn certify_unknown_layout_rejected() {
        let geometry = identity_geometry(640);
        let directives = DetectionHeadDirectives {
            conf_threshold: 0.25,
            iou_threshold: 0.45,
            max_detections: 100,
            class_names: &[],
        };

        let fault = decode_detection_head(&[1, 3, 9], &[0.0; 27], &geometry, &directives);
        assert!(matches!(fault, Err(VisionError::UnsupportedOutputLayout(_))));
    }

    #[test]
    fn certify_nms_idempotence() {
        let crowded = vec![
            forge_detection("fire", 0.95, [10.0, 10.0, 110.0, 110.0]),
            forge_detection("fire", 0.80, [12.0, 12.0, 112.0, 112.0]),
            forge_detection("fire", 0.60, [300.0, 300.0, 400.0, 400.0]),
            forge_detection("smoke", 0.70, [11.0, 11.0, 111.0, 111.0]),
        ];

        let first_pass = non_max_suppression(crowded, 0.45);
        let second_pass = non_max_suppression(first_pass.clone(), 0.45);

        assert_eq!(first_pass, second_pass);
        // La clase 'smoke' sobrevive aunque solape con 'fire' (supresión por clase).
        assert!(first_pass.iter().any(|d| d.label == "smoke"));
        assert_eq!(first_pass.iter().filter(|d| d.label == "fire").count(), 2);
    }

    #[test]
    fn certify_oodd_attenuation_seal() {
        let mut detections = vec![forge_detection("fire", 0.8, [0.0, 0.0, 10.0, 10.0])];
        let verdict = OoddVerdict {
            in_domain_score: 0.2,
            is_in_domain: false,
            confidence_adjustment: 0.1,
            calibrated_threshold: 0.444,
        };

        apply_oodd_attenuation(&mut detections, &verdict);

        assert!((detections[0].confidence - 0.08).abs() < 1e-6);
        assert!(detections[0].oodd_adjusted);
    }

    #[test]
    fn certify_per_class_threshold_default_fallback() {
        let detections = vec![
            forge_detection("fire", 0.65, [0.0, 0.0, 10.0, 10.0]),
            forge_detection("smoke", 0.45, [0.0, 0.0, 10.0, 10.0]),
        ];
        let mut thresholds = HashMap::new();
        thresholds.insert("fire".to_string(), 0.6);

        let kept = apply_per_class_thresholds(detections, &thresholds, 0.5);

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].label, "fire");
    }
}
