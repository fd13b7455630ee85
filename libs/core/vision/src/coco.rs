// [libs/core/vision/src/coco.rs]
//! =================================================================
//! APARATO: COCO-80 CLASS TABLE (V5.0 - CANONICAL)
//! CLASIFICACIÓN: CORE COMPUTATION (ESTRATO L1)
//! RESPONSABILIDAD: TABLA CANÓNICA DE CLASES Y MAPEO DE ETIQUETAS
//! =================================================================

/// Tabla canónica COCO-80 (índice 0 == "person").
pub const COCO_CLASSES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat",
    "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack",
    "umbrella", "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball",
    "kite", "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket",
    "bottle", "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple",
    "sandwich", "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair",
    "couch", "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote",
    "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator", "book",
    "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

/**
 * Mapea un índice de clase a su etiqueta nominal.
 *
 * # Logic:
 * Con 'class_names' no vacío, la tabla del detector tiene autoridad;
 * en su ausencia rige la tabla COCO-80. Un índice fuera de rango se
 * degrada a la forma 'class_{id}' en lugar de colapsar.
 */
pub fn map_class_label(class_id: usize, class_names: &[String]) -> String {
    if !class_names.is_empty() {
        return class_names
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("class_{}", class_id));
    }

    COCO_CLASSES
        .get(class_id)
        .map(|label| (*label).to_string())
        .unwrap_or_else(|| format!("class_{}", class_id))
}

/// Cardinalidad efectiva del espacio de clases vigente.
pub fn class_space_cardinality(class_names: &[String]) -> usize {
    if class_names.is_empty() {
        COCO_CLASSES.len()
    } else {
        class_names.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn certify_coco_table_anchors() {
        assert_eq!(COCO_CLASSES[0], "person");
        assert_eq!(COCO_CLASSES[79], "toothbrush");
        assert_eq!(COCO_CLASSES.len(), 80);
    }

    #[test]
    fn certify_out_of_range_degradation() {
        assert_eq!(map_class_label(93, &[]), "class_93");
        let custom = vec!["fire".to_string()];
        assert_eq!(map_class_label(0, &custom), "fire");
        assert_eq!(map_class_label(7, &custom), "class_7");
    }
}
