// [libs/domain/alerting/src/message.rs]
/*!
 * =================================================================
 * APARATO: ALERT MESSAGE COMPOSER (V4.1 - TEMPLATE SEAL)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: COMPOSICIÓN DEL MENSAJE DESDE PLANTILLA O FORMATO BASE
 *
 * # Logic:
 * La plantilla personalizada admite los marcadores {detector_name},
 * {label}, {confidence} (porcentaje con dos decimales) y {camera_name}.
 * Sin plantilla rige el formato por defecto con sufijo de cámara.
 * =================================================================
 */

/**
 * Compone el mensaje de alerta.
 */
pub fn compose_alert_message(
    custom_template: Option<&str>,
    detector_name: &str,
    result_label: &str,
    confidence: f32,
    camera_name: Option<&str>,
) -> String {
    let confidence_percent = format!("{:.2}%", confidence * 100.0);

    if let Some(template) = custom_template {
        let mut composed = template
            .replace("{detector_name}", detector_name)
            .replace("{label}", result_label)
            .replace("{confidence}", &confidence_percent);

        if let Some(camera) = camera_name {
            composed = composed.replace("{camera_name}", camera);
        }

        return composed;
    }

    let mut composed = format!(
        "Alert: {} detected '{}' (confidence: {})",
        detector_name, result_label, confidence_percent
    );

    if let Some(camera) = camera_name {
        composed.push_str(&format!(" on camera '{}'", camera));
    }

    composed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn certify_default_format_with_camera_suffix() {
        let message = compose_alert_message(None, "Fire Watch", "fire", 0.935, Some("dock-cam-02"));
        assert_eq!(
            message,
            "Alert: Fire Watch detected 'fire' (confidence: 93.50%) on camera 'dock-cam-02'"
        );
    }

    #[test]
    fn certify_template_placeholder_substitution() {
        let message = compose_alert_message(
            Some("{detector_name}: {label} at {confidence} ({camera_name})"),
            "Fire Watch",
            "fire",
            0.9,
            Some("dock-cam-02"),
        );
        assert_eq!(message, "Fire Watch: fire at 90.00% (dock-cam-02)");
    }

    #[test]
    fn certify_template_without_camera_keeps_placeholder_untouched() {
        let message = compose_alert_message(
            Some("{label} via {camera_name}"),
            "Fire Watch",
            "fire",
            0.9,
            None,
        );
        // Sin cámara, el marcador permanece (paridad con el compositor previo).
        assert_eq!(message, "fire via {camera_name}");
    }
}
