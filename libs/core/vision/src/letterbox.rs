// [libs/core/vision/src/letterbox.rs]
/*!
 * =================================================================
 * APARATO: LETTERBOX GEOMETRY ENGINE (V5.2 - BIJECTIVE GOLD)
 * CLASIFICACIÓN: CORE COMPUTATION (ESTRATO L1)
 * RESPONSABILIDAD: REDIMENSIONADO CON PRESERVACIÓN DE ASPECTO Y TENSORIZACIÓN
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. GEOMETRY LEDGER: 'LetterboxGeometry' registra ratio y padding para
 *    que el post-proceso invierta la transformación bit-perfecto.
 * 2. CANVAS 114: Relleno constante 114 en los tres canales, idéntico al
 *    preprocesador de referencia de la familia YOLO.
 * 3. NCHW FLOAT: Tensorización float32 [0,1] en layout canal-primero.
 *
 * # Mathematical Proof (Aspect Preservation):
 * ratio = min(S/H, S/W). El contenido re-escalado mide
 * (round(W·ratio), round(H·ratio)) ≤ (S, S); el residuo se reparte como
 * padding simétrico ((S-nw)/2, (S-nh)/2). La inversa (restar pad, dividir
 * por ratio) reconstruye la coordenada original con error < 1 píxel para
 * ratios > 0.1.
 * =================================================================
 */

use crate::errors::VisionError;
use image::{imageops, Rgb, RgbImage};
use ndarray::Array4;

/// Valor de relleno del lienzo de letterbox (gris neutro YOLO).
const CANVAS_PAD_VALUE: u8 = 114;

/// Registro de la transformación aplicada, necesario para la inversa.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxGeometry {
    /// Factor de escala aplicado a ambas dimensiones.
    pub ratio: f32,
    /// Padding izquierdo en píxeles del lienzo.
    pub pad_left: f32,
    /// Padding superior en píxeles del lienzo.
    pub pad_top: f32,
    /// Ancho de la imagen original.
    pub original_width: u32,
    /// Alto de la imagen original.
    pub original_height: u32,
}

impl LetterboxGeometry {
    /**
     * Invierte la transformación para una caja [x1, y1, x2, y2] del espacio
     * del lienzo al espacio de la imagen original, con recorte a bordes.
     */
    pub fn reverse_box(&self, raw_box: [f32; 4]) -> [f32; 4] {
        let ratio_guard = self.ratio.max(1e-9);
        let max_x = self.original_width as f32;
        let max_y = self.original_height as f32;

        let x1 = ((raw_box[0] - self.pad_left) / ratio_guard).clamp(0.0, max_x);
        let y1 = ((raw_box[1] - self.pad_top) / ratio_guard).clamp(0.0, max_y);
        let x2 = ((raw_box[2] - self.pad_left) / ratio_guard).clamp(0.0, max_x);
        let y2 = ((raw_box[3] - self.pad_top) / ratio_guard).clamp(0.0, max_y);

        [x1, y1, x2, y2]
    }
}

/**
 * Decodifica bytes crudos (JPEG/PNG) a una imagen RGB de 8 bits.
 *
 * # Errors:
 * - `ImageDecode`: Si los bytes no forman una imagen soportada.
 * - `DegenerateImage`: Si la imagen decodificada tiene dimensión cero.
 */
pub fn decode_rgb_image(image_bytes: &[u8]) -> Result<RgbImage, VisionError> {
    let decoded = image::load_from_memory(image_bytes)
        .map_err(|decode_fault| VisionError::ImageDecode(decode_fault.to_string()))?
        .to_rgb8();

    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(VisionError::DegenerateImage {
            width: decoded.width(),
            height: decoded.height(),
        });
    }

    Ok(decoded)
}

/**
 * Aplica letterbox a un lienzo cuadrado S×S y tensoriza a NCHW float32.
 *
 * # Logic:
 * 1. ratio = min(S/H, S/W); redimensionado bilineal (Triangle).
 * 2. Pegado centrado sobre lienzo 114.
 * 3. Normalización [0,1] y transposición HWC → CHW con batch unitario.
 *
 * # Performance:
 * Una única pasada de copia por píxel tras el redimensionado; el tensor
 * se alloca exacto en (1, 3, S, S).
 */
pub fn letterbox_to_tensor(
    rgb_image: &RgbImage,
    target_side: u32,
) -> (Array4<f32>, LetterboxGeometry) {
    let (original_width, original_height) = rgb_image.dimensions();
    let side = target_side.max(1);

    let ratio = (side as f32 / original_height as f32).min(side as f32 / original_width as f32);
    let resized_width = ((original_width as f32 * ratio).round() as u32).max(1);
    let resized_height = ((original_height as f32 * ratio).round() as u32).max(1);

    let resized = imageops::resize(
        rgb_image,
        resized_width,
        resized_height,
        imageops::FilterType::Triangle,
    );

    let pad_left = (side - resized_width) / 2;
    let pad_top = (side - resized_height) / 2;

    let mut canvas = RgbImage::from_pixel(side, side, Rgb([CANVAS_PAD_VALUE; 3]));
    imageops::overlay(&mut canvas, &resized, pad_left as i64, pad_top as i64);

    let mut tensor = Array4::<f32>::zeros((1, 3, side as usize, side as usize));
    for (x, y, pixel) in canvas.enumerate_pixels() {
        let (col, row) = (x as usize, y as usize);
        tensor[[0, 0, row, col]] = pixel[0] as f32 / 255.0;
        tensor[[0, 1, row, col]] = pixel[1] as f32 / 255.0;
        tensor[[0, 2, row, col]] = pixel[2] as f32 / 255.0;
    }

    let geometry = LetterboxGeometry {
        ratio,
        pad_left: pad_left as f32,
        pad_top: pad_top as f32,
        original_width,
        original_height,
    };

    (tensor, geometry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn certify_letterbox_canvas_dimensions() {
        let source = RgbImage::from_pixel(320, 240, Rgb([10, 20, 30]));
        let (tensor, geometry) = letterbox_to_tensor(&source, 640);

        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert!((geometry.ratio - 2.0).abs() < f32::EPSILON);
        assert_eq!(geometry.pad_left, 0.0);
        assert_eq!(geometry.pad_top, 80.0);
    }

    #[test]
    fn certify_padding_carries_canvas_value() {
        let source = RgbImage::from_pixel(320, 240, Rgb([10, 20, 30]));
        let (tensor, geometry) = letterbox_to_tensor(&source, 640);

        // Primer renglón del lienzo: territorio de padding puro.
        let padded_probe = tensor[[0, 0, 0, 0]];
        assert!((padded_probe - CANVAS_PAD_VALUE as f32 / 255.0).abs() < 1e-6);

        // Interior del contenido re-escalado.
        let content_row = (geometry.pad_top as usize) + 10;
        let content_probe = tensor[[0, 0, content_row, 10]];
        assert!((content_probe - 10.0 / 255.0).abs() < 2e-2);
    }

    #[test]
    fn certify_reverse_box_clips_to_original() {
        let geometry = LetterboxGeometry {
            ratio: 2.0,
            pad_left: 0.0,
            pad_top: 80.0,
            original_width: 320,
            original_height: 240,
        };

        let recovered = geometry.reverse_box([-10.0, 0.0, 700.0, 640.0]);
        assert_eq!(recovered, [0.0, 0.0, 320.0, 240.0]);
    }
}
