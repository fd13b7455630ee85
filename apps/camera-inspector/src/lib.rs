// [apps/camera-inspector/src/lib.rs]
/*!
 * =================================================================
 * APARATO: CAMERA INSPECTOR LIBRARY BARREL (V5.0 - SOBERANO)
 * CLASIFICACIÓN: FIELD AGENT LAYER (ESTRATO L1-INSPECTOR)
 * RESPONSABILIDAD: EXPOSICIÓN DEL CICLO DE INSPECCIÓN
 * =================================================================
 */

pub mod inspector;

pub use inspector::CameraInspector;
