// [libs/infra/db/src/schema.rs]
/**
 * =================================================================
 * APARATO: INSPECTION PLATFORM SCHEMA (V4.3 - IDEMPOTENT STRATA)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: GOBERNANZA ESTRUCTURAL E IDEMPOTENCIA TOTAL
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. NULLABLE DETECTOR: 'queries.detector_identifier' admite NULL para
 *    consultas de vocabulario abierto (migración prescrita).
 * 2. JSON EMBEDDING: Las detecciones viajan embebidas en 'detections_json';
 *    los agregados laterales (escalations, feedback, annotations) usan
 *    llaves foráneas explícitas para la cascada de borrado.
 * 3. IDEMPOTENCIA: Gestión de errores para migraciones en caliente.
 * 4. PERFORMANCE: Índices de aceleración para el conteo consecutivo y
 *    la verificación de cooldown de alertas.
 * =================================================================
 */

use anyhow::{Context, Result};
use libsql::Connection;
use tracing::{debug, info, instrument, warn};

/**
 * ESTRATO 1: SOLIDIFICACIÓN (Génesis de Tablas)
 */
const TACTICAL_TABLES: &[(&str, &str)] = &[
    ("TABLE_DETECTORS", r#"
        CREATE TABLE IF NOT EXISTS detectors (
            identifier TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            group_name TEXT,
            query_text TEXT NOT NULL,
            mode TEXT NOT NULL DEFAULT 'BOUNDING_BOX',
            class_names_json TEXT NOT NULL DEFAULT '[]',
            confidence_threshold REAL NOT NULL DEFAULT 0.5,
            patience_time_seconds REAL NOT NULL DEFAULT 30.0,
            primary_model_blob_path TEXT,
            oodd_model_blob_path TEXT,
            deleted_at TEXT,
            created_at TEXT NOT NULL
        );
    "#),
    ("TABLE_DETECTOR_CONFIGS", r#"
        CREATE TABLE IF NOT EXISTS detector_configs (
            detector_identifier TEXT PRIMARY KEY,
            per_class_thresholds_json TEXT NOT NULL DEFAULT '{}',
            detection_params_json TEXT NOT NULL DEFAULT '{}',
            model_input_config_json TEXT NOT NULL DEFAULT '{}',
            edge_inference_enabled INTEGER NOT NULL DEFAULT 0
        );
    "#),
    ("TABLE_DETECTOR_ALERT_CONFIGS", r#"
        CREATE TABLE IF NOT EXISTS detector_alert_configs (
            detector_identifier TEXT PRIMARY KEY,
            enabled INTEGER NOT NULL DEFAULT 0,
            condition_type TEXT NOT NULL DEFAULT 'ALWAYS',
            condition_value TEXT,
            consecutive_count INTEGER NOT NULL DEFAULT 1,
            time_window_minutes INTEGER,
            alert_emails_json TEXT NOT NULL DEFAULT '[]',
            alert_phones_json TEXT NOT NULL DEFAULT '[]',
            alert_webhooks_json TEXT NOT NULL DEFAULT '[]',
            severity TEXT NOT NULL DEFAULT 'warning',
            cooldown_minutes INTEGER NOT NULL DEFAULT 5,
            custom_message TEXT,
            alert_name TEXT,
            include_image INTEGER NOT NULL DEFAULT 1
        );
    "#),
    ("TABLE_QUERIES", r#"
        CREATE TABLE IF NOT EXISTS queries (
            identifier TEXT PRIMARY KEY,
            detector_identifier TEXT,
            image_blob_path TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'PENDING',
            result_label TEXT,
            confidence REAL,
            detections_json TEXT NOT NULL DEFAULT '[]',
            local_inference INTEGER NOT NULL DEFAULT 0,
            escalated INTEGER NOT NULL DEFAULT 0,
            ground_truth TEXT,
            is_correct INTEGER,
            reviewed_by TEXT,
            reviewed_at TEXT,
            created_at TEXT NOT NULL
        );
    "#),
    ("TABLE_ESCALATIONS", r#"
        CREATE TABLE IF NOT EXISTS escalations (
            identifier TEXT PRIMARY KEY,
            query_identifier TEXT NOT NULL,
            reason TEXT NOT NULL,
            resolved INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );
    "#),
    ("TABLE_FEEDBACK", r#"
        CREATE TABLE IF NOT EXISTS feedback (
            identifier TEXT PRIMARY KEY,
            query_identifier TEXT NOT NULL,
            reviewer_identifier TEXT,
            label TEXT NOT NULL,
            confidence REAL,
            notes TEXT,
            count INTEGER,
            created_at TEXT NOT NULL
        );
    "#),
    ("TABLE_ANNOTATIONS", r#"
        CREATE TABLE IF NOT EXISTS annotations (
            identifier TEXT PRIMARY KEY,
            query_identifier TEXT NOT NULL,
            payload_json TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
    "#),
    ("TABLE_DETECTOR_ALERTS", r#"
        CREATE TABLE IF NOT EXISTS detector_alerts (
            identifier TEXT PRIMARY KEY,
            detector_identifier TEXT NOT NULL,
            query_identifier TEXT,
            severity TEXT NOT NULL,
            message TEXT NOT NULL,
            detection_label TEXT NOT NULL,
            detection_confidence REAL NOT NULL,
            camera_name TEXT,
            image_blob_path TEXT,
            acknowledged INTEGER NOT NULL DEFAULT 0,
            email_sent INTEGER NOT NULL DEFAULT 0,
            sms_sent INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );
    "#),
    ("TABLE_CAMERAS", r#"
        CREATE TABLE IF NOT EXISTS cameras (
            identifier TEXT PRIMARY KEY,
            hub_identifier TEXT,
            display_name TEXT NOT NULL,
            rtsp_url TEXT NOT NULL,
            current_status TEXT NOT NULL DEFAULT 'offline',
            health_score REAL NOT NULL DEFAULT 0.0,
            baseline_image_path TEXT,
            baseline_updated_at TEXT,
            view_change_detected INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );
    "#),
    ("TABLE_CAMERA_HEALTH", r#"
        CREATE TABLE IF NOT EXISTS camera_health (
            identifier TEXT PRIMARY KEY,
            camera_identifier TEXT NOT NULL,
            status TEXT NOT NULL,
            fps REAL NOT NULL DEFAULT 0.0,
            expected_fps REAL NOT NULL DEFAULT 30.0,
            resolution TEXT NOT NULL DEFAULT 'N/A',
            latency_ms INTEGER NOT NULL DEFAULT 0,
            avg_brightness REAL,
            sharpness_score REAL,
            view_similarity_score REAL,
            view_change_detected INTEGER NOT NULL DEFAULT 0,
            recorded_at TEXT NOT NULL
        );
    "#),
    ("TABLE_CAMERA_ALERTS", r#"
        CREATE TABLE IF NOT EXISTS camera_alerts (
            identifier TEXT PRIMARY KEY,
            camera_identifier TEXT NOT NULL,
            alert_type TEXT NOT NULL,
            severity TEXT NOT NULL,
            message TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
    "#),
    ("TABLE_INSPECTION_RUNS", r#"
        CREATE TABLE IF NOT EXISTS inspection_runs (
            identifier TEXT PRIMARY KEY,
            status TEXT NOT NULL DEFAULT 'running',
            total_cameras INTEGER NOT NULL DEFAULT 0,
            cameras_inspected INTEGER NOT NULL DEFAULT 0,
            cameras_healthy INTEGER NOT NULL DEFAULT 0,
            cameras_warning INTEGER NOT NULL DEFAULT 0,
            cameras_failed INTEGER NOT NULL DEFAULT 0,
            started_at TEXT NOT NULL,
            completed_at TEXT
        );
    "#),
    ("TABLE_DEMO_SESSIONS", r#"
        CREATE TABLE IF NOT EXISTS demo_sessions (
            identifier TEXT PRIMARY KEY,
            source_url TEXT NOT NULL,
            capture_mode TEXT NOT NULL DEFAULT 'polling',
            detector_identifiers_json TEXT NOT NULL DEFAULT '[]',
            yoloworld_prompts TEXT,
            status TEXT NOT NULL DEFAULT 'active',
            total_frames_captured INTEGER NOT NULL DEFAULT 0,
            total_detections INTEGER NOT NULL DEFAULT 0,
            polling_interval_ms INTEGER NOT NULL DEFAULT 2000,
            motion_threshold REAL NOT NULL DEFAULT 500.0,
            created_at TEXT NOT NULL
        );
    "#),
    ("TABLE_DEMO_DETECTION_RESULTS", r#"
        CREATE TABLE IF NOT EXISTS demo_detection_results (
            identifier TEXT PRIMARY KEY,
            session_identifier TEXT NOT NULL,
            query_identifier TEXT NOT NULL,
            detector_identifier TEXT,
            frame_number INTEGER NOT NULL DEFAULT 0,
            capture_method TEXT NOT NULL DEFAULT 'polling',
            status TEXT NOT NULL DEFAULT 'PENDING',
            created_at TEXT NOT NULL
        );
    "#),
];

/**
 * ESTRATO 2: EVOLUCIÓN (Mutaciones de Columna)
 * Asegura que las tablas de despliegues previos se adapten.
 */
const EVOLUTIONARY_STRATA: &[(&str, &str)] = &[
    // Migración prescrita: detector nullable para vocabulario abierto.
    ("QUERY_SMS_TRACE", "ALTER TABLE queries ADD COLUMN camera_name TEXT"),
    ("ALERT_ACKNOWLEDGED_BY", "ALTER TABLE detector_alerts ADD COLUMN acknowledged_by TEXT"),
    ("CAMERA_EXPECTED_FPS", "ALTER TABLE cameras ADD COLUMN expected_fps REAL DEFAULT 30.0"),
];

/**
 * ESTRATO 3: ENDURECIMIENTO (Índices de Aceleración)
 */
const ACCELERATION_INDEXES: &[(&str, &str)] = &[
    ("IDX_QUERIES_DETECTOR", "CREATE INDEX IF NOT EXISTS idx_queries_detector ON queries(detector_identifier, created_at);"),
    ("IDX_QUERIES_STATUS", "CREATE INDEX IF NOT EXISTS idx_queries_status ON queries(status);"),
    ("IDX_ESCALATIONS_QUERY", "CREATE INDEX IF NOT EXISTS idx_escalations_query ON escalations(query_identifier);"),
    ("IDX_FEEDBACK_QUERY", "CREATE INDEX IF NOT EXISTS idx_feedback_query ON feedback(query_identifier);"),
    ("IDX_ANNOTATIONS_QUERY", "CREATE INDEX IF NOT EXISTS idx_annotations_query ON annotations(query_identifier);"),
    ("IDX_ALERTS_COOLDOWN", "CREATE INDEX IF NOT EXISTS idx_alerts_cooldown ON detector_alerts(detector_identifier, created_at);"),
    ("IDX_HEALTH_CAMERA", "CREATE INDEX IF NOT EXISTS idx_health_camera ON camera_health(camera_identifier, recorded_at);"),
    ("IDX_DEMO_RESULTS_SESSION", "CREATE INDEX IF NOT EXISTS idx_demo_results_session ON demo_detection_results(session_identifier);"),
];

/// Tolerancia de fallo de una fase del motor de esquema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PhaseTolerance {
    /// El rechazo de una sentencia colapsa la sincronización completa.
    Strict,
    /// Las mutaciones ya niveladas se omiten; el resto se reporta y continúa.
    /// Requerido por las migraciones en caliente de columnas.
    Lenient,
}

/// Fase declarativa del motor de esquema.
struct SchemaPhase {
    phase_title: &'static str,
    statements: &'static [(&'static str, &'static str)],
    tolerance: PhaseTolerance,
}

/// Plan maestro de nivelación: génesis → evolución → endurecimiento.
const LEVELING_PLAN: [SchemaPhase; 3] = [
    SchemaPhase {
        phase_title: "GENESIS",
        statements: TACTICAL_TABLES,
        tolerance: PhaseTolerance::Strict,
    },
    SchemaPhase {
        phase_title: "EVOLUTION",
        statements: EVOLUTIONARY_STRATA,
        tolerance: PhaseTolerance::Lenient,
    },
    SchemaPhase {
        phase_title: "HARDENING",
        statements: ACCELERATION_INDEXES,
        tolerance: PhaseTolerance::Strict,
    },
];

/**
 * Ejecuta el plan maestro de nivelación del esquema estructural.
 *
 * # Logic:
 * Un único ejecutor recorre las fases declarativas; la tolerancia de
 * cada fase decide si una sentencia rechazada colapsa la nivelación
 * (génesis, índices) o se triaja en caliente (mutaciones de columna ya
 * aplicadas en despliegues previos).
 *
 * # Errors:
 * Retorna error ante el rechazo de una sentencia de fase estricta,
 * indicando un colapso en el enlace con el cluster.
 */
#[instrument(skip(database_connection))]
pub async fn apply_full_inspection_schema(database_connection: &Connection) -> Result<()> {
    info!("🏗️ [SCHEMA_ENGINE]: Leveling plan V4.4 in motion ({} phases)...", LEVELING_PLAN.len());

    for phase in &LEVELING_PLAN {
        execute_leveling_phase(database_connection, phase).await?;
    }

    info!("✅ [SCHEMA_ENGINE]: Inspection Ledger level and certified.");
    Ok(())
}

/// Ejecutor único de fase con triaje por tolerancia.
async fn execute_leveling_phase(db: &Connection, phase: &SchemaPhase) -> Result<()> {
    debug!("  🧱 [{}]: {} statement(s) queued.", phase.phase_title, phase.statements.len());

    for (statement_identifier, statement_sql) in phase.statements {
        let execution = db.execute(*statement_sql, ()).await;

        match (execution, phase.tolerance) {
            (Ok(_), _) => {
                debug!("  🟢 [{}]: {} level.", phase.phase_title, statement_identifier)
            }
            (Err(fault), PhaseTolerance::Strict) => {
                return Err(fault).with_context(|| {
                    format!("SCHEMA_PHASE_COLLAPSE [{}]: {}", phase.phase_title, statement_identifier)
                });
            }
            (Err(fault), PhaseTolerance::Lenient) => {
                // Mutación ya nivelada en un despliegue previo: silencio nominal.
                if fault.to_string().contains("duplicate column name") {
                    debug!("  ⚪ [{}]: {} already level.", phase.phase_title, statement_identifier);
                } else {
                    warn!(
                        "  ⚠️ [{}]: {} deferred: {}",
                        phase.phase_title, statement_identifier, fault
                    );
                }
            }
        }
    }

    Ok(())
}
