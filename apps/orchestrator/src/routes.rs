// INICIO DEL ARCHIVO [apps/orchestrator/src/routes.rs]
/*!
 * =================================================================
 * APARATO: SOVEREIGN ROUTING MATRIX (V5.2 - DATA PLANE TOPOLOGY)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: ORQUESTACIÓN DE ESTRATOS DE CONSULTAS, DEMO E INSPECCIÓN
 *
 * VISION HIPER-HOLÍSTICA:
 * La topología soporta:
 * 1. REST de Consultas (ciclo de vida + revisión + métricas).
 * 2. REST de Demo (sesiones supervisadas + vista previa).
 * 3. REST de Inspección (flota de cámaras + rondas, consumida por el
 *    inspector de campo).
 * =================================================================
 */

use crate::handlers::{alerts, demo, escalations, inspection, queries};
use crate::state::AppState;
use axum::{
    http::{header, Method},
    routing::{get, post, put},
    Router,
};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

pub fn create_sovereign_router(application_shared_state: AppState) -> Router {
    // Escudo de Red: CORS para el panel de operaciones y herramientas.
    let network_security_shield = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    // ESTRATO TÁCTICO: Ciclo de vida de consultas.
    let query_lifecycle_stratum = Router::new()
        .route("/", get(queries::handle_list_queries).post(queries::handle_create_query))
        .route("/metrics", get(queries::handle_query_metrics))
        .route(
            "/:query_id",
            get(queries::handle_get_query)
                .patch(queries::handle_ground_truth)
                .delete(queries::handle_delete_query),
        )
        .route("/:query_id/feedback", post(queries::handle_submit_feedback));

    // ESTRATO DE REVISIÓN: Derivaciones.
    let escalation_stratum = Router::new()
        .route("/:escalation_id/resolve", post(escalations::handle_resolve_escalation));

    // ESTRATO DE EXHIBICIÓN: Sesiones de demo supervisadas.
    let demo_stratum = Router::new()
        .route("/sessions", post(demo::handle_start_session))
        .route("/sessions/:session_id", get(demo::handle_get_session))
        .route("/sessions/:session_id/stop", post(demo::handle_stop_session))
        .route("/sessions/:session_id/frame", get(demo::handle_latest_frame));

    // ESTRATO HERALD: Configuración y reconocimiento de alertas.
    let alerting_stratum = Router::new()
        .route(
            "/detectors/:detector_id/alert-config",
            get(alerts::handle_get_alert_config).put(alerts::handle_put_alert_config),
        )
        .route("/alerts/:alert_id/acknowledge", post(alerts::handle_acknowledge_alert));

    // ESTRATO PANÓPTICO: Flota de cámaras e inspección.
    let inspection_stratum = Router::new()
        .route("/cameras", get(inspection::handle_list_cameras).post(inspection::handle_register_camera))
        .route("/cameras/:camera_id/health", post(inspection::handle_post_health_sample))
        .route("/cameras/:camera_id/baseline", post(inspection::handle_set_baseline))
        .route("/camera-alerts", post(inspection::handle_post_camera_alert))
        .route(
            "/inspection/config",
            get(inspection::handle_get_inspection_config)
                .put(inspection::handle_put_inspection_config),
        )
        .route("/inspection/runs", post(inspection::handle_open_inspection_run))
        .route("/inspection/runs/:run_id", put(inspection::handle_seal_inspection_run));

    // COMPOSICIÓN GLOBAL (Root Topology)
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .nest(
            "/api/v1",
            Router::new()
                .nest("/queries", query_lifecycle_stratum)
                .nest("/escalations", escalation_stratum)
                .nest("/demo", demo_stratum)
                .merge(alerting_stratum)
                .merge(inspection_stratum),
        )
        .layer(network_security_shield)
        .with_state(application_shared_state)
}
// FIN DEL ARCHIVO [apps/orchestrator/src/routes.rs]
