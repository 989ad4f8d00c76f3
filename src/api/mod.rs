// src/api/mod.rs — HTTP + WebSocket surface

pub mod handlers;
pub mod types;
pub mod ws;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::gateway::DiagnosticGateway;
use crate::infra::config::{ServerConfig, SimulationConfig};
use crate::reports::store::ReportStore;

/// Uploaded device photos routinely exceed axum's 2 MB default.
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Shared state for API handlers and WebSocket sessions.
#[derive(Clone)]
pub struct ApiState {
    pub reports: Arc<dyn ReportStore>,
    pub gateway: Arc<dyn DiagnosticGateway>,
    pub simulation: SimulationConfig,
}

/// Build the axum router with all routes.
pub fn build_router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            "http://localhost:3000".parse().unwrap(),
            "http://localhost:5173".parse().unwrap(),
            "http://127.0.0.1:3000".parse().unwrap(),
            "http://127.0.0.1:5173".parse().unwrap(),
        ])
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any);

    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/reports", get(handlers::list_reports))
        .route("/reports/start", post(handlers::start_report))
        .route("/reports/{report_id}", get(handlers::get_report))
        .route("/reports/{report_id}/update", put(handlers::update_report))
        .route("/diagnose/summarize", post(handlers::summarize))
        .route("/diagnose/visual", post(handlers::analyze_visual))
        .route("/diagnose/transcribe", post(handlers::transcribe_audio))
        .route("/diagnose/chat", post(handlers::chat))
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state)
}

/// Start the server (blocking until shutdown).
pub async fn start_server(config: &ServerConfig, state: ApiState) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.bind, config.port);

    let router = build_router(state);

    tracing::info!("Server listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;
    Ok(())
}
