/// HTTP Server Module
///
/// Provides a health endpoint for the hosting platform.

use anyhow::{Context, Result};
use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use chrono::Utc;
use std::sync::Arc;

use crate::handlers::TourAssistant;

#[derive(Clone)]
pub struct AppState {
    pub assistant: Arc<TourAssistant>,
}

/// Create and configure the HTTP server router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .with_state(state)
}

/// Health check endpoint
async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    Ok(Json(serde_json::json!({
        "status": "ok",
        "service": "tour_sales_bot",
        "catalog_size": state.assistant.catalog().len(),
        "completion_enabled": state.assistant.completion_enabled(),
        "timestamp": Utc::now().to_rfc3339()
    })))
}

/// Start the HTTP server
pub async fn start_server(state: AppState, port: u16) -> Result<()> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .context("Failed to bind HTTP server")?;

    log::info!("HTTP server listening on port {}", port);

    axum::serve(listener, app)
        .await
        .context("HTTP server error")?;

    Ok(())
}
