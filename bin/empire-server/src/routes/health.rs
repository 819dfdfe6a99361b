//! Health / welcome endpoints.

use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_root, get_health))]
pub struct HealthApi;

/// Register health-check routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_root))
        .route("/health", get(get_health))
}

/// Welcome endpoint.
#[utoipa::path(
    get,
    path = "/",
    tag = "health",
    responses(
        (status = 200, description = "API welcome message", body = Value)
    )
)]
pub async fn get_root() -> Json<Value> {
    Json(json!({
        "message": "Welcome to Digital Empire API",
        "status":  "operational",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Heartbeat endpoint.
///
/// Returns `{"status": "healthy"}` with HTTP 200.  Load-balancers and
/// monitoring systems should poll this endpoint.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Server is healthy", body = Value)
    )
)]
pub async fn get_health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
