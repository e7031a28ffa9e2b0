//! HTTP API for the capture plane

pub mod error;
pub mod handlers;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Readiness check response
#[derive(Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
    pub kid: String,
    pub issuer: String,
    /// SPKI PEM for verifying trust tokens offline
    pub public_key_pem: String,
    pub device_count: usize,
}

/// Health check endpoint
///
/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

/// Readiness check endpoint
///
/// GET /ready
pub async fn ready(State(state): State<Arc<AppState>>) -> Json<ReadyResponse> {
    let device_count = state.store.device_count().await.unwrap_or(0);

    Json(ReadyResponse {
        ready: true,
        kid: state.issuer.kid().to_string(),
        issuer: state.issuer.issuer().to_string(),
        public_key_pem: state.issuer.public_key_pem().to_string(),
        device_count,
    })
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/devices", post(handlers::register_device))
        .route("/capture/session", post(handlers::create_session))
        .route("/capture/trust", post(handlers::exchange_trust))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
