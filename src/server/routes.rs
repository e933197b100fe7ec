//! Router configuration for the API server.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/enrich-step", post(handlers::enrich_step))
        .route("/api/reenrich/:id", post(handlers::reenrich))
        .route("/api/flags/:code", get(handlers::review_flags))
        .route("/api/transitions/check", get(handlers::check_transition))
        .route("/api/status-codes", get(handlers::status_codes))
        .route("/api/items/:id/runs", get(handlers::run_history))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
