//! API route definitions

use std::sync::Arc;

use axum::{routing::get, Router};

use super::handlers;
use super::AppState;

/// Create API routes
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Health check
        .route("/api/v1/health", get(handlers::health_check))
        // WebSocket command session
        .route("/ws", get(handlers::ws_upgrade))
}
