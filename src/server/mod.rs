//! Session server for the project model

mod handlers;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::core::model::ChangeEvent;
use crate::core::project::ProjectModel;

/// Shared application state
pub struct AppState {
    pub model: Arc<ProjectModel>,
    pub events: broadcast::Sender<ChangeEvent>,
}

/// Run the session server over an already-constructed project model.
///
/// The initial recompute and the file-system watch are established before
/// the listener binds; failure of either aborts startup.
pub async fn run_server(host: &str, port: u16, model: Arc<ProjectModel>) -> Result<()> {
    model.recompute().await?;

    let (events, _) = broadcast::channel(64);
    let forward = events.clone();
    let _watch = model.watch(move |event| {
        let _ = forward.send(event);
    })?;

    let state = Arc::new(AppState { model, events });

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router
    let app = Router::new()
        .merge(routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
