//! HTTP server implementation for the API

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::handlers;
use crate::pipeline::Pipeline;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

/// Build the application router.
pub fn router(pipeline: Arc<Pipeline>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/process-video", post(handlers::process_video))
        .with_state(AppState { pipeline })
        .layer(TraceLayer::new_for_http())
}

/// Serve the API until Ctrl+C is received.
pub async fn start_http_server(pipeline: Arc<Pipeline>, bind_address: &str) -> Result<()> {
    let app = router(pipeline);

    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!("API running on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, finishing in-flight requests");
}
