//! HTTP surface over the query service and the refresh pipeline.

mod error;
mod routes;

use crate::refresh::RefreshPipeline;
use crate::service::CountryService;
use anyhow::{Context, Result};
use axum::Router;
use axum::routing::{get, post};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub struct AppState {
    pub service: CountryService,
    pub refresh: RefreshPipeline,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/countries/refresh", post(routes::refresh_countries))
        .route("/countries", get(routes::list_countries))
        .route("/countries/image", get(routes::summary_image))
        .route(
            "/countries/{name}",
            get(routes::get_country).delete(routes::delete_country),
        )
        .route("/status", get(routes::status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves until Ctrl+C.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => warn!("Received Ctrl+C, shutting down"),
        Err(e) => {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
