// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::extract::extract_handler;
use super::handlers::{health_handler, models_handler};
use crate::config::DEFAULT_MAX_UPLOAD_BYTES;
use crate::recognition::ServiceState;

/// State shared by every route
#[derive(Debug, Clone)]
pub struct AppState {
    pub service: ServiceState,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(service: ServiceState) -> Self {
        Self {
            service,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}

pub fn create_app(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;

    Router::new()
        .route("/health", get(health_handler))
        .route("/extract", post(extract_handler))
        .route("/models", get(models_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve `state` on `addr` until Ctrl-C
pub async fn start_server(addr: SocketAddr, state: AppState) -> Result<()> {
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("TrOCR service listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutting down..."),
        Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
    }
}
