// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::DefaultBodyLimit,
    routing::{any, get},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::{detect_handler, health_handler};
use crate::detection::DetectionModelManager;
use crate::staging::StagingArea;

/// Shared state handed to every request
#[derive(Clone)]
pub struct AppState {
    pub model: Arc<DetectionModelManager>,
    pub staging: Arc<StagingArea>,
    /// Largest accepted `image` field, in bytes
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(model: DetectionModelManager, staging: StagingArea, max_upload_bytes: usize) -> Self {
        Self {
            model: Arc::new(model),
            staging: Arc::new(staging),
            max_upload_bytes,
        }
    }
}

/// Room left in a request body for multipart headers and small extra fields
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the router
///
/// The detect routes accept any method so that a wrong method gets the
/// endpoint's own 400 response. The image limit itself is enforced by the
/// handler while the field streams in, so it can answer 413; the body limit
/// here only bounds what else a client may send alongside it.
pub fn create_app(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(
        state
            .max_upload_bytes
            .saturating_mul(2)
            .saturating_add(MULTIPART_OVERHEAD_BYTES),
    );

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/detect/", any(detect_handler))
        .route("/api/detect", any(detect_handler))
        .layer(body_limit)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("🌐 Detection API listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining in-flight requests");
}
