// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Parser;
use object_detection_node::{
    api::{start_server, AppState},
    cli::Cli,
    detection::DetectionModelManager,
    staging::StagingArea,
    version,
};
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    tracing::info!("🚀 Starting {}", version::get_version_string());

    let cli = Cli::parse();
    let config = cli.load_config()?;

    tracing::info!(
        "🧠 Loading detection model from {}",
        config.model.model_path.display()
    );
    let model = DetectionModelManager::load(config.model.clone())
        .await
        .context("failed to load detection model")?;

    let staging = StagingArea::new(&config.staging.dir)?;
    tracing::info!("📁 Staging uploads in {}", staging.dir().display());

    let addr = config.server.socket_addr()?;
    let state = AppState::new(model, staging, config.server.max_upload_bytes);

    start_server(state, addr).await
}
