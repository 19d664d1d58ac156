// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Parser;
use std::env;
use tracing::info;
use trocr_service::{
    api::{start_server, AppState},
    config::ServiceConfig,
    recognition::{RecognitionService, ServiceState},
    version,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let config = ServiceConfig::parse();
    config.validate()?;

    info!("Starting {}", version::get_version_string());
    info!(
        "Model: {} (ONNX export: {}), device preference: {:?}",
        config.model,
        config.onnx_repo(),
        config.device
    );

    // A failed load leaves the service up but unhealthy
    let service = ServiceState::from_init(RecognitionService::initialize(&config).await);

    let state = AppState::new(service).with_max_upload_bytes(config.max_upload_bytes);
    start_server(config.bind_addr()?, state).await
}
