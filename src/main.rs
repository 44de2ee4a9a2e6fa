// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Parser;
use pcb_vision_node::{
    api::{start_server, AppState},
    config::NodeConfig,
    models::{ensure_weights, ProvisionStatus},
    vision::{DetectionEngine, YoloDetector},
};
use std::{env, net::SocketAddr, sync::Arc};
use tracing::error;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    println!("🚀 Starting PCB Vision Node...\n");
    println!("📦 BUILD VERSION: {}", pcb_vision_node::version::VERSION);
    println!("📅 Build Date: {}", pcb_vision_node::version::BUILD_DATE);
    println!();

    let config = NodeConfig::parse();
    let addr: SocketAddr = config
        .listen_addr()
        .parse()
        .with_context(|| format!("Invalid listen address {}", config.listen_addr()))?;

    // Weights must be on disk before the server accepts requests
    println!("📦 Checking detection weights at {}...", config.model_path.display());
    let source = config.weights_source();
    let provisioned = match ensure_weights(&source).await {
        Ok(provisioned) => provisioned,
        Err(e) => {
            error!("❌ Could not provision weights from {}: {}", source.url, e);
            if let Some(hint) = e.hint() {
                error!("   Hint: {}", hint);
            }
            return Err(anyhow::Error::new(e).context("Failed to provision detection weights"));
        }
    };

    match provisioned.status {
        ProvisionStatus::Cached => println!(
            "✅ Using cached weights ({} bytes, checksum verified: {})",
            provisioned.size_bytes, provisioned.checksum_verified
        ),
        ProvisionStatus::Downloaded => println!(
            "✅ Weights downloaded in {}ms ({} bytes)",
            provisioned.download_time_ms, provisioned.size_bytes
        ),
    }

    // Session creation is CPU heavy
    println!("🧠 Loading detection model...");
    let model_path = provisioned.local_path.clone();
    let detector_config = config.detector_config();
    let detector = tokio::task::spawn_blocking(move || {
        YoloDetector::load(&model_path, detector_config)
    })
    .await
    .context("Model loading task panicked")??;
    println!("✅ Detection model ready: {}", detector.name());

    let engine: Arc<dyn DetectionEngine> = Arc::new(detector);
    let state = AppState::new(engine, config.max_upload_bytes);

    println!("🌐 Serving on http://{}", addr);
    println!("   GET  /health");
    println!("   POST /detect (multipart field 'image')");
    println!();

    start_server(addr, state).await
}
