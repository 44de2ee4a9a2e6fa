// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP client commands

use anyhow::{Context, Result};
use clap::Args;
use reqwest::multipart::{Form, Part};
use std::path::PathBuf;
use std::time::Duration;

use crate::api::detect::{DETECTION_COUNT_HEADER, IMAGE_FIELD, PROCESSING_TIME_HEADER};
use crate::api::{ErrorResponse, HealthResponse};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Args, Debug)]
pub struct DetectArgs {
    /// Image to upload
    #[arg(long)]
    pub image: PathBuf,

    /// Where to save the annotated PNG
    #[arg(long, default_value = "result.png")]
    pub output: PathBuf,
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")
}

pub async fn check_health(base_url: &str) -> Result<()> {
    let url = endpoint(base_url, "health");
    let response = http_client()?
        .get(&url)
        .send()
        .await
        .with_context(|| format!("Failed to reach {}", url))?;

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("Health check failed with HTTP {}", status);
    }

    let health: HealthResponse = response
        .json()
        .await
        .context("Unexpected health response")?;

    println!("✅ Health check: {} {}", status.as_u16(), health.status);
    println!("   Model loaded: {}", health.model_loaded);
    Ok(())
}

pub async fn detect(base_url: &str, args: DetectArgs) -> Result<()> {
    let bytes = tokio::fs::read(&args.image)
        .await
        .with_context(|| format!("Failed to read {}", args.image.display()))?;

    let file_name = args
        .image
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());

    let form = Form::new().part(IMAGE_FIELD, Part::bytes(bytes).file_name(file_name));

    let url = endpoint(base_url, "detect");
    let response = http_client()?
        .post(&url)
        .multipart(form)
        .send()
        .await
        .with_context(|| format!("Failed to reach {}", url))?;

    let status = response.status();
    println!("✅ Detect response: {}", status.as_u16());

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error)
            .unwrap_or(body);
        anyhow::bail!("Detection failed (HTTP {}): {}", status.as_u16(), message);
    }

    let header = |name: &str| {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let detections = header(DETECTION_COUNT_HEADER);
    let elapsed = header(PROCESSING_TIME_HEADER);

    let png = response.bytes().await.context("Failed to read response body")?;
    tokio::fs::write(&args.output, &png)
        .await
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    println!("💾 Saved result as {}", args.output.display());
    if let (Some(detections), Some(elapsed)) = (detections, elapsed) {
        println!("   {} faults found in {}ms", detections, elapsed);
    }
    Ok(())
}
