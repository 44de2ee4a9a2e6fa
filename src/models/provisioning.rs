// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Model weights provisioning
//!
//! Guarantees the detection weights exist locally before the engine loads.
//! A missing file is streamed into a temporary file next to its final
//! location, verified, and only then renamed into place. A failed or
//! unverifiable download never leaves a file at the target path.

use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Where the weights live locally and where to fetch them from
#[derive(Debug, Clone)]
pub struct WeightsSource {
    /// Local path of the weights file
    pub path: PathBuf,
    /// Remote URL served over plain HTTP(S) GET
    pub url: String,
    /// Expected SHA-256 of the file (hex, any case)
    pub sha256: Option<String>,
    /// Timeout for the whole download request
    pub timeout: Duration,
}

/// How the weights came to be available
#[derive(Debug, Clone, PartialEq)]
pub enum ProvisionStatus {
    /// File was already present
    Cached,
    /// File was downloaded during this call
    Downloaded,
}

/// Outcome of a successful `ensure_weights` call
#[derive(Debug, Clone)]
pub struct ProvisionResult {
    pub status: ProvisionStatus,
    pub local_path: PathBuf,
    pub size_bytes: u64,
    /// SHA-256 of the file, computed when downloaded or when verification was requested
    pub checksum: Option<String>,
    pub checksum_verified: bool,
    pub download_time_ms: u64,
}

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Network error fetching {url}: {message}")]
    Network { url: String, message: String },
    #[error("Failed to download model: HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Download size mismatch - expected: {expected} bytes, received: {actual} bytes")]
    SizeMismatch { expected: u64, actual: u64 },
    #[error("Checksum mismatch - expected: {expected}, actual: {actual}")]
    ChecksumMismatch { expected: String, actual: String },
    #[error("Downloaded model file is empty")]
    EmptyDownload,
    #[error("Failed to move model into place: {0}")]
    Persist(String),
}

impl ProvisionError {
    /// Which setting to change for failures the operator can fix
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            ProvisionError::Network { .. } | ProvisionError::HttpStatus { .. } => Some(
                "set MODEL_URL to a reachable ONNX export, or place the weights at MODEL_PATH",
            ),
            ProvisionError::ChecksumMismatch { .. } => {
                Some("check MODEL_SHA256 against the file served at MODEL_URL")
            }
            _ => None,
        }
    }
}

/// Make sure the weights file exists at `source.path`, downloading it if absent
pub async fn ensure_weights(source: &WeightsSource) -> Result<ProvisionResult, ProvisionError> {
    if tokio::fs::try_exists(&source.path).await? {
        return verify_existing(source).await;
    }

    info!(
        "📦 Model weights not found at {}, downloading from {}",
        source.path.display(),
        source.url
    );
    download_weights(source).await
}

async fn verify_existing(source: &WeightsSource) -> Result<ProvisionResult, ProvisionError> {
    let size_bytes = tokio::fs::metadata(&source.path).await?.len();

    let Some(expected) = source.sha256.as_deref() else {
        info!(
            "✅ Using cached model weights at {} ({} bytes)",
            source.path.display(),
            size_bytes
        );
        return Ok(ProvisionResult {
            status: ProvisionStatus::Cached,
            local_path: source.path.clone(),
            size_bytes,
            checksum: None,
            checksum_verified: false,
            download_time_ms: 0,
        });
    };

    let path = source.path.clone();
    let actual = tokio::task::spawn_blocking(move || sha256_file(&path))
        .await
        .map_err(|e| ProvisionError::Io(std::io::Error::other(e)))??;
    check_digest(expected, &actual)?;

    info!(
        "✅ Cached model weights verified at {} (sha256 {})",
        source.path.display(),
        actual
    );
    Ok(ProvisionResult {
        status: ProvisionStatus::Cached,
        local_path: source.path.clone(),
        size_bytes,
        checksum: Some(actual),
        checksum_verified: true,
        download_time_ms: 0,
    })
}

async fn download_weights(source: &WeightsSource) -> Result<ProvisionResult, ProvisionError> {
    let start = Instant::now();
    let parent = match source.path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    tokio::fs::create_dir_all(&parent).await?;

    let client = Client::builder()
        .timeout(source.timeout)
        .build()
        .map_err(|e| network_error(&source.url, e))?;

    let response = client
        .get(&source.url)
        .send()
        .await
        .map_err(|e| network_error(&source.url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ProvisionError::HttpStatus {
            status: status.as_u16(),
            url: source.url.clone(),
        });
    }

    let expected_len = response.content_length();
    let progress = progress_bar(expected_len);

    // Removed on drop unless persisted
    let temp = tempfile::Builder::new()
        .prefix(".weights-")
        .suffix(".part")
        .tempfile_in(&parent)?;
    let (file, temp_path) = temp.into_parts();
    let mut file = tokio::fs::File::from_std(file);

    let mut hasher = Sha256::new();
    let mut received: u64 = 0;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| network_error(&source.url, e))?;
        hasher.update(&chunk);
        file.write_all(&chunk).await?;
        received += chunk.len() as u64;
        progress.set_position(received);
    }

    file.flush().await?;
    file.sync_all().await?;
    drop(file);
    progress.finish_and_clear();

    let checksum = hex::encode(hasher.finalize());
    debug!("Downloaded {} bytes, sha256 {}", received, checksum);

    verify_download(received, expected_len, source.sha256.as_deref(), &checksum)?;

    temp_path
        .persist(&source.path)
        .map_err(|e| ProvisionError::Persist(e.to_string()))?;

    let download_time_ms = start.elapsed().as_millis() as u64;
    info!(
        "✅ Model downloaded to {} ({} bytes in {}ms)",
        source.path.display(),
        received,
        download_time_ms
    );

    Ok(ProvisionResult {
        status: ProvisionStatus::Downloaded,
        local_path: source.path.clone(),
        size_bytes: received,
        checksum: Some(checksum),
        checksum_verified: source.sha256.is_some(),
        download_time_ms,
    })
}

/// Checks a finished download against everything known about it
fn verify_download(
    received: u64,
    expected_len: Option<u64>,
    expected_sha256: Option<&str>,
    actual_sha256: &str,
) -> Result<(), ProvisionError> {
    if received == 0 {
        return Err(ProvisionError::EmptyDownload);
    }

    if let Some(expected) = expected_len {
        if expected != received {
            return Err(ProvisionError::SizeMismatch {
                expected,
                actual: received,
            });
        }
    }

    match expected_sha256 {
        Some(expected) => check_digest(expected, actual_sha256),
        None => {
            warn!("⚠️ No MODEL_SHA256 configured, download verified by size only");
            Ok(())
        }
    }
}

fn check_digest(expected: &str, actual: &str) -> Result<(), ProvisionError> {
    if expected.trim().eq_ignore_ascii_case(actual) {
        Ok(())
    } else {
        Err(ProvisionError::ChecksumMismatch {
            expected: expected.trim().to_lowercase(),
            actual: actual.to_string(),
        })
    }
}

fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

fn network_error(url: &str, err: reqwest::Error) -> ProvisionError {
    ProvisionError::Network {
        url: url.to_string(),
        message: err.to_string(),
    }
}

fn progress_bar(total: Option<u64>) -> ProgressBar {
    match total {
        Some(total) => {
            let bar = ProgressBar::new(total);
            if let Ok(style) = ProgressStyle::with_template(
                "{spinner} [{elapsed_precise}] [{bar:40}] {bytes}/{total_bytes} ({eta})",
            ) {
                bar.set_style(style.progress_chars("=> "));
            }
            bar
        }
        None => ProgressBar::new_spinner(),
    }
}
