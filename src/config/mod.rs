// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Node configuration
//!
//! Every option can be given as a CLI flag or through the matching
//! environment variable (a `.env` file is loaded first by `main`).

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::WeightsSource;
use crate::vision::detection::DetectorConfig;

/// Default location of the exported detection weights
pub const DEFAULT_MODEL_PATH: &str = "./models/best.onnx";

/// Default remote location of the exported detection weights
pub const DEFAULT_MODEL_URL: &str =
    "https://huggingface.co/datasets/Krish619/pcb-model/resolve/main/best.onnx";

/// Default upload limit (10MB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = crate::vision::image_utils::MAX_IMAGE_SIZE;

/// PCB fault detection node
#[derive(Parser, Debug, Clone)]
#[command(name = "pcb-vision-node")]
#[command(about = "Serves PCB fault detection over HTTP", long_about = None)]
pub struct NodeConfig {
    /// Interface to bind the HTTP server to
    #[arg(long, env = "API_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port for the HTTP server
    #[arg(long, env = "API_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Local path of the ONNX detection weights
    #[arg(long, env = "MODEL_PATH", default_value = DEFAULT_MODEL_PATH)]
    pub model_path: PathBuf,

    /// URL the weights are fetched from when missing locally
    #[arg(long, env = "MODEL_URL", default_value = DEFAULT_MODEL_URL)]
    pub model_url: String,

    /// Expected SHA-256 of the weights file (hex)
    #[arg(long, env = "MODEL_SHA256")]
    pub model_sha256: Option<String>,

    /// Timeout for the weights download in seconds
    #[arg(long, env = "MODEL_DOWNLOAD_TIMEOUT_SECS", default_value_t = 600)]
    pub download_timeout_secs: u64,

    /// Minimum class score for a detection to be kept
    #[arg(long, env = "CONFIDENCE_THRESHOLD", default_value_t = 0.25)]
    pub confidence_threshold: f32,

    /// IoU above which same-class boxes are suppressed
    #[arg(long, env = "IOU_THRESHOLD", default_value_t = 0.7)]
    pub iou_threshold: f32,

    /// Maximum detections drawn per image
    #[arg(long, env = "MAX_DETECTIONS", default_value_t = 300)]
    pub max_detections: usize,

    /// Comma-separated class names, used when the model carries none
    #[arg(long, env = "CLASS_NAMES", value_delimiter = ',')]
    pub class_names: Vec<String>,

    /// ONNX Runtime intra-op threads
    #[arg(long, env = "ORT_INTRA_THREADS", default_value_t = 4)]
    pub intra_threads: usize,

    /// Maximum accepted request body in bytes
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,
}

impl NodeConfig {
    /// Address the HTTP listener binds to
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Where the provisioner finds or fetches the weights
    pub fn weights_source(&self) -> WeightsSource {
        WeightsSource {
            path: self.model_path.clone(),
            url: self.model_url.clone(),
            sha256: self.model_sha256.clone(),
            timeout: Duration::from_secs(self.download_timeout_secs),
        }
    }

    /// Detector settings derived from the node options
    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            confidence_threshold: self.confidence_threshold.clamp(0.0, 1.0),
            iou_threshold: self.iou_threshold.clamp(0.0, 1.0),
            max_detections: self.max_detections,
            class_names: self
                .class_names
                .iter()
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect(),
            intra_threads: self.intra_threads.max(1),
        }
    }
}
