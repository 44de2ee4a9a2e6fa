// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod config;
pub mod models;
pub mod version;
pub mod vision;

pub use api::{create_router, start_server, ApiError, AppState};
pub use config::NodeConfig;
pub use models::{ensure_weights, ProvisionError, ProvisionResult, WeightsSource};
pub use vision::{
    AnnotatedImage, AnnotationPipeline, Detection, DetectionEngine, DetectorConfig, YoloDetector,
};
