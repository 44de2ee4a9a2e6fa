// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Upload to annotated PNG pipeline
//!
//! Each request moves through decode, preprocess, infer, annotate, restore
//! and encode. Any stage failure ends the request with a `PipelineError`;
//! nothing is retried and no partial image is returned.

use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::debug;

use super::detection::{Detection, DetectionEngine};
use super::image_utils::{decode_image_bytes, encode_png, ImageError};
use super::preprocessing::{preprocess_for_detection, restore_dimensions};

/// Stage failures after the upload has been received
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid image: {0}")]
    InvalidImage(#[from] ImageError),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Rendering failed: {0}")]
    Rendering(String),

    #[error("Encoding failed: {0}")]
    Encoding(String),
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct AnnotatedImage {
    /// PNG bytes at the original upload dimensions
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub detections: Vec<Detection>,
    pub processing_time_ms: u64,
}

/// Runs uploads through an injected detection engine
#[derive(Clone)]
pub struct AnnotationPipeline {
    engine: Arc<dyn DetectionEngine>,
    max_image_bytes: usize,
}

impl std::fmt::Debug for AnnotationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnnotationPipeline")
            .field("engine", &self.engine.name())
            .field("max_image_bytes", &self.max_image_bytes)
            .finish()
    }
}

impl AnnotationPipeline {
    pub fn new(engine: Arc<dyn DetectionEngine>, max_image_bytes: usize) -> Self {
        Self {
            engine,
            max_image_bytes,
        }
    }

    pub fn engine(&self) -> &Arc<dyn DetectionEngine> {
        &self.engine
    }

    pub fn max_image_bytes(&self) -> usize {
        self.max_image_bytes
    }

    /// Process one upload. Blocking; call from `spawn_blocking` in async code.
    pub fn run(&self, bytes: &[u8]) -> Result<AnnotatedImage, PipelineError> {
        let start = Instant::now();

        let (image, info) = decode_image_bytes(bytes, self.max_image_bytes)?;
        debug!(
            "Decoded {:?} upload: {}x{}, {} bytes",
            info.format, info.width, info.height, info.size_bytes
        );

        let prepared = preprocess_for_detection(&image);
        drop(image);
        debug!(
            "Preprocessed to {}x{}",
            prepared.width(),
            prepared.height()
        );

        let detections = self
            .engine
            .infer(&prepared)
            .map_err(|e| PipelineError::Inference(format!("{:#}", e)))?;
        debug!("Inference produced {} detections", detections.len());

        let annotated = self
            .engine
            .render(&prepared, &detections)
            .map_err(|e| PipelineError::Rendering(format!("{:#}", e)))?;

        let restored = restore_dimensions(&annotated, info.width, info.height);

        let png = encode_png(&restored).map_err(|e| PipelineError::Encoding(e.to_string()))?;
        debug!("Encoded {} byte PNG", png.len());

        Ok(AnnotatedImage {
            png,
            width: info.width,
            height: info.height,
            detections,
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}
