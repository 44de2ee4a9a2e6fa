// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLO detector backed by ONNX Runtime
//!
//! Loads a YOLOv8-style detector exported to ONNX. The session is created
//! once and shared; runs are serialized through a mutex because a session
//! run needs exclusive access.

use anyhow::{Context, Result};
use image::RgbImage;
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use super::postprocess::{decode_predictions, parse_names_metadata, ClassLabels};
use super::{Detection, DetectionEngine, DetectorConfig};
use crate::vision::preprocessing::to_input_tensor;
use crate::vision::render::Renderer;

/// YOLO detection model
#[derive(Clone)]
pub struct YoloDetector {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    /// Model input name
    input_name: String,
    /// Model name for logs
    name: String,
    config: DetectorConfig,
    labels: ClassLabels,
    renderer: Arc<Renderer>,
    /// Whether model is loaded and ready
    is_ready: bool,
}

impl std::fmt::Debug for YoloDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoloDetector")
            .field("name", &self.name)
            .field("input_name", &self.input_name)
            .field("config", &self.config)
            .field("classes", &self.labels.len())
            .field("is_ready", &self.is_ready)
            .finish_non_exhaustive()
    }
}

impl YoloDetector {
    /// Load the detector from an ONNX file
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - ONNX Runtime initialization fails
    /// - The label font cannot be loaded
    pub fn load<P: AsRef<Path>>(model_path: P, config: DetectorConfig) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Detection model not found: {}", model_path.display());
        }

        info!("Loading detection model from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(config.intra_threads)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load detection model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        if let Some(input) = session.inputs.first() {
            debug!("Detection model input: {} {:?}", input.name, input.input_type);
        }

        let embedded_names = session
            .metadata()
            .ok()
            .and_then(|metadata| metadata.custom("names").ok().flatten())
            .and_then(|raw| parse_names_metadata(&raw));

        let labels = match embedded_names {
            Some(names) => {
                debug!("Using {} class names from model metadata", names.len());
                ClassLabels::new(names)
            }
            None => ClassLabels::new(config.class_names.clone()),
        };
        if labels.is_empty() {
            warn!("⚠️ Model carries no class names and none configured, using class ids");
        }

        let name = model_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "yolo".to_string());

        let renderer = Renderer::new()?;

        info!(
            "✅ Detection model {} loaded ({} classes, CPU-only)",
            name,
            labels.len()
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            name,
            config,
            labels,
            renderer: Arc::new(renderer),
            is_ready: true,
        })
    }
}

impl DetectionEngine for YoloDetector {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_ready(&self) -> bool {
        self.is_ready
    }

    fn infer(&self, image: &RgbImage) -> Result<Vec<Detection>> {
        let (width, height) = image.dimensions();
        let input = to_input_tensor(image);

        let input_value = Value::from_array(input).context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("Detection session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Detection inference failed")?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        debug!("Detection output shape: {:?}", output_tensor.shape());

        decode_predictions(output_tensor.view(), width, height, &self.config, &self.labels)
    }

    fn render(&self, image: &RgbImage, detections: &[Detection]) -> Result<RgbImage> {
        Ok(self.renderer.render(image, detections))
    }
}
