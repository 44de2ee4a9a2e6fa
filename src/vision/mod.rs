// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing for PCB fault detection
//!
//! This module provides:
//! - Upload decoding and PNG encoding
//! - The fixed grayscale 640x640 preprocessing the detector expects
//! - YOLO detection via ONNX Runtime and box rendering
//! - The annotation pipeline tying the stages together
//!
//! Everything runs on CPU.

pub mod detection;
pub mod image_utils;
pub mod pipeline;
pub mod preprocessing;
pub mod render;

pub use detection::{Detection, DetectionEngine, DetectorConfig, YoloDetector};
pub use image_utils::{decode_image_bytes, detect_format, encode_png, ImageError, ImageInfo};
pub use pipeline::{AnnotatedImage, AnnotationPipeline, PipelineError};
pub use preprocessing::{preprocess_for_detection, restore_dimensions, DETECTION_INPUT_SIZE};
pub use render::Renderer;
