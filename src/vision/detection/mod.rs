// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Object detection for PCB fault finding
//!
//! Components:
//! - `postprocess` - YOLO output decoding and non-maximum suppression
//! - `yolo` - ONNX Runtime backed detector
//!
//! The request path only sees the `DetectionEngine` trait, so the engine is
//! constructed once at startup and injected where it is needed.

pub mod postprocess;
pub mod yolo;

use anyhow::Result;
use image::RgbImage;
use serde::{Deserialize, Serialize};

pub use postprocess::{decode_predictions, non_max_suppression, parse_names_metadata, ClassLabels};
pub use yolo::YoloDetector;

/// A detected region in the detector's input pixel space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    /// Class score (0.0-1.0)
    pub confidence: f32,
    pub class_id: usize,
    pub label: String,
}

impl Detection {
    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Intersection over union with another box
    pub fn iou(&self, other: &Detection) -> f32 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);

        let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union = self.area() + other.area() - intersection;

        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }
}

/// Detector tuning
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
    /// Fallback labels when the model carries no `names` metadata
    pub class_names: Vec<String>,
    pub intra_threads: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.25,
            iou_threshold: 0.7,
            max_detections: 300,
            class_names: Vec::new(),
            intra_threads: 4,
        }
    }
}

/// A loaded detection model
///
/// Implementations must tolerate concurrent calls from several requests.
pub trait DetectionEngine: Send + Sync {
    /// Model name for logs
    fn name(&self) -> &str;

    /// Whether the model is loaded and able to serve
    fn is_ready(&self) -> bool;

    /// Run detection on a preprocessed image
    fn infer(&self, image: &RgbImage) -> Result<Vec<Detection>>;

    /// Draw detections onto a copy of `image`
    fn render(&self, image: &RgbImage, detections: &[Detection]) -> Result<RgbImage>;
}
