// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLO output decoding
//!
//! Exported YOLOv8 detectors emit a single tensor `[1, 4 + classes, anchors]`
//! where the first four rows are box centre/size in input pixels and the
//! remaining rows are per-class scores. Some exports transpose the last two
//! axes; both layouts are accepted.

use anyhow::Result;
use ndarray::{ArrayView2, ArrayViewD, Axis, Ix3};

use super::{Detection, DetectorConfig};

/// Class id to label mapping
#[derive(Debug, Clone, Default)]
pub struct ClassLabels {
    names: Vec<String>,
}

impl ClassLabels {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, class_id: usize) -> String {
        self.names
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("class_{}", class_id))
    }
}

/// Parse the `names` entry Ultralytics writes into exported model metadata
///
/// The value looks like `{0: 'missing_hole', 1: 'mouse_bite'}`. Missing
/// indices are filled with `class_<id>`.
pub fn parse_names_metadata(raw: &str) -> Option<Vec<String>> {
    let body = raw.trim().strip_prefix('{')?.strip_suffix('}')?;

    let mut entries = Vec::new();
    for item in body.split(',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        let (index, name) = item.split_once(':')?;
        let index: usize = index.trim().parse().ok()?;
        let name = name.trim().trim_matches(|c| c == '\'' || c == '"').to_string();
        entries.push((index, name));
    }

    if entries.is_empty() {
        return None;
    }

    let len = entries.iter().map(|(index, _)| index + 1).max().unwrap_or(0);
    let mut names: Vec<String> = (0..len).map(|id| format!("class_{}", id)).collect();
    for (index, name) in entries {
        names[index] = name;
    }
    Some(names)
}

/// Decode raw model output into detections, apply NMS and the detection cap
///
/// `input_width`/`input_height` bound the boxes to the detector's input image.
pub fn decode_predictions(
    output: ArrayViewD<f32>,
    input_width: u32,
    input_height: u32,
    config: &DetectorConfig,
    labels: &ClassLabels,
) -> Result<Vec<Detection>> {
    let output = output
        .into_dimensionality::<Ix3>()
        .map_err(|_| anyhow::anyhow!("Unexpected detector output rank, expected [1, C, N]"))?;

    if output.shape()[0] != 1 {
        anyhow::bail!("Unexpected detector batch size: {}", output.shape()[0]);
    }

    let mut predictions: ArrayView2<f32> = output.index_axis_move(Axis(0), 0);
    // Attributes are always fewer than anchors
    if predictions.nrows() > predictions.ncols() {
        predictions = predictions.reversed_axes();
    }

    let attributes = predictions.nrows();
    if attributes <= 4 {
        anyhow::bail!(
            "Detector output has {} attributes per anchor, expected 4 box values plus class scores",
            attributes
        );
    }

    let max_x = input_width as f32;
    let max_y = input_height as f32;
    let mut candidates = Vec::new();

    for anchor in predictions.columns() {
        let (class_id, confidence) = anchor
            .iter()
            .skip(4)
            .copied()
            .enumerate()
            .fold((0usize, f32::MIN), |best, (id, score)| {
                if score > best.1 {
                    (id, score)
                } else {
                    best
                }
            });

        if confidence < config.confidence_threshold || !confidence.is_finite() {
            continue;
        }

        let (cx, cy, w, h) = (anchor[0], anchor[1], anchor[2], anchor[3]);
        candidates.push(Detection {
            x1: (cx - w / 2.0).clamp(0.0, max_x),
            y1: (cy - h / 2.0).clamp(0.0, max_y),
            x2: (cx + w / 2.0).clamp(0.0, max_x),
            y2: (cy + h / 2.0).clamp(0.0, max_y),
            confidence,
            class_id,
            label: labels.name(class_id),
        });
    }

    let mut detections = non_max_suppression(candidates, config.iou_threshold);
    detections.truncate(config.max_detections);
    Ok(detections)
}

/// Class-aware greedy NMS, result ordered by descending confidence
pub fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for det in detections {
        let suppressed = kept
            .iter()
            .any(|k| k.class_id == det.class_id && k.iou(&det) > iou_threshold);
        if !suppressed {
            kept.push(det);
        }
    }

    kept
}
