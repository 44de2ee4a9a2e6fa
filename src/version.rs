// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the PCB Vision Node

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-pcb-fault-detection-2026-10-18";

/// Semantic version number
pub const VERSION_NUMBER: &str = "0.1.0";

/// Build date
pub const BUILD_DATE: &str = "2026-10-18";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "yolo-onnx",
    "multipart-upload",
    "annotated-png",
    "verified-model-download",
    "health-check",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("PCB Vision Node {} ({})", VERSION_NUMBER, BUILD_DATE)
}
