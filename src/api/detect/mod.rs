// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection API endpoint module
//!
//! Provides POST /detect for annotating PCB images with detected faults.

pub mod handler;

pub use handler::{
    detect_handler, read_image_field, DETECTION_COUNT_HEADER, IMAGE_FIELD, PROCESSING_TIME_HEADER,
};
