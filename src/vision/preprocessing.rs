// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for the PCB detector
//!
//! The detector was trained on grayscale boards squashed to a fixed square,
//! so the input is resized to `DETECTION_INPUT_SIZE` without preserving the
//! aspect ratio. The annotated output is stretched back to the original
//! dimensions, which reverses the distortion.

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};
use ndarray::Array4;

/// Side length of the square the detector consumes
pub const DETECTION_INPUT_SIZE: u32 = 640;

/// Bilinear, matching the resize the model was trained with
const RESIZE_FILTER: FilterType = FilterType::Triangle;

/// Convert to grayscale, squash to 640x640 and replicate to three channels
pub fn preprocess_for_detection(image: &DynamicImage) -> RgbImage {
    let gray = image.to_luma8();
    let resized = imageops::resize(
        &gray,
        DETECTION_INPUT_SIZE,
        DETECTION_INPUT_SIZE,
        RESIZE_FILTER,
    );
    DynamicImage::ImageLuma8(resized).to_rgb8()
}

/// Convert an RGB image into a normalized NCHW tensor `[1, 3, H, W]` in 0..1
pub fn to_input_tensor(image: &RgbImage) -> Array4<f32> {
    let (width, height) = image.dimensions();
    let mut tensor = Array4::zeros((1, 3, height as usize, width as usize));

    for (x, y, pixel) in image.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }

    tensor
}

/// Stretch an annotated image back to the original upload dimensions
pub fn restore_dimensions(image: &RgbImage, width: u32, height: u32) -> RgbImage {
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    imageops::resize(image, width, height, RESIZE_FILTER)
}
