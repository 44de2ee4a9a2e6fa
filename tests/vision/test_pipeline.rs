// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Annotation pipeline tests
//!
//! A recording engine captures what the detector is handed so the fixed
//! preprocessing contract can be checked from outside.

use anyhow::Result;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use pcb_vision_node::vision::{
    AnnotationPipeline, Detection, DetectionEngine, ImageError, PipelineError,
    DETECTION_INPUT_SIZE,
};
use std::io::Cursor;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct RecordingEngine {
    seen: Mutex<Vec<RgbImage>>,
}

impl DetectionEngine for RecordingEngine {
    fn name(&self) -> &str {
        "recording"
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn infer(&self, image: &RgbImage) -> Result<Vec<Detection>> {
        self.seen.lock().unwrap().push(image.clone());
        Ok(Vec::new())
    }

    fn render(&self, image: &RgbImage, _detections: &[Detection]) -> Result<RgbImage> {
        Ok(image.clone())
    }
}

struct BadRenderEngine;

impl DetectionEngine for BadRenderEngine {
    fn name(&self) -> &str {
        "bad-render"
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn infer(&self, _image: &RgbImage) -> Result<Vec<Detection>> {
        Ok(Vec::new())
    }

    fn render(&self, _image: &RgbImage, _detections: &[Detection]) -> Result<RgbImage> {
        anyhow::bail!("font missing")
    }
}

fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, format).unwrap();
    buffer.into_inner()
}

/// Tag a JPEG with an EXIF Orientation value
fn with_exif_orientation(jpeg: &[u8], orientation: u8) -> Vec<u8> {
    let mut app1 = vec![0xFF, 0xE1, 0x00, 0x22];
    app1.extend_from_slice(b"Exif\0\0");
    app1.extend_from_slice(&[0x4D, 0x4D, 0x00, 0x2A, 0x00, 0x00, 0x00, 0x08]);
    app1.extend_from_slice(&[0x00, 0x01, 0x01, 0x12, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01]);
    app1.extend_from_slice(&[0x00, orientation, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);

    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&app1);
    out.extend_from_slice(&jpeg[2..]);
    out
}

fn pipeline(engine: Arc<dyn DetectionEngine>) -> AnnotationPipeline {
    AnnotationPipeline::new(engine, 10 * 1024 * 1024)
}

#[test]
fn test_engine_sees_gray_640_square() {
    let engine = Arc::new(RecordingEngine::default());
    let colourful = RgbImage::from_fn(123, 45, |x, y| Rgb([x as u8 * 2, y as u8 * 5, 250]));
    let png = encode(DynamicImage::ImageRgb8(colourful), ImageFormat::Png);

    let result = pipeline(engine.clone()).run(&png).unwrap();

    let seen = engine.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(
        seen[0].dimensions(),
        (DETECTION_INPUT_SIZE, DETECTION_INPUT_SIZE)
    );
    assert!(seen[0].pixels().all(|p| p[0] == p[1] && p[1] == p[2]));

    assert_eq!((result.width, result.height), (123, 45));
    assert!(result.detections.is_empty());
}

#[test]
fn test_output_is_png_at_original_size() {
    let engine = Arc::new(RecordingEngine::default());
    let jpeg = encode(
        DynamicImage::ImageRgb8(RgbImage::from_pixel(300, 200, Rgb([90, 140, 60]))),
        ImageFormat::Jpeg,
    );

    let result = pipeline(engine).run(&jpeg).unwrap();

    assert_eq!(&result.png[..4], &[0x89, 0x50, 0x4E, 0x47]);
    let decoded = image::load_from_memory(&result.png).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (300, 200));
}

#[test]
fn test_transparent_png_is_accepted() {
    let engine = Arc::new(RecordingEngine::default());
    let rgba = RgbaImage::from_pixel(20, 10, Rgba([10, 200, 30, 0]));
    let png = encode(DynamicImage::ImageRgba8(rgba), ImageFormat::Png);

    let result = pipeline(engine).run(&png).unwrap();
    assert_eq!((result.width, result.height), (20, 10));
}

#[test]
fn test_single_pixel_image() {
    let engine = Arc::new(RecordingEngine::default());
    let png = encode(
        DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([255, 0, 0]))),
        ImageFormat::Png,
    );

    let result = pipeline(engine).run(&png).unwrap();
    assert_eq!((result.width, result.height), (1, 1));
}

#[test]
fn test_garbage_never_reaches_engine() {
    let engine = Arc::new(RecordingEngine::default());

    let err = pipeline(engine.clone())
        .run(b"\x89PNG but not really")
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::InvalidImage(ImageError::DecodeFailed(_))
    ));
    assert!(engine.seen.lock().unwrap().is_empty());
}

#[test]
fn test_render_failure_is_reported() {
    let png = encode(
        DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([0, 0, 0]))),
        ImageFormat::Png,
    );

    let err = pipeline(Arc::new(BadRenderEngine)).run(&png).unwrap_err();
    assert!(matches!(err, PipelineError::Rendering(_)));
    assert!(err.to_string().contains("font missing"));
}

/// A phone photo stored landscape but tagged "rotate 90" is processed upright
#[test]
fn test_exif_rotated_jpeg_is_processed_upright() {
    let engine = Arc::new(RecordingEngine::default());
    let stored = RgbImage::from_fn(300, 200, |x, _| {
        if x < 150 {
            Rgb([20, 20, 20])
        } else {
            Rgb([230, 230, 230])
        }
    });
    let jpeg = with_exif_orientation(
        &encode(DynamicImage::ImageRgb8(stored), ImageFormat::Jpeg),
        6,
    );

    let result = pipeline(engine.clone()).run(&jpeg).unwrap();

    assert_eq!((result.width, result.height), (200, 300));
    let decoded = image::load_from_memory(&result.png).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (200, 300));

    // Rotated 90 clockwise: the dark left half of the stored frame is now on top
    let seen = engine.seen.lock().unwrap();
    assert!(seen[0].get_pixel(320, 100)[0] < 100);
    assert!(seen[0].get_pixel(320, 540)[0] > 150);
}
