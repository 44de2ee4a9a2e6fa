// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Shared helpers: stub engines, image fixtures and multipart bodies

use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    response::Response,
    Router,
};
use image::{ImageFormat, Rgb, RgbImage};
use pcb_vision_node::{
    api::{create_router, AppState},
    vision::{Detection, DetectionEngine, Renderer},
};
use std::io::Cursor;
use std::sync::Arc;

pub const BOUNDARY: &str = "pcb-test-boundary-7MA4YWxkTrZu0gW";

/// Deterministic engine: one fixed "short" box drawn with the real renderer
pub struct StubEngine {
    renderer: Renderer,
    ready: bool,
}

impl StubEngine {
    pub fn new() -> Self {
        Self {
            renderer: Renderer::new().unwrap(),
            ready: true,
        }
    }

    pub fn not_ready() -> Self {
        Self {
            ready: false,
            ..Self::new()
        }
    }
}

impl DetectionEngine for StubEngine {
    fn name(&self) -> &str {
        "stub"
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn infer(&self, image: &RgbImage) -> Result<Vec<Detection>> {
        assert_eq!(image.dimensions(), (640, 640));
        Ok(vec![Detection {
            x1: 100.0,
            y1: 120.0,
            x2: 300.0,
            y2: 360.0,
            confidence: 0.91,
            class_id: 4,
            label: "short".to_string(),
        }])
    }

    fn render(&self, image: &RgbImage, detections: &[Detection]) -> Result<RgbImage> {
        Ok(self.renderer.render(image, detections))
    }
}

/// Engine whose inference always fails
pub struct BrokenEngine;

impl DetectionEngine for BrokenEngine {
    fn name(&self) -> &str {
        "broken"
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn infer(&self, _image: &RgbImage) -> Result<Vec<Detection>> {
        anyhow::bail!("output tensor has unexpected rank")
    }

    fn render(&self, image: &RgbImage, _detections: &[Detection]) -> Result<RgbImage> {
        Ok(image.clone())
    }
}

pub fn app_with(engine: Arc<dyn DetectionEngine>, max_upload_bytes: usize) -> Router {
    create_router(AppState::new(engine, max_upload_bytes))
}

pub fn app() -> Router {
    app_with(Arc::new(StubEngine::new()), 10 * 1024 * 1024)
}

/// Noisy test board so encoders can't collapse it
pub fn board_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            ((x * 7) ^ (y * 13)) as u8,
            ((x * 3 + y * 5) % 251) as u8,
            ((x ^ y) * 11) as u8,
        ])
    })
}

pub fn encode(image: &RgbImage, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, format).unwrap();
    buffer.into_inner()
}

/// multipart/form-data body with one file part
pub fn multipart_body(field: &str, filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn detect_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/detect")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
