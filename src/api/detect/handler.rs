// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection endpoint handler

use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use axum_extra::extract::multipart::{Multipart, MultipartRejection};
use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::api::errors::ApiError;
use crate::api::http_server::AppState;

/// Multipart field carrying the upload
pub const IMAGE_FIELD: &str = "image";

/// Number of detections drawn on the returned image
pub const DETECTION_COUNT_HEADER: &str = "x-detection-count";

/// Server-side processing time in milliseconds
pub const PROCESSING_TIME_HEADER: &str = "x-processing-time-ms";

/// POST /detect - Annotate a PCB image with detected faults
///
/// # Request
/// `multipart/form-data` with the image file in field `image`. Any format
/// the decoder recognises is accepted (PNG, JPEG, WebP, GIF, BMP, TIFF).
///
/// # Response
/// The annotated image as `image/png`, at the upload's original dimensions.
///
/// # Errors
/// - 400 `No image file provided`: no `image` field, or not a multipart body
/// - 400 `Invalid image file`: the bytes do not decode as an image
/// - 413: upload above the configured limit
/// - 500 `Processing failed: ...`: inference, rendering or encoding failed
pub async fn detect_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    // 1. Validate: a non-multipart body has no file parts at all
    let mut multipart = multipart.map_err(|rejection| {
        debug!("Multipart extraction rejected: {}", rejection);
        ApiError::MissingInput
    })?;

    let max_bytes = state.pipeline.max_image_bytes();
    let bytes = read_image_field(&mut multipart, max_bytes).await?;
    debug!("Detect request received: {} bytes", bytes.len());

    // 2. Decode through encode on the blocking pool
    let pipeline = state.pipeline.clone();
    let annotated = tokio::task::spawn_blocking(move || pipeline.run(&bytes))
        .await
        .map_err(|e| ApiError::Internal(format!("Detection task failed: {}", e)))??;

    info!(
        "✅ Detection complete: {} faults, {}x{}, {}ms",
        annotated.detections.len(),
        annotated.width,
        annotated.height,
        annotated.processing_time_ms
    );

    // 3. Respond with the PNG
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("image/png")),
            (
                HeaderName::from_static(DETECTION_COUNT_HEADER),
                HeaderValue::from(annotated.detections.len()),
            ),
            (
                HeaderName::from_static(PROCESSING_TIME_HEADER),
                HeaderValue::from(annotated.processing_time_ms),
            ),
        ],
        annotated.png,
    )
        .into_response())
}

/// Read the first `image` field, skipping any other parts
pub async fn read_image_field(
    multipart: &mut Multipart,
    max_bytes: usize,
) -> Result<Bytes, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            debug!("Skipping multipart field {:?}", field.name());
            continue;
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, max_bytes))?;
        return Ok(data);
    }

    warn!("Detect request without an image field");
    Err(ApiError::MissingInput)
}

fn multipart_error(err: axum_extra::extract::multipart::MultipartError, max: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge { max }
    } else {
        ApiError::MalformedPayload(err.to_string())
    }
}
