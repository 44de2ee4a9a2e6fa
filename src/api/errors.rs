// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

use crate::vision::{ImageError, PipelineError};

/// JSON body of every failed request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

/// Request failures, each with a fixed status code
///
/// `Display` is the client-facing message.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("No image file provided")]
    MissingInput,

    /// Detail is logged, not returned
    #[error("Invalid image file")]
    InvalidInput(String),

    #[error("Malformed multipart payload: {0}")]
    MalformedPayload(String),

    #[error("Image exceeds the upload limit of {max} bytes")]
    PayloadTooLarge { max: usize },

    #[error("Processing failed: {0}")]
    ModelFailure(String),

    #[error("Processing failed: {0}")]
    EncodingFailure(String),

    #[error("Processing failed: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingInput | ApiError::InvalidInput(_) | ApiError::MalformedPayload(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::ModelFailure(_) | ApiError::EncodingFailure(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            ApiError::InvalidInput(detail) => warn!("❌ Rejected upload: {}", detail),
            _ if status.is_server_error() => error!("❌ Error processing image: {}", self),
            _ => warn!("❌ Rejected request: {}", self),
        }
        (status, Json(self.to_response())).into_response()
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::InvalidImage(ImageError::TooLarge(_, max)) => {
                ApiError::PayloadTooLarge { max }
            }
            PipelineError::InvalidImage(e) => ApiError::InvalidInput(e.to_string()),
            PipelineError::Inference(msg) | PipelineError::Rendering(msg) => {
                ApiError::ModelFailure(msg)
            }
            PipelineError::Encoding(msg) => ApiError::EncodingFailure(msg),
        }
    }
}
