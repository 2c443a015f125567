// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{error, warn};

use crate::detection::DetectionError;
use crate::staging::StagingError;

/// Error body: the only shape returned on failure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    /// Wrong method, not multipart, missing or empty `image` field
    InvalidRequest(String),
    PayloadTooLarge {
        size: usize,
        max: usize,
    },
    InvalidImage(String),
    StagingFailed(String),
    InferenceFailed(String),
    NoResult,
    InternalError(String),
}

impl ApiError {
    /// Short message returned to the client. Details stay in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            ApiError::InvalidRequest(_) => "Invalid request",
            ApiError::PayloadTooLarge { .. } => "Image too large",
            ApiError::InvalidImage(_) => "Invalid image",
            ApiError::StagingFailed(_) => "Failed to stage upload",
            ApiError::InferenceFailed(_) => "Inference failed",
            ApiError::NoResult => "No result",
            ApiError::InternalError(_) => "Internal error",
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.public_message().to_string(),
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::InvalidRequest(_) | ApiError::InvalidImage(_) => 400,
            ApiError::PayloadTooLarge { .. } => 413,
            ApiError::StagingFailed(_)
            | ApiError::InferenceFailed(_)
            | ApiError::NoResult
            | ApiError::InternalError(_) => 500,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::PayloadTooLarge { size, max } => {
                write!(f, "Image is {} bytes (max: {} bytes)", size, max)
            }
            ApiError::InvalidImage(msg) => write!(f, "Invalid image: {}", msg),
            ApiError::StagingFailed(msg) => write!(f, "Staging failed: {}", msg),
            ApiError::InferenceFailed(msg) => write!(f, "Inference failed: {}", msg),
            ApiError::NoResult => write!(f, "Model returned no result set"),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<DetectionError> for ApiError {
    fn from(err: DetectionError) -> Self {
        match err {
            DetectionError::ImageDecode(msg) => ApiError::InvalidImage(msg),
            DetectionError::NoResult => ApiError::NoResult,
            other => ApiError::InferenceFailed(other.to_string()),
        }
    }
}

impl From<StagingError> for ApiError {
    fn from(err: StagingError) -> Self {
        ApiError::StagingFailed(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!("{}", self);
        } else {
            warn!("{}", self);
        }

        (status, Json(self.to_response())).into_response()
    }
}
