// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detect request extraction and validation

use axum::extract::{FromRequest, Request};
use axum::http::Method;
use axum_extra::extract::multipart::{Field, Multipart};
use tracing::debug;

use crate::api::errors::ApiError;

/// Multipart field that carries the image
pub const IMAGE_FIELD: &str = "image";

/// Maximum upload size (10MB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// A validated detect request: exactly one non-empty `image` upload
#[derive(Debug, Clone)]
pub struct DetectionRequest {
    /// File name supplied by the client, if any. Never used as a path.
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub image: Vec<u8>,
}

impl DetectionRequest {
    /// Validate and read a detect request
    ///
    /// Checks, in order: the method is POST, the body is a multipart form,
    /// and exactly one non-empty `image` field is present. Nothing touches
    /// the filesystem here.
    pub async fn from_request(request: Request, max_upload_bytes: usize) -> Result<Self, ApiError> {
        if request.method() != Method::POST {
            return Err(ApiError::InvalidRequest(format!(
                "method {} not allowed",
                request.method()
            )));
        }

        let mut multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| ApiError::InvalidRequest(format!("not a multipart form: {}", e)))?;

        let mut upload: Option<Self> = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::InvalidRequest(format!("malformed multipart body: {}", e)))?
        {
            if field.name() != Some(IMAGE_FIELD) {
                debug!("Skipping multipart field {:?}", field.name());
                continue;
            }

            if upload.is_some() {
                return Err(ApiError::InvalidRequest(
                    "more than one image field".to_string(),
                ));
            }

            let file_name = field.file_name().map(str::to_owned);
            let content_type = field.content_type().map(str::to_owned);
            let image = read_field(field, max_upload_bytes).await?;

            if image.is_empty() {
                return Err(ApiError::InvalidRequest("image field is empty".to_string()));
            }

            upload = Some(Self {
                file_name,
                content_type,
                image,
            });
        }

        upload.ok_or_else(|| ApiError::InvalidRequest("no image field".to_string()))
    }
}

/// Read a field's data, failing as soon as it exceeds `limit` bytes
async fn read_field(mut field: Field, limit: usize) -> Result<Vec<u8>, ApiError> {
    let mut data = Vec::new();

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| ApiError::InvalidRequest(format!("failed to read image field: {}", e)))?
    {
        let size = data.len() + chunk.len();
        if size > limit {
            return Err(ApiError::PayloadTooLarge { size, max: limit });
        }
        data.extend_from_slice(&chunk);
    }

    Ok(data)
}
