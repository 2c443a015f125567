// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detect endpoint handler

use axum::{
    extract::{Request, State},
    Json,
};
use tracing::{debug, info, warn};

use super::request::DetectionRequest;
use super::response::DetectionResponse;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::detection::DetectionModelManager;
use crate::staging::StagingArea;

/// POST /api/detect/ - Detect objects in an uploaded image
///
/// # Request
/// `multipart/form-data` with exactly one non-empty file field named `image`.
///
/// # Response
/// - `detections`: list of `{class, confidence, box}` in the model's output
///   order, with `box` as `[x_min, y_min, x_max, y_max]`
///
/// # Errors
/// - 400 Bad Request: wrong method, not multipart, missing/empty/duplicate
///   `image` field, or an image the model cannot decode
/// - 413 Payload Too Large: image exceeds the upload limit
/// - 500 Internal Server Error: staging, inference or no result set
pub async fn detect_handler(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<DetectionResponse>, ApiError> {
    let upload = DetectionRequest::from_request(request, state.max_upload_bytes).await?;

    debug!(
        "Detect request received: {} bytes, file name {:?}, content type {:?}",
        upload.image.len(),
        upload.file_name,
        upload.content_type
    );

    let model = state.model.clone();
    let staging = state.staging.clone();

    // Staging, inference and cleanup are blocking work
    let response = tokio::task::spawn_blocking(move || detect_upload(&model, &staging, &upload))
        .await
        .map_err(|e| ApiError::InternalError(format!("detection task failed: {}", e)))??;

    info!("Detection complete: {} objects", response.detections.len());

    Ok(Json(response))
}

/// Stage an upload, run the model on it and remove the staged file
///
/// The staged file is removed on every path out of this function. A
/// failed removal is logged and does not change the outcome.
pub fn detect_upload(
    model: &DetectionModelManager,
    staging: &StagingArea,
    upload: &DetectionRequest,
) -> Result<DetectionResponse, ApiError> {
    let staged = staging.stage(&upload.image, upload.file_name.as_deref())?;
    let request_id = staged.id();
    debug!(%request_id, "Running detection on {}", staged.path().display());

    let outcome = model
        .infer(staged.path())
        .and_then(DetectionResponse::from_results);

    if let Err(e) = staged.cleanup() {
        warn!(%request_id, "Failed to clean up staged image: {}", e);
    }

    outcome.map_err(ApiError::from)
}
