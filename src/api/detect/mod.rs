// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Object detection API endpoint module
//!
//! Provides POST /api/detect/ for finding objects in an uploaded image.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::{detect_handler, detect_upload};
pub use request::{DetectionRequest, DEFAULT_MAX_UPLOAD_BYTES, IMAGE_FIELD};
pub use response::{Detection, DetectionResponse};
