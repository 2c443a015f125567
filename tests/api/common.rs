// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Shared helpers for the HTTP tests: stub models, multipart bodies and a
//! router backed by a temporary staging directory.

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use object_detection_node::{
    api::http_server::{create_app, AppState},
    detection::{
        class_names, DetectedBox, DetectionError, DetectionModel, DetectionModelManager,
        ResultSet,
    },
    staging::StagingArea,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

pub const BOUNDARY: &str = "detect-test-boundary";
pub const TEST_MAX_UPLOAD_BYTES: usize = 1024;

/// Stub model driven by a closure
pub struct FnModel<F> {
    infer: F,
    calls: Arc<AtomicUsize>,
}

impl<F> FnModel<F>
where
    F: Fn(&Path) -> Result<Vec<ResultSet>, DetectionError> + Send + Sync,
{
    pub fn new(infer: F) -> Self {
        Self {
            infer,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Counter of `infer` calls, readable after the model moves into the app
    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

impl<F> DetectionModel for FnModel<F>
where
    F: Fn(&Path) -> Result<Vec<ResultSet>, DetectionError> + Send + Sync,
{
    fn infer(&self, image_path: &Path) -> Result<Vec<ResultSet>, DetectionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.infer)(image_path)
    }
}

/// Router plus the staging directory it writes to
pub struct TestNode {
    pub app: Router,
    pub staging_dir: PathBuf,
    _root: TempDir,
}

impl TestNode {
    pub fn new(model: impl DetectionModel + 'static) -> Self {
        Self::with_limit(model, TEST_MAX_UPLOAD_BYTES)
    }

    pub fn with_limit(model: impl DetectionModel + 'static, max_upload_bytes: usize) -> Self {
        let root = tempfile::tempdir().unwrap();
        let staging_dir = root.path().join("staging");
        let staging = StagingArea::new(&staging_dir).unwrap();
        let manager = DetectionModelManager::with_model("stub", Arc::new(model));
        let app = create_app(AppState::new(manager, staging, max_upload_bytes));

        Self {
            app,
            staging_dir,
            _root: root,
        }
    }

    /// Number of files currently staged
    pub fn staged_files(&self) -> usize {
        std::fs::read_dir(&self.staging_dir).unwrap().count()
    }
}

/// One multipart part: field name, optional file name, data
pub type Part<'a> = (&'a str, Option<&'a str>, &'a [u8]);

pub fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, file_name, data) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        let disposition = match file_name {
            Some(file_name) => format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                name, file_name
            ),
            None => format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name),
        };
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_request(method: Method, uri: &str, parts: &[Part]) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

/// POST /api/detect/ with a single `image` file field
pub fn image_request(file_name: &str, data: &[u8]) -> Request<Body> {
    multipart_request(
        Method::POST,
        "/api/detect/",
        &[("image", Some(file_name), data)],
    )
}

pub async fn json_body(response: Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn cat_result() -> ResultSet {
    ResultSet::new(
        class_names(["cat"]),
        vec![DetectedBox {
            class_index: 0,
            confidence: 0.87,
            xyxy: [10.0, 20.0, 110.0, 220.0],
        }],
    )
}
