// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Detect endpoint tests
//!
//! These tests drive POST /api/detect/ through the full router and check:
//! - The response shape for successful detections
//! - Request validation happens before anything is staged
//! - Model failures map to the right status and error body
//! - The staged upload is gone after every request

use super::common::*;
use axum::http::{Method, Request, StatusCode};
use axum::body::Body;
use object_detection_node::detection::{class_names, DetectionError, ResultSet};
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use tower::util::ServiceExt; // for `oneshot`

#[tokio::test]
async fn test_detect_returns_exact_json() {
    let node = TestNode::new(FnModel::new(|_| Ok(vec![cat_result()])));

    let response = node
        .app
        .clone()
        .oneshot(image_request("photo.jpg", b"jpeg-bytes"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({"detections": [{"class": "cat", "confidence": 0.87, "box": [10.0, 20.0, 110.0, 220.0]}]})
    );
    assert_eq!(node.staged_files(), 0);
}

#[tokio::test]
async fn test_model_reads_staged_copy_of_upload() {
    let seen: Arc<Mutex<Option<(PathBuf, Vec<u8>)>>> = Arc::new(Mutex::new(None));
    let seen_by_model = seen.clone();
    let node = TestNode::new(FnModel::new(move |path| {
        let data = std::fs::read(path).unwrap();
        *seen_by_model.lock().unwrap() = Some((path.to_path_buf(), data));
        Ok(vec![cat_result()])
    }));

    let response = node
        .app
        .clone()
        .oneshot(image_request("../../photo.JPG", b"jpeg-bytes"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (path, data) = seen.lock().unwrap().clone().unwrap();
    assert_eq!(data, b"jpeg-bytes");
    assert_eq!(path.parent().unwrap(), node.staging_dir.as_path());
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("jpg"));
    assert!(!path.file_name().unwrap().to_string_lossy().contains("photo"));
    assert!(!path.exists());
}

#[tokio::test]
async fn test_route_without_trailing_slash() {
    let node = TestNode::new(FnModel::new(|_| Ok(vec![cat_result()])));

    let response = node
        .app
        .clone()
        .oneshot(multipart_request(
            Method::POST,
            "/api/detect",
            &[("image", Some("photo.jpg"), b"jpeg-bytes")],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_get_is_invalid_request() {
    let model = FnModel::new(|_| Ok(vec![cat_result()]));
    let calls = model.calls();
    let node = TestNode::new(model);

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/detect/")
        .body(Body::empty())
        .unwrap();
    let response = node.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await, json!({"error": "Invalid request"}));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_image_field() {
    let model = FnModel::new(|_| Ok(vec![cat_result()]));
    let calls = model.calls();
    let node = TestNode::new(model);

    let response = node
        .app
        .clone()
        .oneshot(multipart_request(
            Method::POST,
            "/api/detect/",
            &[("file", Some("photo.jpg"), b"jpeg-bytes")],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await, json!({"error": "Invalid request"}));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(node.staged_files(), 0);
}

#[tokio::test]
async fn test_empty_image_field() {
    let model = FnModel::new(|_| Ok(vec![cat_result()]));
    let calls = model.calls();
    let node = TestNode::new(model);

    let response = node
        .app
        .clone()
        .oneshot(image_request("photo.jpg", b""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await, json!({"error": "Invalid request"}));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(node.staged_files(), 0);
}

#[tokio::test]
async fn test_non_multipart_post() {
    let node = TestNode::new(FnModel::new(|_| Ok(vec![cat_result()])));

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/detect/")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"image": "aGVsbG8="}"#))
        .unwrap();
    let response = node.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await, json!({"error": "Invalid request"}));
    assert_eq!(node.staged_files(), 0);
}

#[tokio::test]
async fn test_duplicate_image_fields() {
    let model = FnModel::new(|_| Ok(vec![cat_result()]));
    let calls = model.calls();
    let node = TestNode::new(model);

    let response = node
        .app
        .clone()
        .oneshot(multipart_request(
            Method::POST,
            "/api/detect/",
            &[
                ("image", Some("a.jpg"), b"first"),
                ("image", Some("b.jpg"), b"second"),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_oversized_upload() {
    let model = FnModel::new(|_| Ok(vec![cat_result()]));
    let calls = model.calls();
    let node = TestNode::with_limit(model, 16);

    let response = node
        .app
        .clone()
        .oneshot(image_request("big.jpg", &[0xAB; 64]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json_body(response).await, json!({"error": "Image too large"}));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(node.staged_files(), 0);
}

#[tokio::test]
async fn test_inference_failure_removes_staged_file() {
    let seen: Arc<Mutex<Option<PathBuf>>> = Arc::new(Mutex::new(None));
    let seen_by_model = seen.clone();
    let node = TestNode::new(FnModel::new(move |path| {
        assert!(path.exists());
        *seen_by_model.lock().unwrap() = Some(path.to_path_buf());
        Err(DetectionError::Inference("output tensor missing".to_string()))
    }));

    let response = node
        .app
        .clone()
        .oneshot(image_request("photo.jpg", b"jpeg-bytes"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await, json!({"error": "Inference failed"}));

    let path = seen.lock().unwrap().clone().unwrap();
    assert!(!path.exists());
    assert_eq!(node.staged_files(), 0);
}

#[tokio::test]
async fn test_failed_cleanup_keeps_successful_response() {
    // The model removes the staged file itself, so cleanup has nothing to delete
    let node = TestNode::new(FnModel::new(|path| {
        std::fs::remove_file(path).unwrap();
        Ok(vec![cat_result()])
    }));

    let response = node
        .app
        .clone()
        .oneshot(image_request("photo.jpg", b"jpeg-bytes"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({"detections": [{"class": "cat", "confidence": 0.87, "box": [10.0, 20.0, 110.0, 220.0]}]})
    );
    assert_eq!(node.staged_files(), 0);
}

#[tokio::test]
async fn test_undecodable_image() {
    let node = TestNode::new(FnModel::new(|_| {
        Err(DetectionError::ImageDecode("unsupported format".to_string()))
    }));

    let response = node
        .app
        .clone()
        .oneshot(image_request("notes.txt", b"plain text, not pixels"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await, json!({"error": "Invalid image"}));
    assert_eq!(node.staged_files(), 0);
}

#[tokio::test]
async fn test_no_result_set() {
    let node = TestNode::new(FnModel::new(|_| Ok(vec![])));

    let response = node
        .app
        .clone()
        .oneshot(image_request("photo.jpg", b"jpeg-bytes"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await, json!({"error": "No result"}));
    assert_eq!(node.staged_files(), 0);
}

#[tokio::test]
async fn test_empty_result_set() {
    let node = TestNode::new(FnModel::new(|_| {
        Ok(vec![ResultSet::new(class_names(["cat"]), vec![])])
    }));

    let response = node
        .app
        .clone()
        .oneshot(image_request("photo.jpg", b"jpeg-bytes"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({"detections": []}));
}

#[tokio::test]
async fn test_panicking_model() {
    let node = TestNode::new(FnModel::new(|_| -> Result<Vec<ResultSet>, DetectionError> {
        panic!("native library crashed")
    }));

    let response = node
        .app
        .clone()
        .oneshot(image_request("photo.jpg", b"jpeg-bytes"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await, json!({"error": "Internal error"}));
    assert_eq!(node.staged_files(), 0);
}

#[tokio::test]
async fn test_staging_failure() {
    let model = FnModel::new(|_| Ok(vec![cat_result()]));
    let calls = model.calls();
    let node = TestNode::new(model);
    std::fs::remove_dir_all(&node.staging_dir).unwrap();

    let response = node
        .app
        .clone()
        .oneshot(image_request("photo.jpg", b"jpeg-bytes"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(response).await,
        json!({"error": "Failed to stage upload"})
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_other_form_fields_are_ignored() {
    let node = TestNode::new(FnModel::new(|_| Ok(vec![cat_result()])));

    let response = node
        .app
        .clone()
        .oneshot(multipart_request(
            Method::POST,
            "/api/detect/",
            &[
                ("caption", None, b"my cat"),
                ("image", Some("photo.jpg"), b"jpeg-bytes"),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["detections"][0]["class"], "cat");
}
