// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection model interface and native result types

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

/// Label used when a class index has no entry in the name table
pub const UNKNOWN_LABEL: &str = "unknown";

/// Shared, immutable table from class index to label
pub type ClassNames = Arc<BTreeMap<u32, String>>;

/// Build a class name table from labels in index order
pub fn class_names<I, S>(labels: I) -> ClassNames
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Arc::new(
        labels
            .into_iter()
            .enumerate()
            .map(|(index, label)| (index as u32, label.into()))
            .collect(),
    )
}

/// Errors raised while loading or running a detection model
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("Detection model not found: {}", .0.display())]
    ModelNotFound(PathBuf),

    #[error("Failed to load detection model: {0}")]
    ModelLoad(String),

    #[error("Invalid class labels: {0}")]
    Labels(String),

    #[error("Failed to decode image: {0}")]
    ImageDecode(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Model returned no result set")]
    NoResult,
}

/// One object found by the model, in the model's native form
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedBox {
    /// Index into the result set's class name table
    pub class_index: u32,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    /// [x_min, y_min, x_max, y_max] in original image pixels
    pub xyxy: [f32; 4],
}

/// Per-image output of one inference call
#[derive(Debug, Clone)]
pub struct ResultSet {
    pub names: ClassNames,
    pub boxes: Vec<DetectedBox>,
}

impl ResultSet {
    pub fn new(names: ClassNames, boxes: Vec<DetectedBox>) -> Self {
        Self { names, boxes }
    }

    /// Resolve a class index to its label
    pub fn label_for(&self, class_index: u32) -> &str {
        match self.names.get(&class_index) {
            Some(label) => label,
            None => {
                warn!("No label for class index {}", class_index);
                UNKNOWN_LABEL
            }
        }
    }
}

/// A loaded object detector.
///
/// Implementations are shared across concurrent requests. Anything that is
/// not safe to call concurrently must be serialized inside the implementation.
#[cfg_attr(test, mockall::automock)]
pub trait DetectionModel: Send + Sync {
    /// Run detection on the image stored at `image_path`
    fn infer(&self, image_path: &Path) -> Result<Vec<ResultSet>, DetectionError>;
}
