// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection model manager: the process-wide handle to the loaded detector

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::model::{DetectionError, DetectionModel, ResultSet};
use super::preprocessing::YOLO_INPUT_SIZE;
use super::yolo::YoloOnnxModel;

/// Configuration for loading the detection model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionModelConfig {
    /// Path to the exported ONNX detector
    pub model_path: PathBuf,
    /// Optional labels file; COCO names are used when absent
    pub labels_path: Option<PathBuf>,
    /// Minimum class score kept (0.0-1.0)
    pub confidence_threshold: f32,
    /// IoU above which same-class boxes are suppressed (0.0-1.0)
    pub iou_threshold: f32,
    /// Maximum detections returned per image
    pub max_detections: usize,
    /// Square model input size in pixels
    pub input_size: u32,
    /// ONNX Runtime intra-op threads
    pub intra_threads: usize,
}

impl Default for DetectionModelConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("./models/best.onnx"),
            labels_path: None,
            confidence_threshold: 0.25,
            iou_threshold: 0.7,
            max_detections: 300,
            input_size: YOLO_INPUT_SIZE,
            intra_threads: 4,
        }
    }
}

/// Information about the loaded detection model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionModelInfo {
    /// Model name
    pub name: String,
    /// Where the model was loaded from
    pub source: String,
    /// Number of known classes, when the model reports it
    pub classes: Option<usize>,
    /// When the model was loaded
    pub loaded_at: DateTime<Utc>,
}

/// Owner of the detection model for the lifetime of the process
///
/// Created once at startup and shared through the router state. Requests
/// never load or reload the model.
#[derive(Clone)]
pub struct DetectionModelManager {
    model: Arc<dyn DetectionModel>,
    info: DetectionModelInfo,
}

impl std::fmt::Debug for DetectionModelManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionModelManager")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

impl DetectionModelManager {
    /// Load the YOLO ONNX detector described by `config`
    ///
    /// Session creation is CPU heavy, so it runs on the blocking pool.
    pub async fn load(config: DetectionModelConfig) -> Result<Self, DetectionError> {
        let source = config.model_path.display().to_string();
        let name = model_name(&config.model_path);

        let model = tokio::task::spawn_blocking(move || YoloOnnxModel::load(&config))
            .await
            .map_err(|e| DetectionError::ModelLoad(format!("model loading task failed: {}", e)))??;

        tracing::info!("✅ Detection model '{}' loaded from {}", name, source);

        Ok(Self {
            info: DetectionModelInfo {
                name,
                source,
                classes: Some(model.names().len()),
                loaded_at: Utc::now(),
            },
            model: Arc::new(model),
        })
    }

    /// Wrap an already-constructed model
    pub fn with_model(name: impl Into<String>, model: Arc<dyn DetectionModel>) -> Self {
        let name = name.into();
        Self {
            info: DetectionModelInfo {
                source: format!("injected:{}", name),
                name,
                classes: None,
                loaded_at: Utc::now(),
            },
            model,
        }
    }

    /// Run detection on a staged image
    pub fn infer(&self, image_path: &Path) -> Result<Vec<ResultSet>, DetectionError> {
        self.model.infer(image_path)
    }

    pub fn info(&self) -> &DetectionModelInfo {
        &self.info
    }
}

fn model_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "detector".to_string())
}
