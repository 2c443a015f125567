// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Object detection models
//!
//! This module provides:
//! - The `DetectionModel` interface consumed by the detect endpoint
//! - A YOLO detector running on ONNX Runtime (CPU)
//! - `DetectionModelManager`, the process-wide handle to the loaded model

pub mod labels;
pub mod model;
pub mod model_manager;
pub mod postprocess;
pub mod preprocessing;
pub mod yolo;

pub use labels::{coco_names, load_labels, COCO_CLASSES};
pub use model::{
    class_names, ClassNames, DetectedBox, DetectionError, DetectionModel, ResultSet,
    UNKNOWN_LABEL,
};
pub use model_manager::{DetectionModelConfig, DetectionModelInfo, DetectionModelManager};
pub use yolo::YoloOnnxModel;
