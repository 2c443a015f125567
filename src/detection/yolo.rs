// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLO object detector running on ONNX Runtime
//!
//! Expects a detector exported to ONNX with a single `[1, 3, S, S]` input
//! and a `[1, 4 + classes, anchors]` output head.

use anyhow::{Context, Result};
use image::{DynamicImage, ImageReader};
use ndarray::Array4;
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::labels::{coco_names, load_labels};
use super::model::{ClassNames, DetectedBox, DetectionError, DetectionModel, ResultSet};
use super::model_manager::DetectionModelConfig;
use super::postprocess::{decode_predictions, PostprocessParams};
use super::preprocessing::{preprocess_for_detection, Letterbox};

/// YOLO detection model
///
/// The ONNX session sits behind a mutex, so concurrent requests run
/// inference one at a time.
#[derive(Clone)]
pub struct YoloOnnxModel {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    /// Model input name
    input_name: String,
    /// Square input size in pixels
    input_size: u32,
    params: PostprocessParams,
    names: ClassNames,
}

impl std::fmt::Debug for YoloOnnxModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoloOnnxModel")
            .field("input_name", &self.input_name)
            .field("input_size", &self.input_size)
            .field("params", &self.params)
            .field("classes", &self.names.len())
            .finish_non_exhaustive()
    }
}

impl YoloOnnxModel {
    /// Load a YOLO detector from the configured ONNX file
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - Labels file cannot be parsed
    /// - ONNX Runtime initialization fails
    pub fn load(config: &DetectionModelConfig) -> Result<Self, DetectionError> {
        let model_path = config.model_path.as_path();
        if !model_path.exists() {
            return Err(DetectionError::ModelNotFound(model_path.to_path_buf()));
        }

        let names = match config.labels_path {
            Some(ref path) => load_labels(path)?,
            None => coco_names(),
        };

        info!("Loading detection model from {}", model_path.display());

        let session = build_session(model_path, config.intra_threads)
            .map_err(|e| DetectionError::ModelLoad(format!("{:#}", e)))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        if let Some(input) = session.inputs.first() {
            debug!("Detection model input {}: {:?}", input_name, input.input_type);
        }

        info!(
            "✅ Detection model loaded ({} classes, input {}x{})",
            names.len(),
            config.input_size,
            config.input_size
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            input_size: config.input_size,
            params: PostprocessParams::from(config),
            names,
        })
    }

    /// Class names reported with every result set
    pub fn names(&self) -> &ClassNames {
        &self.names
    }

    /// Run the detector on an already-decoded image
    pub fn detect(&self, image: &DynamicImage) -> Result<Vec<DetectedBox>, DetectionError> {
        let (tensor, letterbox) = preprocess_for_detection(image, self.input_size);
        self.run(tensor, &letterbox)
    }

    fn run(&self, input: Array4<f32>, letterbox: &Letterbox) -> Result<Vec<DetectedBox>, DetectionError> {
        let input_value = Value::from_array(input)
            .context("Failed to create input tensor")
            .map_err(inference_error)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| DetectionError::Inference("detection session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Detection inference failed")
            .map_err(inference_error)?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")
            .map_err(inference_error)?;

        debug!("Detection output shape: {:?}", output_tensor.shape());

        decode_predictions(output_tensor.view(), &self.params, letterbox)
    }
}

impl DetectionModel for YoloOnnxModel {
    fn infer(&self, image_path: &Path) -> Result<Vec<ResultSet>, DetectionError> {
        let image = open_image(image_path)?;
        debug!(
            "Decoded {}: {}x{}",
            image_path.display(),
            image.width(),
            image.height()
        );

        let boxes = self.detect(&image)?;
        Ok(vec![ResultSet::new(self.names.clone(), boxes)])
    }
}

fn build_session(model_path: &Path, intra_threads: usize) -> Result<Session> {
    let session = Session::builder()
        .context("Failed to create session builder")?
        .with_execution_providers([CPUExecutionProvider::default().build()])
        .context("Failed to set CPU execution provider")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(intra_threads)
        .context("Failed to set intra threads")?
        .commit_from_file(model_path)
        .with_context(|| format!("Failed to load detection model from {}", model_path.display()))?;
    Ok(session)
}

/// Decode an image file, detecting the format from its content
pub fn open_image(path: &Path) -> Result<DynamicImage, DetectionError> {
    ImageReader::open(path)
        .map_err(|e| DetectionError::ImageDecode(e.to_string()))?
        .with_guessed_format()
        .map_err(|e| DetectionError::ImageDecode(e.to_string()))?
        .decode()
        .map_err(|e| DetectionError::ImageDecode(e.to_string()))
}

fn inference_error(e: anyhow::Error) -> DetectionError {
    DetectionError::Inference(format!("{:#}", e))
}
