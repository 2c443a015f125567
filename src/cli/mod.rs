// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use crate::config::NodeConfig;

/// Object Detection Node
#[derive(Parser, Debug, Default)]
#[command(name = "object-detection-node")]
#[command(version)]
#[command(about = "HTTP object detection service backed by a YOLO ONNX model", long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, env = "DETECT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen on (e.g., 0.0.0.0:8080)
    #[arg(long, env = "DETECT_LISTEN_ADDR")]
    pub listen_addr: Option<String>,

    /// Path to the ONNX detection model
    #[arg(long, env = "DETECT_MODEL_PATH")]
    pub model_path: Option<PathBuf>,

    /// Class labels file (defaults to the COCO names)
    #[arg(long, env = "DETECT_LABELS_PATH")]
    pub labels_path: Option<PathBuf>,

    /// Directory uploads are staged in
    #[arg(long, env = "DETECT_STAGING_DIR")]
    pub staging_dir: Option<PathBuf>,

    /// Largest accepted image upload, in bytes
    #[arg(long, env = "DETECT_MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: Option<usize>,

    /// Minimum confidence for a detection (0.0-1.0)
    #[arg(long, env = "DETECT_CONFIDENCE")]
    pub confidence: Option<f32>,

    /// IoU threshold for non-maximum suppression (0.0-1.0)
    #[arg(long, env = "DETECT_IOU")]
    pub iou: Option<f32>,

    /// Maximum detections per image
    #[arg(long, env = "DETECT_MAX_DETECTIONS")]
    pub max_detections: Option<usize>,

    /// ONNX Runtime intra-op threads
    #[arg(long, env = "DETECT_INTRA_THREADS")]
    pub intra_threads: Option<usize>,
}

impl Cli {
    /// Resolve the node configuration
    ///
    /// Defaults, then the config file if one is given, then any flag or
    /// environment variable that was set. The result is validated.
    pub fn load_config(&self) -> Result<NodeConfig> {
        let mut config = match &self.config {
            Some(path) => {
                info!("📄 Loading configuration from {}", path.display());
                NodeConfig::from_toml_file(path)?
            }
            None => NodeConfig::default(),
        };

        self.apply(&mut config);
        config.validate().context("configuration rejected")?;

        Ok(config)
    }

    /// Overlay flags that were set on top of `config`
    pub fn apply(&self, config: &mut NodeConfig) {
        if let Some(addr) = &self.listen_addr {
            config.server.listen_addr = addr.clone();
        }
        if let Some(max) = self.max_upload_bytes {
            config.server.max_upload_bytes = max;
        }
        if let Some(path) = &self.model_path {
            config.model.model_path = path.clone();
        }
        if let Some(path) = &self.labels_path {
            config.model.labels_path = Some(path.clone());
        }
        if let Some(confidence) = self.confidence {
            config.model.confidence_threshold = confidence;
        }
        if let Some(iou) = self.iou {
            config.model.iou_threshold = iou;
        }
        if let Some(max) = self.max_detections {
            config.model.max_detections = max;
        }
        if let Some(threads) = self.intra_threads {
            config.model.intra_threads = threads;
        }
        if let Some(dir) = &self.staging_dir {
            config.staging.dir = dir.clone();
        }
    }
}
