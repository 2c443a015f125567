// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Node configuration
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! command line flags and environment variables (see `crate::cli`).

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::detect::DEFAULT_MAX_UPLOAD_BYTES;
use crate::detection::DetectionModelConfig;
use crate::staging::StagingConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the API binds to
    pub listen_addr: String,
    /// Largest accepted image upload, in bytes
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen_addr.parse().map_err(|e| {
            ConfigError::Invalid(format!("listen_addr '{}': {}", self.listen_addr, e))
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub server: ServerConfig,
    pub model: DetectionModelConfig,
    pub staging: StagingConfig,
}

impl NodeConfig {
    /// Load configuration from a TOML file; missing keys keep their defaults
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.socket_addr()?;

        if self.server.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_upload_bytes must be greater than 0".to_string(),
            ));
        }

        let model = &self.model;
        if !(0.0..=1.0).contains(&model.confidence_threshold) {
            return Err(ConfigError::Invalid(format!(
                "confidence_threshold must be within [0, 1], got {}",
                model.confidence_threshold
            )));
        }
        if !(0.0..=1.0).contains(&model.iou_threshold) {
            return Err(ConfigError::Invalid(format!(
                "iou_threshold must be within [0, 1], got {}",
                model.iou_threshold
            )));
        }
        if model.max_detections == 0 {
            return Err(ConfigError::Invalid(
                "max_detections must be greater than 0".to_string(),
            ));
        }
        if model.input_size == 0 || model.input_size % 32 != 0 {
            return Err(ConfigError::Invalid(format!(
                "input_size must be a positive multiple of 32, got {}",
                model.input_size
            )));
        }
        if model.intra_threads == 0 {
            return Err(ConfigError::Invalid(
                "intra_threads must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
