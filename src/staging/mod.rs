// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Temporary on-disk staging of uploaded images
//!
//! Every upload is written under a name derived from a fresh request id,
//! never from the client's file name, so concurrent uploads of `photo.jpg`
//! cannot collide. A `StagedImage` removes its file when cleaned up or
//! dropped, on every exit path.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::TempPath;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Extension used when the client file name has none we can use
pub const DEFAULT_EXTENSION: &str = "bin";

const MAX_EXTENSION_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("Failed to create staging directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write staged image: {0}")]
    Write(#[source] std::io::Error),

    #[error("Failed to remove staged image {}: {source}", .path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Staging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingConfig {
    /// Directory uploads are written to
    pub dir: PathBuf,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            dir: std::env::temp_dir().join("object-detection-node"),
        }
    }
}

/// Directory that holds staged uploads
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    /// Use `dir` for staging, creating it if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StagingError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| StagingError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` to a uniquely named file in the staging directory
    ///
    /// Only the extension of `original_name` is kept, sanitized, so the
    /// decoder sees a familiar suffix.
    pub fn stage(&self, bytes: &[u8], original_name: Option<&str>) -> Result<StagedImage, StagingError> {
        let id = Uuid::new_v4();
        let extension = original_name
            .and_then(sanitized_extension)
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

        let prefix = format!("{}-", id);
        let suffix = format!(".{}", extension);
        let mut file = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(&suffix)
            .rand_bytes(6)
            .tempfile_in(&self.dir)
            .map_err(StagingError::Write)?;

        file.write_all(bytes).map_err(StagingError::Write)?;
        file.flush().map_err(StagingError::Write)?;

        // Close our handle so the model can open the file on any platform
        let path = file.into_temp_path();
        debug!("Staged {} bytes at {}", bytes.len(), path.display());

        Ok(StagedImage { id, path })
    }
}

/// An uploaded image on disk, owned by one request
///
/// The file is deleted by `cleanup`, or silently on drop if `cleanup` was
/// never reached.
#[derive(Debug)]
pub struct StagedImage {
    id: Uuid,
    path: TempPath,
}

impl StagedImage {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the staged file, reporting failure
    pub fn cleanup(self) -> Result<(), StagingError> {
        let path = self.path.to_path_buf();
        self.path
            .close()
            .map_err(|source| StagingError::Remove { path, source })
    }
}

fn sanitized_extension(file_name: &str) -> Option<String> {
    let extension = Path::new(file_name).extension()?.to_str()?;
    if extension.is_empty()
        || extension.len() > MAX_EXTENSION_LEN
        || !extension.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(extension.to_ascii_lowercase())
}
