// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detect response types

use serde::{Deserialize, Serialize};

use crate::detection::{DetectionError, ResultSet};

/// A detected object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Class label
    pub class: String,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    /// [x_min, y_min, x_max, y_max] in image pixels
    #[serde(rename = "box")]
    pub bbox: [f32; 4],
}

/// Response from object detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResponse {
    /// Detections in the model's output order
    pub detections: Vec<Detection>,
}

impl DetectionResponse {
    /// Build the response from the first result set the model returned
    ///
    /// Any further result sets are ignored. An empty list of result sets
    /// is an error, while a result set with no boxes is a valid empty
    /// response.
    pub fn from_results(results: Vec<ResultSet>) -> Result<Self, DetectionError> {
        let result = results.into_iter().next().ok_or(DetectionError::NoResult)?;

        let detections = result
            .boxes
            .iter()
            .map(|b| Detection {
                class: result.label_for(b.class_index).to_string(),
                confidence: b.confidence,
                bbox: b.xyxy,
            })
            .collect();

        Ok(Self { detections })
    }
}
