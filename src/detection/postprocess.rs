// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLO output decoding and non-maximum suppression

use std::cmp::Ordering;

use ndarray::{ArrayViewD, IxDyn};
use tracing::debug;

use super::model::{DetectedBox, DetectionError};
use super::model_manager::DetectionModelConfig;
use super::preprocessing::Letterbox;

/// Thresholds applied to raw model output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostprocessParams {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl From<&DetectionModelConfig> for PostprocessParams {
    fn from(config: &DetectionModelConfig) -> Self {
        Self {
            confidence_threshold: config.confidence_threshold,
            iou_threshold: config.iou_threshold,
            max_detections: config.max_detections,
        }
    }
}

/// Decode a YOLO detection head into boxes in original image coordinates
///
/// Accepts `[1, 4 + nc, anchors]` (the usual export layout) or the
/// transposed `[1, anchors, 4 + nc]`. The first four attributes of each
/// anchor are centre x, centre y, width and height in model input pixels,
/// followed by one score per class.
pub fn decode_predictions(
    output: ArrayViewD<f32>,
    params: &PostprocessParams,
    letterbox: &Letterbox,
) -> Result<Vec<DetectedBox>, DetectionError> {
    let shape = output.shape();
    if shape.len() != 3 || shape[0] != 1 {
        return Err(DetectionError::Inference(format!(
            "Unexpected output shape: {:?}, expected [1, 4 + classes, anchors]",
            shape
        )));
    }

    // Anchors always outnumber attributes in real heads (8400 vs 84)
    let transposed = shape[1] > shape[2];
    let (attrs, anchors) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };

    if attrs <= 4 {
        return Err(DetectionError::Inference(format!(
            "Output has no class scores: {:?}",
            shape
        )));
    }

    let value = |attr: usize, anchor: usize| -> f32 {
        if transposed {
            output[IxDyn(&[0, anchor, attr])]
        } else {
            output[IxDyn(&[0, attr, anchor])]
        }
    };

    let mut candidates = Vec::new();
    for anchor in 0..anchors {
        let (class_index, score) = (4..attrs)
            .map(|attr| (attr - 4, value(attr, anchor)))
            .fold((0usize, f32::MIN), |best, current| {
                if current.1 > best.1 {
                    current
                } else {
                    best
                }
            });

        if score < params.confidence_threshold {
            continue;
        }

        let cx = value(0, anchor);
        let cy = value(1, anchor);
        let half_w = value(2, anchor) / 2.0;
        let half_h = value(3, anchor) / 2.0;

        candidates.push(DetectedBox {
            class_index: class_index as u32,
            confidence: score,
            xyxy: letterbox.to_original([cx - half_w, cy - half_h, cx + half_w, cy + half_h]),
        });
    }

    debug!(
        "{} candidates above {:.2} from {} anchors",
        candidates.len(),
        params.confidence_threshold,
        anchors
    );

    Ok(non_max_suppression(
        candidates,
        params.iou_threshold,
        params.max_detections,
    ))
}

/// Class-aware greedy non-maximum suppression
///
/// Output is ordered by descending confidence and holds at most
/// `max_detections` boxes.
pub fn non_max_suppression(
    mut boxes: Vec<DetectedBox>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<DetectedBox> {
    boxes.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut kept: Vec<DetectedBox> = Vec::new();
    for candidate in boxes {
        if kept.len() >= max_detections {
            break;
        }

        let suppressed = kept.iter().any(|k| {
            k.class_index == candidate.class_index && iou(&k.xyxy, &candidate.xyxy) > iou_threshold
        });

        if !suppressed {
            kept.push(candidate);
        }
    }

    kept
}

/// Intersection over union of two `xyxy` boxes
pub fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
    let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
    let union = area_a + area_b - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}
