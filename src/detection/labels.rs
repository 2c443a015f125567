// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Class label tables for detection models

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use super::model::{class_names, ClassNames, DetectionError};

/// COCO dataset class names, used when no labels file is configured
pub const COCO_CLASSES: [&str; 80] = [
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];

/// Class names for the COCO-trained detectors
pub fn coco_names() -> ClassNames {
    class_names(COCO_CLASSES)
}

/// Load class names from a labels file
///
/// Each non-blank line is either `name` or `index: name`. Lines starting
/// with `#` are comments. Plain names take the next running index.
pub fn load_labels(path: &Path) -> Result<ClassNames, DetectionError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        DetectionError::Labels(format!("cannot read {}: {}", path.display(), e))
    })?;
    parse_labels(&text)
}

/// Parse the contents of a labels file
pub fn parse_labels(text: &str) -> Result<ClassNames, DetectionError> {
    let mut names = BTreeMap::new();
    let mut next_index = 0u32;

    for (line_no, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (index, name) = match line.split_once(':') {
            Some((index, name))
                if !index.trim().is_empty() && index.trim().chars().all(|c| c.is_ascii_digit()) =>
            {
                let index = index.trim().parse::<u32>().map_err(|e| {
                    DetectionError::Labels(format!("line {}: bad index: {}", line_no + 1, e))
                })?;
                (index, name)
            }
            _ => (next_index, line),
        };

        let name = name.trim().trim_matches(|c| c == '"' || c == '\'');
        if name.is_empty() {
            return Err(DetectionError::Labels(format!(
                "line {}: empty class name",
                line_no + 1
            )));
        }

        names.insert(index, name.to_string());
        next_index = index.checked_add(1).ok_or_else(|| {
            DetectionError::Labels(format!("line {}: class index too large", line_no + 1))
        })?;
    }

    if names.is_empty() {
        return Err(DetectionError::Labels("no class names found".to_string()));
    }

    Ok(Arc::new(names))
}
