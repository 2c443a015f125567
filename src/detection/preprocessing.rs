// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for YOLO detectors

use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use ndarray::Array4;

/// Default square input size for exported YOLO models
pub const YOLO_INPUT_SIZE: u32 = 640;

/// Grey used for letterbox padding
pub const PAD_VALUE: u8 = 114;

/// Geometry of a letterbox resize, used to map boxes back to the original image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub orig_width: u32,
    pub orig_height: u32,
    /// Size of the scaled image inside the padded square
    pub scaled_width: u32,
    pub scaled_height: u32,
}

impl Letterbox {
    /// Compute the letterbox fitting `orig_width` x `orig_height` into a
    /// `target_size` square with aspect ratio preserved
    pub fn new(orig_width: u32, orig_height: u32, target_size: u32) -> Self {
        if orig_width == 0 || orig_height == 0 {
            return Self {
                scale: 1.0,
                pad_x: 0.0,
                pad_y: 0.0,
                orig_width,
                orig_height,
                scaled_width: 0,
                scaled_height: 0,
            };
        }

        let scale = (target_size as f32 / orig_width as f32)
            .min(target_size as f32 / orig_height as f32);

        let scaled_width = ((orig_width as f32 * scale).round() as u32).clamp(1, target_size);
        let scaled_height = ((orig_height as f32 * scale).round() as u32).clamp(1, target_size);

        Self {
            scale,
            pad_x: ((target_size - scaled_width) / 2) as f32,
            pad_y: ((target_size - scaled_height) / 2) as f32,
            orig_width,
            orig_height,
            scaled_width,
            scaled_height,
        }
    }

    /// Map an `xyxy` box from model input space to original image pixels
    pub fn to_original(&self, xyxy: [f32; 4]) -> [f32; 4] {
        let max_x = self.orig_width as f32;
        let max_y = self.orig_height as f32;
        [
            ((xyxy[0] - self.pad_x) / self.scale).clamp(0.0, max_x),
            ((xyxy[1] - self.pad_y) / self.scale).clamp(0.0, max_y),
            ((xyxy[2] - self.pad_x) / self.scale).clamp(0.0, max_x),
            ((xyxy[3] - self.pad_y) / self.scale).clamp(0.0, max_y),
        ]
    }
}

/// Resize into a grey square, preserving aspect ratio and centring the image
pub fn letterbox_image(image: &DynamicImage, target_size: u32) -> (RgbImage, Letterbox) {
    let (orig_w, orig_h) = image.dimensions();
    let letterbox = Letterbox::new(orig_w, orig_h, target_size);

    let mut output = RgbImage::from_pixel(
        target_size,
        target_size,
        Rgb([PAD_VALUE, PAD_VALUE, PAD_VALUE]),
    );

    if letterbox.scaled_width == 0 || letterbox.scaled_height == 0 {
        return (output, letterbox);
    }

    let resized = image
        .resize_exact(
            letterbox.scaled_width,
            letterbox.scaled_height,
            image::imageops::FilterType::Triangle,
        )
        .to_rgb8();

    image::imageops::replace(
        &mut output,
        &resized,
        letterbox.pad_x as i64,
        letterbox.pad_y as i64,
    );

    (output, letterbox)
}

/// Preprocess an image for YOLO detection
///
/// Steps:
/// 1. Letterbox to `target_size` x `target_size`
/// 2. Scale pixels to [0, 1]
/// 3. Convert to NCHW tensor format [1, 3, H, W]
pub fn preprocess_for_detection(image: &DynamicImage, target_size: u32) -> (Array4<f32>, Letterbox) {
    let (rgb, letterbox) = letterbox_image(image, target_size);
    let size = target_size as usize;

    let mut tensor = Array4::zeros((1, 3, size, size));
    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }

    (tensor, letterbox)
}
