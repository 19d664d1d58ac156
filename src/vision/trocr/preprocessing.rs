// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for the TrOCR vision encoder
//!
//! Mirrors the ViT image processor shipped with TrOCR checkpoints: resize to
//! a fixed square, rescale to [0, 1], normalize with mean/std, NCHW layout.

use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::Array4;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Default encoder input size for TrOCR checkpoints
pub const TROCR_INPUT_SIZE: u32 = 384;

/// TrOCR normalization mean
pub const MEAN: [f32; 3] = [0.5, 0.5, 0.5];

/// TrOCR normalization std
pub const STD: [f32; 3] = [0.5, 0.5, 0.5];

/// `size` is either a single edge length or an explicit height/width pair
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ImageSize {
    Square(u32),
    HeightWidth { height: u32, width: u32 },
}

impl ImageSize {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            ImageSize::Square(edge) => (*edge, *edge),
            ImageSize::HeightWidth { height, width } => (*height, *width),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_size() -> ImageSize {
    ImageSize::Square(TROCR_INPUT_SIZE)
}

fn default_mean() -> [f32; 3] {
    MEAN
}

fn default_std() -> [f32; 3] {
    STD
}

fn default_rescale_factor() -> f32 {
    1.0 / 255.0
}

fn default_resample() -> u32 {
    2
}

/// Subset of `preprocessor_config.json` used for inference
#[derive(Debug, Clone, Deserialize)]
pub struct PreprocessorConfig {
    #[serde(default = "default_true")]
    pub do_resize: bool,
    #[serde(default = "default_size")]
    pub size: ImageSize,
    /// PIL resampling filter id (0 nearest, 2 bilinear, 3 bicubic, 1 lanczos)
    #[serde(default = "default_resample")]
    pub resample: u32,
    #[serde(default = "default_true")]
    pub do_rescale: bool,
    #[serde(default = "default_rescale_factor")]
    pub rescale_factor: f32,
    #[serde(default = "default_true")]
    pub do_normalize: bool,
    #[serde(default = "default_mean")]
    pub image_mean: [f32; 3],
    #[serde(default = "default_std")]
    pub image_std: [f32; 3],
}

impl Default for PreprocessorConfig {
    fn default() -> Self {
        Self {
            do_resize: true,
            size: default_size(),
            resample: default_resample(),
            do_rescale: true,
            rescale_factor: default_rescale_factor(),
            do_normalize: true,
            image_mean: MEAN,
            image_std: STD,
        }
    }
}

impl PreprocessorConfig {
    /// Load from `preprocessor_config.json`
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read preprocessor config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Invalid preprocessor config {}", path.display()))
    }

    /// Load from an optional path, falling back to TrOCR defaults
    pub fn from_optional_file(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Target (height, width) of the encoder input
    pub fn target_dimensions(&self) -> (u32, u32) {
        self.size.dimensions()
    }

    fn filter(&self) -> FilterType {
        match self.resample {
            0 => FilterType::Nearest,
            1 => FilterType::Lanczos3,
            3 => FilterType::CatmullRom,
            _ => FilterType::Triangle,
        }
    }

    /// Convert an image into a `[1, 3, H, W]` tensor
    pub fn preprocess(&self, image: &DynamicImage) -> Array4<f32> {
        let rgb = if self.do_resize {
            let (height, width) = self.target_dimensions();
            image.resize_exact(width, height, self.filter()).to_rgb8()
        } else {
            image.to_rgb8()
        };

        let (width, height) = rgb.dimensions();
        let mut tensor = Array4::zeros((1, 3, height as usize, width as usize));

        for (x, y, pixel) in rgb.enumerate_pixels() {
            for c in 0..3 {
                let mut value = pixel[c] as f32;
                if self.do_rescale {
                    value *= self.rescale_factor;
                }
                if self.do_normalize {
                    value = (value - self.image_mean[c]) / self.image_std[c];
                }
                tensor[[0, c, y as usize, x as usize]] = value;
            }
        }

        debug!("Preprocessed {}x{} image to {:?}", image.width(), image.height(), tensor.shape());
        tensor
    }
}
