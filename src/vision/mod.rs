// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing module
//!
//! This module provides:
//! - Image payload decoding (base64, data URLs, raw bytes)
//! - Compute device selection for ONNX Runtime sessions
//! - TrOCR text recognition

pub mod catalog;
pub mod device;
pub mod image_utils;
pub mod trocr;

pub use catalog::{AVAILABLE_MODELS, DEFAULT_MODEL};
pub use device::{select_device, Device, DevicePreference};
pub use image_utils::{decode_base64_image, decode_image_bytes, ImageError, ImageInfo};
pub use trocr::{ModelFiles, TrOcrModel};
