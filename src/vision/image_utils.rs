// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image payload decoding for text extraction
//!
//! Requests carry either raw upload bytes or a base64 string. A base64 string
//! may be prefixed with a data-URL header (`data:image/png;base64,`), in which
//! case everything up to and including the first comma is dropped.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat};
use thiserror::Error;

/// Marker that identifies a data-URL payload
pub const DATA_URL_MARKER: &str = "data:image";

/// Errors raised while turning a request payload into a raster image
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Invalid base64 encoding: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Unsupported image format")]
    UnsupportedFormat,

    #[error("Failed to decode image: {0}")]
    DecodeFailed(String),

    #[error("Image data is empty")]
    EmptyData,
}

/// Image information extracted during loading
#[derive(Debug, Clone)]
pub struct ImageInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Format negotiated by the image crate
    pub format: ImageFormat,
    /// Size of the encoded payload in bytes
    pub size_bytes: usize,
}

/// Strip a data-URL header if present
///
/// Everything up to and including the first comma is removed. A payload that
/// starts with the marker but has no comma is returned unchanged so that the
/// base64 decoder reports it.
pub fn strip_data_url(payload: &str) -> &str {
    let payload = payload.trim();
    if payload.starts_with(DATA_URL_MARKER) {
        if let Some((_, data)) = payload.split_once(',') {
            return data;
        }
    }
    payload
}

/// Decode a base64 string (plain or data-URL prefixed) into raw image bytes
///
/// Whitespace inside the payload is ignored, so line-wrapped (MIME style)
/// base64 decodes the same as a single line.
pub fn decode_base64_payload(payload: &str) -> Result<Vec<u8>, ImageError> {
    let data: String = strip_data_url(payload).split_ascii_whitespace().collect();
    if data.is_empty() {
        return Err(ImageError::EmptyData);
    }

    let bytes = STANDARD.decode(&data)?;
    if bytes.is_empty() {
        return Err(ImageError::EmptyData);
    }
    Ok(bytes)
}

/// Decode a base64-encoded image
///
/// # Example
/// ```ignore
/// let (image, info) = decode_base64_image("data:image/png;base64,iVBORw0KGgo...")?;
/// println!("Image size: {}x{}", info.width, info.height);
/// ```
pub fn decode_base64_image(payload: &str) -> Result<(DynamicImage, ImageInfo), ImageError> {
    let bytes = decode_base64_payload(payload)?;
    decode_image_bytes(&bytes)
}

/// Decode raw image bytes (for multipart uploads)
///
/// The format is guessed from the content, so any raster format the image
/// crate was built with is accepted.
pub fn decode_image_bytes(bytes: &[u8]) -> Result<(DynamicImage, ImageInfo), ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::EmptyData);
    }

    let format = image::guess_format(bytes).map_err(|_| ImageError::UnsupportedFormat)?;

    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| ImageError::DecodeFailed(e.to_string()))?;

    let info = ImageInfo {
        width: img.width(),
        height: img.height(),
        format,
        size_bytes: bytes.len(),
    };

    Ok((img, info))
}
