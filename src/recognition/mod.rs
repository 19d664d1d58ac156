// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text recognition service
//!
//! Owns the loaded recognizer and turns request payloads into
//! [`RecognitionResult`]s. The HTTP layer only ever sees [`ServiceState`].

pub mod error;
pub mod service;

pub use error::{ExtractError, SERVICE_UNAVAILABLE_MESSAGE};
pub use service::{RecognitionService, ServiceState};

use image::DynamicImage;
use serde::Serialize;

use crate::vision::Device;

/// Reported for every result; TrOCR generation does not expose a calibrated score
pub const CONFIDENCE_PLACEHOLDER: f32 = 0.85;

/// Anything that can turn a line image into text
///
/// Implementations are called from a blocking worker thread.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image: &DynamicImage) -> anyhow::Result<String>;
}

/// Image payload of a single extraction request
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionInput {
    /// Encoded image bytes from a multipart upload
    Bytes(Vec<u8>),
    /// Base64 string, optionally data-URL prefixed
    Base64(String),
}

/// Outcome of one extraction request
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecognitionResult {
    pub text: String,
    pub confidence: f32,
    pub model: String,
    pub device: Device,
}
