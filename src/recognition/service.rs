// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Recognition service and its startup state

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use super::{
    ExtractError, RecognitionInput, RecognitionResult, TextRecognizer, CONFIDENCE_PLACEHOLDER,
};
use crate::config::ServiceConfig;
use crate::vision::trocr::{ModelFiles, TrOcrModel};
use crate::vision::{decode_base64_image, decode_image_bytes, select_device, Device};

/// A loaded model bound to a device
pub struct RecognitionService {
    recognizer: Arc<dyn TextRecognizer>,
    model_name: String,
    device: Device,
    /// Bounds how many generations run at once
    gate: Arc<Semaphore>,
}

impl std::fmt::Debug for RecognitionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecognitionService")
            .field("model_name", &self.model_name)
            .field("device", &self.device)
            .field("available_permits", &self.gate.available_permits())
            .finish_non_exhaustive()
    }
}

impl RecognitionService {
    /// Resolve, download if needed, and load the configured model
    ///
    /// # Errors
    /// Propagates any failure while locating files or building sessions.
    pub async fn initialize(config: &ServiceConfig) -> Result<Self> {
        let start = Instant::now();
        info!("Initializing TrOCR service with model {}", config.model);

        let files = ModelFiles::resolve(
            &config.model,
            &config.onnx_repo(),
            &config.models_dir,
            config.offline,
        )
        .await
        .with_context(|| format!("Failed to locate model files for {}", config.model))?;
        debug!("Model files: {:?}", files);

        let device = select_device(config.device);
        info!("Using device: {}", device);

        let intra_threads = config.intra_threads;
        let max_length = config.max_length;
        let model = tokio::task::spawn_blocking(move || {
            TrOcrModel::load(&files, device, intra_threads, max_length)
        })
        .await
        .context("Model loading task failed")??;

        let device = model.device();
        info!(
            "TrOCR service ready: {} on {} ({}ms)",
            config.model,
            device,
            start.elapsed().as_millis()
        );

        Ok(Self::from_recognizer(
            Arc::new(model),
            config.model.clone(),
            device,
            config.max_concurrent_inferences,
        ))
    }

    /// Wrap an already loaded recognizer
    pub fn from_recognizer(
        recognizer: Arc<dyn TextRecognizer>,
        model_name: impl Into<String>,
        device: Device,
        max_concurrent_inferences: usize,
    ) -> Self {
        Self {
            recognizer,
            model_name: model_name.into(),
            device,
            gate: Arc::new(Semaphore::new(max_concurrent_inferences.max(1))),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn device(&self) -> Device {
        self.device
    }

    /// Decode the payload and run recognition on it
    pub async fn extract_text(
        &self,
        input: RecognitionInput,
    ) -> Result<RecognitionResult, ExtractError> {
        let decoded = match &input {
            RecognitionInput::Bytes(bytes) => decode_image_bytes(bytes),
            RecognitionInput::Base64(payload) => decode_base64_image(payload),
        };
        let (image, info) = decoded.map_err(|e| {
            warn!("Failed to decode image: {}", e);
            ExtractError::Decode(e)
        })?;

        debug!(
            "Decoded {:?} image: {}x{}, {} bytes",
            info.format, info.width, info.height, info.size_bytes
        );

        // The permit moves into the blocking task so it is held until
        // generation finishes, even if this future is dropped first
        let permit = Arc::clone(&self.gate)
            .acquire_owned()
            .await
            .map_err(|_| ExtractError::Inference("Inference gate closed".to_string()))?;

        let recognizer = Arc::clone(&self.recognizer);
        let text = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            recognizer.recognize(&image)
        })
        .await
        .map_err(|e| {
            error!("Inference task failed: {}", e);
            ExtractError::Inference(format!("Inference task failed: {}", e))
        })?
        .map_err(|e| {
            error!("Text extraction failed: {:#}", e);
            ExtractError::from(e)
        })?;

        Ok(RecognitionResult {
            text,
            confidence: CONFIDENCE_PLACEHOLDER,
            model: self.model_name.clone(),
            device: self.device,
        })
    }
}

/// Result of startup, fixed for the lifetime of the process
#[derive(Debug, Clone)]
pub enum ServiceState {
    Ready(Arc<RecognitionService>),
    Unavailable { reason: String },
}

impl ServiceState {
    /// Convert the outcome of [`RecognitionService::initialize`]
    pub fn from_init(result: Result<RecognitionService>) -> Self {
        match result {
            Ok(service) => ServiceState::Ready(Arc::new(service)),
            Err(e) => {
                error!("Failed to initialize TrOCR service: {:#}", e);
                ServiceState::Unavailable {
                    reason: format!("{:#}", e),
                }
            }
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        ServiceState::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn service(&self) -> Option<&Arc<RecognitionService>> {
        match self {
            ServiceState::Ready(service) => Some(service),
            ServiceState::Unavailable { .. } => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.service().is_some()
    }

    pub fn model_name(&self) -> Option<&str> {
        self.service().map(|s| s.model_name())
    }

    pub fn device(&self) -> Option<Device> {
        self.service().map(|s| s.device())
    }

    /// Extract text, failing fast when the model never loaded
    pub async fn extract_text(
        &self,
        input: RecognitionInput,
    ) -> Result<RecognitionResult, ExtractError> {
        match self {
            ServiceState::Ready(service) => service.extract_text(input).await,
            ServiceState::Unavailable { reason } => {
                debug!("Rejecting extraction, service unavailable: {}", reason);
                Err(ExtractError::Unavailable)
            }
        }
    }
}
