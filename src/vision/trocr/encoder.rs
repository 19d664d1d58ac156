// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! TrOCR vision encoder
//!
//! Runs the ViT encoder graph and returns the hidden states the decoder
//! attends over.

use anyhow::{Context, Result};
use ndarray::{Array3, Array4, Ix3};
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::vision::device::{build_session, Device};

/// TrOCR vision encoder model
#[derive(Clone)]
pub struct TrOcrEncoder {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    input_name: String,
    device: Device,
}

impl std::fmt::Debug for TrOcrEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrOcrEncoder")
            .field("input_name", &self.input_name)
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

impl TrOcrEncoder {
    /// Load the encoder graph (`encoder_model.onnx`)
    ///
    /// # Errors
    /// Returns error if the file is missing or ONNX Runtime rejects it.
    pub fn new<P: AsRef<Path>>(model_path: P, device: Device, intra_threads: usize) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("TrOCR encoder model not found: {}", model_path.display());
        }

        info!("Loading TrOCR vision encoder from {}", model_path.display());

        let (session, device) = build_session(model_path, device, intra_threads)?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "pixel_values".to_string());

        debug!("TrOCR encoder input: {}", input_name);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            device,
        })
    }

    /// Device the encoder session runs on
    pub fn device(&self) -> Device {
        self.device
    }

    /// Encode a preprocessed `[1, 3, H, W]` tensor into `[1, seq_len, hidden]`
    pub fn encode(&self, pixel_values: &Array4<f32>) -> Result<Array3<f32>> {
        let shape = pixel_values.shape();
        if shape[0] != 1 || shape[1] != 3 {
            anyhow::bail!("Invalid input shape: {:?}, expected [1, 3, H, W]", shape);
        }

        let input_value =
            Value::from_array(pixel_values.to_owned()).context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("Encoder session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_value])
            .context("Encoder inference failed")?;

        let hidden = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract encoder output")?;

        debug!("Encoder output shape: {:?}", hidden.shape());

        let hidden = hidden
            .to_owned()
            .into_dimensionality::<Ix3>()
            .context("Unexpected encoder output rank, expected [batch, seq_len, hidden]")?;

        Ok(hidden)
    }
}
