// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! TrOCR model wrapper for line-level text recognition
//!
//! Combines the preprocessor, the vision encoder and the text decoder into a
//! single image-to-text call.

use anyhow::{Context, Result};
use image::DynamicImage;
use std::time::Instant;
use tracing::{debug, info};

use super::decoder::{GenerationConfig, TrOcrDecoder};
use super::encoder::TrOcrEncoder;
use super::files::ModelFiles;
use super::preprocessing::PreprocessorConfig;
use crate::recognition::TextRecognizer;
use crate::vision::device::Device;

/// Loaded TrOCR encoder-decoder pair
#[derive(Clone)]
pub struct TrOcrModel {
    preprocessor: PreprocessorConfig,
    encoder: TrOcrEncoder,
    decoder: TrOcrDecoder,
    device: Device,
}

impl std::fmt::Debug for TrOcrModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrOcrModel")
            .field("device", &self.device)
            .field("generation", self.decoder.generation_config())
            .finish_non_exhaustive()
    }
}

impl TrOcrModel {
    /// Load every component listed in `files`
    ///
    /// Session construction blocks; call from a blocking context.
    ///
    /// # Errors
    /// Returns error if a config file is malformed, the tokenizer cannot be
    /// parsed, or ONNX Runtime rejects either graph.
    pub fn load(
        files: &ModelFiles,
        device: Device,
        intra_threads: usize,
        max_length: Option<usize>,
    ) -> Result<Self> {
        let preprocessor = PreprocessorConfig::from_optional_file(files.preprocessor_config.as_deref())?;

        let mut generation = GenerationConfig::load(
            files.model_config.as_deref(),
            files.generation_config.as_deref(),
        )?;
        if let Some(max_length) = max_length {
            generation = generation.with_max_length(max_length);
        }

        let encoder = TrOcrEncoder::new(&files.encoder, device, intra_threads)
            .context("Failed to load TrOCR encoder")?;
        let decoder = TrOcrDecoder::new(
            &files.decoder,
            &files.tokenizer,
            generation,
            encoder.device(),
            intra_threads,
        )
        .context("Failed to load TrOCR decoder")?;

        // Both sessions must agree; a decoder that fell back to CPU pulls the encoder along
        let (encoder, device) = if decoder.device() != encoder.device() {
            let encoder = TrOcrEncoder::new(&files.encoder, decoder.device(), intra_threads)
                .context("Failed to reload TrOCR encoder")?;
            (encoder, decoder.device())
        } else {
            let device = encoder.device();
            (encoder, device)
        };

        info!("TrOCR pipeline ready on {}", device);

        Ok(Self {
            preprocessor,
            encoder,
            decoder,
            device,
        })
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn generation_config(&self) -> &GenerationConfig {
        self.decoder.generation_config()
    }

    /// Recognize the text in a single line image
    pub fn recognize(&self, image: &DynamicImage) -> Result<String> {
        let start = Instant::now();

        let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
        let pixel_values = self.preprocessor.preprocess(&rgb);

        let hidden = self
            .encoder
            .encode(&pixel_values)
            .context("Failed to encode image")?;
        debug!("Encoded to {:?}", hidden.shape());

        let text = self
            .decoder
            .generate(&hidden)
            .context("Failed to generate text")?;

        info!(
            "Recognized {} chars in {}ms",
            text.chars().count(),
            start.elapsed().as_millis()
        );
        Ok(text)
    }
}

impl TextRecognizer for TrOcrModel {
    fn recognize(&self, image: &DynamicImage) -> Result<String> {
        TrOcrModel::recognize(self, image)
    }
}
