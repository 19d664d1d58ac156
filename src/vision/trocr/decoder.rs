// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! TrOCR text decoder
//!
//! Greedy autoregressive generation over the decoder graph, conditioned on
//! the encoder hidden states. The graph has no KV cache inputs, so each step
//! reruns the full prefix.

use anyhow::{Context, Result};
use ndarray::{s, Array2, Array3, Ix3};
use ort::session::Session;
use ort::value::Value;
use serde::Deserialize;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::vision::device::{build_session, Device};

/// `max_length` used by `generate` when no generation config sets one
pub const DEFAULT_MAX_LENGTH: usize = 20;

/// Upper bound accepted for `max_length`
pub const MAX_LENGTH_LIMIT: usize = 512;

/// Token ids and length limits that drive generation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationConfig {
    pub decoder_start_token_id: u32,
    pub eos_token_id: u32,
    pub pad_token_id: u32,
    pub max_length: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        // TrOCR checkpoints start decoding from `</s>` (2) and pad with 1
        Self {
            decoder_start_token_id: 2,
            eos_token_id: 2,
            pad_token_id: 1,
            max_length: DEFAULT_MAX_LENGTH,
        }
    }
}

/// Fields shared by `config.json`, its `decoder` section and `generation_config.json`
#[derive(Debug, Default, Deserialize)]
struct RawGenerationFields {
    decoder_start_token_id: Option<u32>,
    eos_token_id: Option<u32>,
    pad_token_id: Option<u32>,
    max_length: Option<usize>,
    decoder: Option<Box<RawGenerationFields>>,
}

impl RawGenerationFields {
    fn read(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {}", path.display()))
    }

    fn apply(&self, config: &mut GenerationConfig) {
        if let Some(decoder) = &self.decoder {
            decoder.apply(config);
        }
        if let Some(id) = self.decoder_start_token_id {
            config.decoder_start_token_id = id;
        }
        if let Some(id) = self.eos_token_id {
            config.eos_token_id = id;
        }
        if let Some(id) = self.pad_token_id {
            config.pad_token_id = id;
        }
        if let Some(len) = self.max_length {
            config.max_length = len;
        }
    }
}

impl GenerationConfig {
    /// Build from `config.json` and `generation_config.json`, later files win
    pub fn load(model_config: Option<&Path>, generation_config: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();
        for path in [model_config, generation_config].into_iter().flatten() {
            RawGenerationFields::read(path)?.apply(&mut config);
        }
        Ok(config)
    }

    /// Override `max_length`, clamped to a sane range
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length.clamp(2, MAX_LENGTH_LIMIT);
        self
    }
}

/// TrOCR text decoder model
#[derive(Clone)]
pub struct TrOcrDecoder {
    /// ONNX Runtime session for the decoder (thread-safe)
    session: Arc<Mutex<Session>>,
    /// Tokenizer for decoding generated ids
    tokenizer: Arc<Tokenizer>,
    generation: GenerationConfig,
    /// Some exports take an explicit encoder attention mask
    needs_attention_mask: bool,
    device: Device,
}

impl std::fmt::Debug for TrOcrDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrOcrDecoder")
            .field("generation", &self.generation)
            .field("needs_attention_mask", &self.needs_attention_mask)
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

impl TrOcrDecoder {
    /// Load the decoder graph (`decoder_model.onnx`) and its tokenizer
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        tokenizer_path: P,
        generation: GenerationConfig,
        device: Device,
        intra_threads: usize,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();
        let tokenizer_path = tokenizer_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("TrOCR decoder model not found: {}", model_path.display());
        }
        if !tokenizer_path.exists() {
            anyhow::bail!("TrOCR tokenizer not found: {}", tokenizer_path.display());
        }

        info!("Loading TrOCR decoder from {}", model_path.display());

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;
        info!("Loaded tokenizer with {} tokens", tokenizer.get_vocab_size(true));

        let (session, device) = build_session(model_path, device, intra_threads)?;

        let input_names: Vec<_> = session.inputs.iter().map(|i| i.name.as_str()).collect();
        debug!("Decoder inputs: {:?}", input_names);
        let needs_attention_mask = input_names.contains(&"encoder_attention_mask");

        debug!(
            "Special tokens - start: {}, EOS: {}, max_length: {}",
            generation.decoder_start_token_id, generation.eos_token_id, generation.max_length
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            generation,
            needs_attention_mask,
            device,
        })
    }

    pub fn generation_config(&self) -> &GenerationConfig {
        &self.generation
    }

    pub fn device(&self) -> Device {
        self.device
    }

    /// Generate token ids from encoder hidden states `[1, seq_len, hidden]`
    ///
    /// The returned sequence starts with `decoder_start_token_id` and ends
    /// with `eos_token_id` unless `max_length` was reached first.
    pub fn generate_ids(&self, encoder_hidden_states: &Array3<f32>) -> Result<Vec<u32>> {
        let mut tokens = vec![self.generation.decoder_start_token_id];

        while tokens.len() < self.generation.max_length {
            let logits = self.forward(encoder_hidden_states, &tokens)?;
            let next_token = argmax(&logits)?;
            tokens.push(next_token);

            if next_token == self.generation.eos_token_id {
                break;
            }
        }

        debug!("Generation complete: {} total tokens", tokens.len());
        Ok(tokens)
    }

    /// Generate and decode text, skipping special tokens
    pub fn generate(&self, encoder_hidden_states: &Array3<f32>) -> Result<String> {
        let tokens = self.generate_ids(encoder_hidden_states)?;
        self.decode(&tokens)
    }

    /// Decode ids to text with special tokens removed
    pub fn decode(&self, ids: &[u32]) -> Result<String> {
        let text = self
            .tokenizer
            .decode(ids, true)
            .map_err(|e| anyhow::anyhow!("Decoding failed: {}", e))?;
        Ok(text.trim().to_string())
    }

    /// Run one decoder pass and return the logits of the last position
    fn forward(&self, encoder_hidden_states: &Array3<f32>, input_ids: &[u32]) -> Result<Vec<f32>> {
        let ids: Vec<i64> = input_ids.iter().map(|&id| id as i64).collect();
        let input_ids_array = Array2::from_shape_vec((1, ids.len()), ids)
            .context("Failed to create input_ids array")?;

        let input_ids_value =
            Value::from_array(input_ids_array).context("Failed to create input_ids tensor")?;
        let encoder_value = Value::from_array(encoder_hidden_states.to_owned())
            .context("Failed to create encoder hidden states tensor")?;

        let inputs = if self.needs_attention_mask {
            let seq_len = encoder_hidden_states.shape()[1];
            let mask = Value::from_array(Array2::<i64>::ones((1, seq_len)))
                .context("Failed to create encoder attention mask tensor")?;
            ort::inputs![
                "input_ids" => input_ids_value,
                "encoder_hidden_states" => encoder_value,
                "encoder_attention_mask" => mask
            ]
        } else {
            ort::inputs![
                "input_ids" => input_ids_value,
                "encoder_hidden_states" => encoder_value
            ]
        };

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("Decoder session lock poisoned"))?;

        let outputs = session.run(inputs).context("Decoder inference failed")?;

        let logits = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract logits tensor")?;

        let logits = logits
            .to_owned()
            .into_dimensionality::<Ix3>()
            .context("Unexpected logits rank, expected [batch, seq_len, vocab]")?;

        let seq_len = logits.shape()[1];
        if seq_len == 0 {
            anyhow::bail!("Decoder returned no positions");
        }

        Ok(logits.slice(s![0, seq_len - 1, ..]).to_vec())
    }
}

/// Index of the highest logit (greedy decoding)
pub fn argmax(logits: &[f32]) -> Result<u32> {
    let (max_idx, _) = logits
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .ok_or_else(|| anyhow::anyhow!("Empty logits vector"))?;

    Ok(max_idx as u32)
}
