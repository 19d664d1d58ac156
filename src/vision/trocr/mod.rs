// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! TrOCR handwriting and printed text recognition
//!
//! Runs the ONNX export of a TrOCR checkpoint: a ViT image encoder followed
//! by a greedy autoregressive text decoder.

pub mod decoder;
pub mod encoder;
pub mod files;
pub mod model;
pub mod preprocessing;

pub use decoder::{argmax, GenerationConfig, TrOcrDecoder};
pub use encoder::TrOcrEncoder;
pub use files::{default_onnx_repo, ModelFiles};
pub use model::TrOcrModel;
pub use preprocessing::PreprocessorConfig;
