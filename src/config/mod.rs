// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service configuration from CLI flags and `TROCR_*` environment variables

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::warn;

use crate::vision::catalog::{is_known_model, DEFAULT_MODEL};
use crate::vision::trocr::default_onnx_repo;
use crate::vision::DevicePreference;

/// Default request body limit (16 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// TrOCR text extraction service
#[derive(Parser, Debug, Clone)]
#[command(name = "trocr-service")]
#[command(version)]
#[command(about = "HTTP service for handwritten and printed text recognition", long_about = None)]
pub struct ServiceConfig {
    /// Interface to bind
    #[arg(long, env = "TROCR_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "TROCR_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Pretrained model name
    #[arg(long, env = "TROCR_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Hub repository holding the ONNX export (derived from the model name if unset)
    #[arg(long, env = "TROCR_ONNX_REPO")]
    pub onnx_repo: Option<String>,

    /// Directory searched for local model files
    #[arg(long, env = "TROCR_MODELS_DIR", default_value = "./models")]
    pub models_dir: PathBuf,

    /// auto, cpu, cuda or cuda:N
    #[arg(long, env = "TROCR_DEVICE", default_value = "auto")]
    pub device: DevicePreference,

    /// Never download from the Hugging Face Hub
    #[arg(long, env = "TROCR_OFFLINE")]
    pub offline: bool,

    /// Maximum generated sequence length, including the start token
    #[arg(long, env = "TROCR_MAX_LENGTH")]
    pub max_length: Option<usize>,

    /// Number of generations allowed to run at once
    #[arg(long, env = "TROCR_MAX_CONCURRENT_INFERENCES", default_value_t = 1)]
    pub max_concurrent_inferences: usize,

    /// Maximum request body size in bytes
    #[arg(long, env = "TROCR_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,

    /// ONNX Runtime intra-op threads per session
    #[arg(long, env = "TROCR_INTRA_THREADS", default_value_t = 4)]
    pub intra_threads: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            model: DEFAULT_MODEL.to_string(),
            onnx_repo: None,
            models_dir: PathBuf::from("./models"),
            device: DevicePreference::Auto,
            offline: false,
            max_length: None,
            max_concurrent_inferences: 1,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            intra_threads: 4,
        }
    }
}

impl ServiceConfig {
    /// Reject values that would leave the service unusable
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            anyhow::bail!("model name must not be empty");
        }
        if self.max_concurrent_inferences == 0 {
            anyhow::bail!("max_concurrent_inferences must be at least 1");
        }
        if self.intra_threads == 0 {
            anyhow::bail!("intra_threads must be at least 1");
        }
        if self.max_upload_bytes == 0 {
            anyhow::bail!("max_upload_bytes must be greater than 0");
        }
        if let Some(max_length) = self.max_length {
            if max_length < 2 {
                anyhow::bail!("max_length must be at least 2");
            }
        }
        if !is_known_model(&self.model) {
            warn!("Model {} is not in the advertised catalog", self.model);
        }
        Ok(())
    }

    /// ONNX export repository to resolve files from
    pub fn onnx_repo(&self) -> String {
        self.onnx_repo
            .clone()
            .unwrap_or_else(|| default_onnx_repo(&self.model))
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid bind address {}:{}", self.host, self.port))
    }
}
