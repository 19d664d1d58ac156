// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Locating the ONNX export of a TrOCR checkpoint
//!
//! Files are looked up under the local models directory first. When they are
//! missing and downloads are allowed, the export is fetched from the
//! Hugging Face Hub into the hub cache.

use anyhow::{Context, Result};
use hf_hub::api::tokio::{Api, ApiRepo};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Candidate names for the vision encoder graph
pub const ENCODER_FILES: &[&str] = &["encoder_model.onnx", "onnx/encoder_model.onnx"];

/// Candidate names for the text decoder graph
pub const DECODER_FILES: &[&str] = &["decoder_model.onnx", "onnx/decoder_model.onnx"];

pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const PREPROCESSOR_CONFIG_FILE: &str = "preprocessor_config.json";
pub const MODEL_CONFIG_FILE: &str = "config.json";
pub const GENERATION_CONFIG_FILE: &str = "generation_config.json";

/// Paths of everything needed to run a TrOCR model
#[derive(Debug, Clone, PartialEq)]
pub struct ModelFiles {
    pub encoder: PathBuf,
    pub decoder: PathBuf,
    pub tokenizer: PathBuf,
    pub preprocessor_config: Option<PathBuf>,
    pub model_config: Option<PathBuf>,
    pub generation_config: Option<PathBuf>,
}

/// Default ONNX export repository for a model name
///
/// The `microsoft/trocr-*` checkpoints are published as PyTorch weights; their
/// ONNX exports live under `Xenova/`.
pub fn default_onnx_repo(model_name: &str) -> String {
    match model_name.strip_prefix("microsoft/") {
        Some(rest) if rest.starts_with("trocr-") => format!("Xenova/{}", rest),
        _ => model_name.to_string(),
    }
}

/// Directory name used for a repository under the models directory
pub fn local_dir_name(repo: &str) -> String {
    repo.replace('/', "--")
}

/// Find a model file by trying multiple possible names
fn find_file(dir: &Path, names: &[&str]) -> Option<PathBuf> {
    names.iter().map(|name| dir.join(name)).find(|p| p.exists())
}

fn find_required(dir: &Path, names: &[&str]) -> Result<PathBuf> {
    find_file(dir, names).ok_or_else(|| {
        anyhow::anyhow!(
            "Model file not found in {}. Tried: {:?}",
            dir.display(),
            names
        )
    })
}

impl ModelFiles {
    /// Collect model files from a local directory
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            anyhow::bail!("Model directory not found: {}", dir.display());
        }

        Ok(Self {
            encoder: find_required(dir, ENCODER_FILES)?,
            decoder: find_required(dir, DECODER_FILES)?,
            tokenizer: find_required(dir, &[TOKENIZER_FILE])?,
            preprocessor_config: find_file(dir, &[PREPROCESSOR_CONFIG_FILE]),
            model_config: find_file(dir, &[MODEL_CONFIG_FILE]),
            generation_config: find_file(dir, &[GENERATION_CONFIG_FILE]),
        })
    }

    /// Resolve model files for `model_name`
    ///
    /// Lookup order: `<models_dir>/<model_name>`, `<models_dir>/<onnx_repo>`,
    /// then the hub repository `onnx_repo` unless `offline`.
    pub async fn resolve(
        model_name: &str,
        onnx_repo: &str,
        models_dir: &Path,
        offline: bool,
    ) -> Result<Self> {
        let mut candidates = vec![models_dir.join(local_dir_name(model_name))];
        if onnx_repo != model_name {
            candidates.push(models_dir.join(local_dir_name(onnx_repo)));
        }

        for dir in &candidates {
            if !dir.is_dir() {
                continue;
            }
            match Self::from_dir(dir) {
                Ok(files) => {
                    info!("Using local model files from {}", dir.display());
                    return Ok(files);
                }
                Err(e) => warn!("Incomplete model directory {}: {}", dir.display(), e),
            }
        }

        if offline {
            anyhow::bail!(
                "Model '{}' not found under {} and downloads are disabled",
                model_name,
                models_dir.display()
            );
        }

        Self::download(onnx_repo).await
    }

    /// Fetch the ONNX export from the Hugging Face Hub
    pub async fn download(repo_id: &str) -> Result<Self> {
        info!("Fetching {} from the Hugging Face Hub (first run may take a few minutes)", repo_id);

        let api = Api::new().context("Failed to initialize Hugging Face Hub client")?;
        let repo = api.model(repo_id.to_string());

        let encoder = fetch_first(&repo, ENCODER_FILES)
            .await
            .with_context(|| format!("Failed to fetch encoder from {}", repo_id))?;
        let decoder = fetch_first(&repo, DECODER_FILES)
            .await
            .with_context(|| format!("Failed to fetch decoder from {}", repo_id))?;
        let tokenizer = repo
            .get(TOKENIZER_FILE)
            .await
            .with_context(|| format!("Failed to fetch {} from {}", TOKENIZER_FILE, repo_id))?;

        Ok(Self {
            encoder,
            decoder,
            tokenizer,
            preprocessor_config: fetch_optional(&repo, PREPROCESSOR_CONFIG_FILE).await,
            model_config: fetch_optional(&repo, MODEL_CONFIG_FILE).await,
            generation_config: fetch_optional(&repo, GENERATION_CONFIG_FILE).await,
        })
    }
}

async fn fetch_first(repo: &ApiRepo, names: &[&str]) -> Result<PathBuf> {
    let mut last_error = None;
    for name in names {
        match repo.get(name).await {
            Ok(path) => return Ok(path),
            Err(e) => {
                debug!("{} not available: {}", name, e);
                last_error = Some(e);
            }
        }
    }
    match last_error {
        Some(e) => Err(e.into()),
        None => anyhow::bail!("No candidate file names given"),
    }
}

async fn fetch_optional(repo: &ApiRepo, name: &str) -> Option<PathBuf> {
    match repo.get(name).await {
        Ok(path) => Some(path),
        Err(e) => {
            debug!("Optional file {} not available: {}", name, e);
            None
        }
    }
}
