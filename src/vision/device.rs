// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Compute device selection and ONNX Runtime session construction
//!
//! The service runs on a CUDA accelerator when one is usable and falls back to
//! the CPU execution provider otherwise.

use anyhow::{Context, Result};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider, ExecutionProvider};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

/// Compute target for tensor operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Cuda { device_id: i32 },
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda { device_id: 0 } => write!(f, "cuda"),
            Device::Cuda { device_id } => write!(f, "cuda:{}", device_id),
        }
    }
}

impl Serialize for Device {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Which device the operator asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DevicePreference {
    /// Accelerator if present, CPU otherwise
    #[default]
    Auto,
    Cpu,
    Cuda { device_id: i32 },
}

impl FromStr for DevicePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda { device_id: 0 }),
            _ => {
                if let Some(id) = s.strip_prefix("cuda:") {
                    let device_id = id
                        .parse::<i32>()
                        .map_err(|_| format!("invalid CUDA device id '{}'", id))?;
                    if device_id < 0 {
                        return Err(format!("invalid CUDA device id '{}'", id));
                    }
                    Ok(Self::Cuda { device_id })
                } else {
                    Err(format!(
                        "unknown device '{}', expected auto, cpu, cuda or cuda:N",
                        s
                    ))
                }
            }
        }
    }
}

/// Check whether the CUDA execution provider can be used in this process
pub fn cuda_available() -> bool {
    match CUDAExecutionProvider::default().is_available() {
        Ok(available) => available,
        Err(e) => {
            warn!("Could not query CUDA execution provider: {}", e);
            false
        }
    }
}

/// Resolve the operator's preference to a concrete device
pub fn select_device(preference: DevicePreference) -> Device {
    match preference {
        DevicePreference::Cpu => Device::Cpu,
        DevicePreference::Auto => {
            if cuda_available() {
                Device::Cuda { device_id: 0 }
            } else {
                Device::Cpu
            }
        }
        DevicePreference::Cuda { device_id } => {
            if cuda_available() {
                Device::Cuda { device_id }
            } else {
                warn!("CUDA requested but not available, using CPU");
                Device::Cpu
            }
        }
    }
}

/// Build an ONNX Runtime session for `model_path` on `device`
///
/// A CUDA session that fails to build is retried on the CPU. The returned
/// device is the one the session actually runs on.
pub fn build_session(
    model_path: &Path,
    device: Device,
    intra_threads: usize,
) -> Result<(Session, Device)> {
    if let Device::Cuda { device_id } = device {
        // error_on_failure keeps ort from quietly registering the CPU provider
        let cuda_result = (|| -> Result<Session> {
            Session::builder()
                .context("Failed to create session builder")?
                .with_execution_providers([CUDAExecutionProvider::default()
                    .with_device_id(device_id)
                    .build()
                    .error_on_failure()])
                .context("Failed to set CUDA execution provider")?
                .with_optimization_level(GraphOptimizationLevel::Level3)
                .context("Failed to set optimization level")?
                .with_intra_threads(intra_threads)
                .context("Failed to set intra threads")?
                .commit_from_file(model_path)
                .context(format!("Failed to load ONNX model from {}", model_path.display()))
        })();

        match cuda_result {
            Ok(session) => {
                info!("Loaded {} on {}", model_path.display(), device);
                return Ok((session, device));
            }
            Err(e) => {
                warn!("CUDA execution provider failed for {}: {}", model_path.display(), e);
                warn!("Falling back to CPU execution provider");
            }
        }
    }

    let session = Session::builder()
        .context("Failed to create session builder")?
        .with_execution_providers([CPUExecutionProvider::default().build()])
        .context("Failed to set CPU execution provider")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(intra_threads)
        .context("Failed to set intra threads")?
        .commit_from_file(model_path)
        .context(format!("Failed to load ONNX model from {}", model_path.display()))?;

    info!("Loaded {} on cpu", model_path.display());
    Ok((session, Device::Cpu))
}
