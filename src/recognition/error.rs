// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error kinds returned by text extraction

use axum::http::StatusCode;
use thiserror::Error;

use crate::vision::ImageError;

/// Message returned while no model is loaded
pub const SERVICE_UNAVAILABLE_MESSAGE: &str = "TrOCR service not available";

#[derive(Debug, Error)]
pub enum ExtractError {
    /// Model failed to load at startup
    #[error("{}", SERVICE_UNAVAILABLE_MESSAGE)]
    Unavailable,

    /// Payload is not valid base64 or not a decodable image
    #[error(transparent)]
    Decode(#[from] ImageError),

    /// Preprocessing, encoding or generation failed
    #[error("{0}")]
    Inference(String),
}

impl ExtractError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ExtractError::Decode(_) => StatusCode::BAD_REQUEST,
            ExtractError::Unavailable | ExtractError::Inference(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<anyhow::Error> for ExtractError {
    fn from(err: anyhow::Error) -> Self {
        ExtractError::Inference(format!("{:#}", err))
    }
}
