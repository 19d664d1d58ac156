// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::recognition::ExtractError;

/// Message returned when a request carries neither `file` nor `image`
pub const NO_IMAGE_DATA_MESSAGE: &str = "No image data provided";

/// JSON body of every error response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{}", NO_IMAGE_DATA_MESSAGE)]
    NoImageData,

    /// Body could not be parsed as multipart or JSON
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error(transparent)]
    Extract(#[from] ExtractError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NoImageData | ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Extract(e) => e.status_code(),
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_response())).into_response()
    }
}
