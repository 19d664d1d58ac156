// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Extract request parsing
//!
//! A request carries its image either as a multipart field named `file` or as
//! a JSON body `{"image": "<base64>"}`.

use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum_extra::extract::Multipart;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::errors::ApiError;
use crate::recognition::RecognitionInput;

/// Multipart field holding the uploaded image
pub const FILE_FIELD: &str = "file";

/// JSON body of an extract request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractRequest {
    /// Base64-encoded image, optionally with a data-URL header
    #[serde(default)]
    pub image: Option<String>,
}

impl ExtractRequest {
    pub fn into_input(self) -> Option<RecognitionInput> {
        self.image.map(RecognitionInput::Base64)
    }
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"))
        .unwrap_or(false)
}

fn rejection(status: StatusCode, message: String) -> ApiError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(message)
    } else {
        ApiError::InvalidRequest(message)
    }
}

/// Pull the image source out of a request body
///
/// Returns `Ok(None)` when the body holds neither a `file` field nor an
/// `image` key.
pub async fn read_payload(request: Request) -> Result<Option<RecognitionInput>, ApiError> {
    if is_multipart(&request) {
        read_multipart(request).await
    } else {
        read_json(request).await
    }
}

async fn read_multipart(request: Request) -> Result<Option<RecognitionInput>, ApiError> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| ApiError::InvalidRequest(format!("Invalid multipart body: {}", e)))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| rejection(e.status(), e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            debug!("Skipping multipart field {:?}", field.name());
            continue;
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| rejection(e.status(), e.body_text()))?;
        debug!("Received {} byte upload", bytes.len());
        return Ok(Some(RecognitionInput::Bytes(bytes.to_vec())));
    }

    Ok(None)
}

async fn read_json(request: Request) -> Result<Option<RecognitionInput>, ApiError> {
    let body = Bytes::from_request(request, &())
        .await
        .map_err(|e| rejection(e.status(), e.body_text()))?;

    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let invalid =
        |e: serde_json::Error| ApiError::InvalidRequest(format!("Invalid JSON body: {}", e));
    let value: serde_json::Value = serde_json::from_slice(&body).map_err(invalid)?;

    // Well-formed JSON that is not an object carries no `image` key
    if !value.is_object() {
        return Ok(None);
    }

    let request: ExtractRequest = serde_json::from_value(value).map_err(invalid)?;
    Ok(request.into_input())
}
