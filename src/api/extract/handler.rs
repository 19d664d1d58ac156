// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Extract endpoint handler

use axum::extract::{Request, State};
use axum::Json;
use tracing::{debug, info, warn};

use super::request::read_payload;
use crate::api::errors::ApiError;
use crate::api::server::AppState;
use crate::recognition::{ExtractError, RecognitionResult};

/// POST /extract - Recognize the text in an image
///
/// # Request
/// - multipart form with a `file` field holding the encoded image, or
/// - JSON `{"image": "<base64>"}`, with or without a `data:image/...;base64,` header
///
/// # Response
/// - `text`: Recognized text
/// - `confidence`: Fixed 0.85
/// - `model`: Loaded model name
/// - `device`: "cpu", "cuda" or "cuda:N"
///
/// # Errors
/// - 500 Internal Server Error: Model not loaded, or inference failed
/// - 400 Bad Request: No image provided, malformed body, or undecodable image
pub async fn extract_handler(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<RecognitionResult>, ApiError> {
    if !state.service.is_ready() {
        warn!("Extract request rejected, TrOCR service not available");
        return Err(ExtractError::Unavailable.into());
    }

    let input = read_payload(request).await?.ok_or_else(|| {
        debug!("Extract request without file or image");
        ApiError::NoImageData
    })?;

    let result = state.service.extract_text(input).await?;

    info!(
        "Extract complete: {} chars with {} on {}",
        result.text.chars().count(),
        result.model,
        result.device
    );

    Ok(Json(result))
}
