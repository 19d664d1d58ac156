// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Tests for GET /models

use axum::http::StatusCode;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot`

use super::common::{get_request, json_body, ready_app, unavailable_app, StubRecognizer, MODEL_NAME};

const EXPECTED_MODELS: [&str; 6] = [
    "microsoft/trocr-base-handwritten",
    "microsoft/trocr-small-handwritten",
    "microsoft/trocr-large-handwritten",
    "microsoft/trocr-base-printed",
    "microsoft/trocr-small-printed",
    "microsoft/trocr-large-printed",
];

#[tokio::test]
async fn test_models_when_ready() {
    let app = ready_app(Arc::new(StubRecognizer("unused")));

    let response = app.oneshot(get_request("/models")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({ "available_models": EXPECTED_MODELS, "current_model": MODEL_NAME })
    );
}

#[tokio::test]
async fn test_models_when_unavailable() {
    let app = unavailable_app();

    let response = app.oneshot(get_request("/models")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["available_models"], json!(EXPECTED_MODELS));
    assert!(body["current_model"].is_null());
}

#[tokio::test]
async fn test_models_constant_across_calls() {
    let app = ready_app(Arc::new(StubRecognizer("unused")));

    let first = json_body(app.clone().oneshot(get_request("/models")).await.unwrap()).await;
    let second = json_body(app.oneshot(get_request("/models")).await.unwrap()).await;
    assert_eq!(first, second);
    assert!(first["available_models"]
        .as_array()
        .unwrap()
        .contains(&json!(MODEL_NAME)));
}
