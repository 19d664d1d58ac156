// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Tests for GET /health

use axum::http::StatusCode;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot`

use super::common::{
    get_request, json_body, json_request, png_bytes, ready_app, unavailable_app, StubRecognizer,
    MODEL_NAME,
};

#[tokio::test]
async fn test_health_when_ready() {
    let app = ready_app(Arc::new(StubRecognizer("unused")));

    let response = app.oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({ "status": "healthy", "model": MODEL_NAME, "device": "cpu" })
    );
}

#[tokio::test]
async fn test_health_when_unavailable() {
    let app = unavailable_app();

    let response = app.oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({ "status": "unhealthy", "model": null, "device": null })
    );
}

#[tokio::test]
async fn test_health_independent_of_request_history() {
    let app = ready_app(Arc::new(StubRecognizer("text")));

    let before = json_body(app.clone().oneshot(get_request("/health")).await.unwrap()).await;

    let payload = json!({ "image": STANDARD.encode(png_bytes()) });
    let extract = app
        .clone()
        .oneshot(json_request("/extract", payload))
        .await
        .unwrap();
    assert_eq!(extract.status(), StatusCode::OK);

    let bad = app
        .clone()
        .oneshot(json_request("/extract", json!({ "image": "***" })))
        .await
        .unwrap();
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

    let after = json_body(app.oneshot(get_request("/health")).await.unwrap()).await;
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_cors_headers_present() {
    let app = ready_app(Arc::new(StubRecognizer("unused")));
    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/health")
        .header("origin", "http://localhost:3000")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert!(response
        .headers()
        .contains_key("access-control-allow-origin"));
}
