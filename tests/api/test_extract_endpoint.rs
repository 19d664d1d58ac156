// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Tests for POST /extract
//!
//! Routes are driven through `oneshot` with a stub recognizer, so no model
//! files are needed except for the ignored end-to-end test.

use axum::http::StatusCode;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot`

use super::common::{
    get_request, json_body, json_request, multipart_request, png_bytes, ready_app,
    text_line_png, unavailable_app, wrap_base64, BrokenRecognizer, StubRecognizer, MODEL_NAME,
};

#[tokio::test]
async fn test_extract_base64_image() {
    let app = ready_app(Arc::new(StubRecognizer("industrial design")));
    let payload = json!({ "image": STANDARD.encode(png_bytes()) });

    let response = app.oneshot(json_request("/extract", payload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["text"], "industrial design");
    assert!((body["confidence"].as_f64().unwrap() - 0.85).abs() < 1e-6);
    assert_eq!(body["model"], MODEL_NAME);
    assert_eq!(body["device"], "cpu");
}

#[tokio::test]
async fn test_extract_multipart_file() {
    let app = ready_app(Arc::new(StubRecognizer("uploaded line")));

    let response = app
        .oneshot(multipart_request("/extract", "file", &png_bytes()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["text"], "uploaded line");
}

#[tokio::test]
async fn test_data_url_prefix_gives_same_result() {
    let app = ready_app(Arc::new(StubRecognizer("same text")));
    let plain = STANDARD.encode(png_bytes());
    let prefixed = format!("data:image/png;base64,{}", plain);

    let plain_response = app
        .clone()
        .oneshot(json_request("/extract", json!({ "image": plain })))
        .await
        .unwrap();
    let prefixed_response = app
        .oneshot(json_request("/extract", json!({ "image": prefixed })))
        .await
        .unwrap();

    assert_eq!(plain_response.status(), StatusCode::OK);
    assert_eq!(prefixed_response.status(), StatusCode::OK);
    assert_eq!(json_body(plain_response).await, json_body(prefixed_response).await);
}

#[tokio::test]
async fn test_line_wrapped_base64_is_accepted() {
    let app = ready_app(Arc::new(StubRecognizer("wrapped line")));
    let encoded = STANDARD.encode(text_line_png());
    assert!(encoded.len() > 76);
    let wrapped = wrap_base64(&encoded, 76);

    let single = app
        .clone()
        .oneshot(json_request("/extract", json!({ "image": encoded })))
        .await
        .unwrap();
    assert_eq!(single.status(), StatusCode::OK);
    let expected = json_body(single).await;

    for payload in [wrapped.clone(), format!("data:image/png;base64,{}", wrapped)] {
        let response = app
            .clone()
            .oneshot(json_request("/extract", json!({ "image": payload })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, expected);
    }
}

#[tokio::test]
async fn test_no_image_data() {
    let app = ready_app(Arc::new(StubRecognizer("unused")));

    let response = app
        .oneshot(json_request("/extract", json!({ "language": "en" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({ "error": "No image data provided" })
    );
}

#[tokio::test]
async fn test_empty_body_is_no_image_data() {
    let app = ready_app(Arc::new(StubRecognizer("unused")));
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/extract")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({ "error": "No image data provided" })
    );
}

#[tokio::test]
async fn test_multipart_without_file_field() {
    let app = ready_app(Arc::new(StubRecognizer("unused")));

    let response = app
        .oneshot(multipart_request("/extract", "document", &png_bytes()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "No image data provided");
}

#[tokio::test]
async fn test_malformed_base64_never_succeeds() {
    let app = ready_app(Arc::new(StubRecognizer("unused")));

    let response = app
        .oneshot(json_request("/extract", json!({ "image": "%%% not base64 %%%" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    let error = body["error"].as_str().unwrap();
    assert!(!error.is_empty());
    assert!(error.contains("base64"), "unexpected error: {}", error);
}

#[tokio::test]
async fn test_base64_of_non_image() {
    let app = ready_app(Arc::new(StubRecognizer("unused")));
    let payload = json!({ "image": STANDARD.encode(b"just some text") });

    let response = app.oneshot(json_request("/extract", payload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(!json_body(response).await["error"]
        .as_str()
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_malformed_json_body() {
    let app = ready_app(Arc::new(StubRecognizer("unused")));
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/extract")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{\"image\": "))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"]
        .as_str()
        .unwrap()
        .starts_with("Invalid JSON body"));
}

#[tokio::test]
async fn test_null_json_body_is_no_image_data() {
    for body in [json!(null), json!([])] {
        let app = ready_app(Arc::new(StubRecognizer("unused")));
        let response = app.oneshot(json_request("/extract", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await,
            json!({ "error": "No image data provided" })
        );
    }
}

#[tokio::test]
async fn test_service_unavailable() {
    let app = unavailable_app();
    let payload = json!({ "image": STANDARD.encode(png_bytes()) });

    let response = app.oneshot(json_request("/extract", payload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(response).await,
        json!({ "error": "TrOCR service not available" })
    );
}

#[tokio::test]
async fn test_unavailable_checked_before_input() {
    let app = unavailable_app();

    let response = app
        .oneshot(json_request("/extract", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["error"], "TrOCR service not available");
}

#[tokio::test]
async fn test_inference_failure() {
    let app = ready_app(Arc::new(BrokenRecognizer));
    let payload = json!({ "image": STANDARD.encode(png_bytes()) });

    let response = app.oneshot(json_request("/extract", payload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json_body(response).await["error"]
        .as_str()
        .unwrap()
        .contains("decoder session crashed"));
}

#[tokio::test]
async fn test_extract_requires_post() {
    let app = ready_app(Arc::new(StubRecognizer("unused")));

    let response = app.oneshot(get_request("/extract")).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_upload_over_body_limit() {
    use trocr_service::api::{create_app, AppState};
    use trocr_service::recognition::{RecognitionService, ServiceState};
    use trocr_service::vision::Device;

    let service = RecognitionService::from_recognizer(
        Arc::new(StubRecognizer("unused")),
        MODEL_NAME,
        Device::Cpu,
        1,
    );
    let state =
        AppState::new(ServiceState::Ready(Arc::new(service))).with_max_upload_bytes(1024);
    let app = create_app(state);

    let payload = json!({ "image": "A".repeat(4096) });
    let response = app.oneshot(json_request("/extract", payload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
#[ignore] // Requires the TrOCR ONNX export under ./models or network access
async fn test_extract_with_real_model() {
    use trocr_service::api::{create_app, AppState};
    use trocr_service::config::ServiceConfig;
    use trocr_service::recognition::{RecognitionService, ServiceState};
    use trocr_service::vision::DevicePreference;

    let config = ServiceConfig {
        device: DevicePreference::Cpu,
        max_length: Some(16),
        ..Default::default()
    };
    let service = RecognitionService::initialize(&config)
        .await
        .expect("Failed to load TrOCR model");
    let device = service.device();
    let app = create_app(AppState::new(ServiceState::Ready(Arc::new(service))));

    let payload = json!({ "image": STANDARD.encode(text_line_png()) });
    let response = app.oneshot(json_request("/extract", payload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["model"], MODEL_NAME);
    assert_eq!(body["device"], device.to_string());
    assert!((body["confidence"].as_f64().unwrap() - 0.85).abs() < 1e-6);
    assert!(!body["text"].as_str().unwrap().trim().is_empty());
}
