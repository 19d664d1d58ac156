// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Health and model catalog endpoints

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::server::AppState;
use crate::vision::AVAILABLE_MODELS;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    /// "healthy" or "unhealthy"
    pub status: String,
    pub model: Option<String>,
    pub device: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelsResponse {
    pub available_models: Vec<String>,
    pub current_model: Option<String>,
}

impl HealthResponse {
    pub fn from_state(state: &AppState) -> Self {
        let service = &state.service;
        Self {
            status: if service.is_ready() { "healthy" } else { "unhealthy" }.to_string(),
            model: service.model_name().map(str::to_string),
            device: service.device().map(|d| d.to_string()),
        }
    }
}

impl ModelsResponse {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            available_models: AVAILABLE_MODELS.iter().map(|m| m.to_string()).collect(),
            current_model: state.service.model_name().map(str::to_string),
        }
    }
}

/// GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::from_state(&state))
}

/// GET /models
pub async fn models_handler(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(ModelsResponse::from_state(&state))
}
