// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Model identifiers advertised by `GET /models`

/// Model loaded when none is configured
pub const DEFAULT_MODEL: &str = "microsoft/trocr-base-handwritten";

/// Known TrOCR checkpoints. Informational only, not checked for availability.
pub const AVAILABLE_MODELS: [&str; 6] = [
    "microsoft/trocr-base-handwritten",
    "microsoft/trocr-small-handwritten",
    "microsoft/trocr-large-handwritten",
    "microsoft/trocr-base-printed",
    "microsoft/trocr-small-printed",
    "microsoft/trocr-large-printed",
];

pub fn is_known_model(name: &str) -> bool {
    AVAILABLE_MODELS.contains(&name)
}
