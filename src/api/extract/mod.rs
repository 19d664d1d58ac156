// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Extract API endpoint module
//!
//! Provides POST /extract for recognizing text in an image.

pub mod handler;
pub mod request;

pub use handler::extract_handler;
pub use request::{read_payload, ExtractRequest, FILE_FIELD};
