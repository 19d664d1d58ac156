// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod errors;
pub mod extract;
pub mod handlers;
pub mod server;

pub use errors::{ApiError, ErrorResponse};
pub use extract::{extract_handler, ExtractRequest};
pub use handlers::{HealthResponse, ModelsResponse};
pub use server::{create_app, start_server, AppState};
