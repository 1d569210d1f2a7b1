// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy → HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use im2_core::RegistryError;
use serde_json::json;

/// Wrapper that renders a [`RegistryError`] as a JSON error response.
#[derive(Debug)]
pub struct ApiError(pub RegistryError);

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            RegistryError::BadRequest(_) | RegistryError::Terminal => StatusCode::BAD_REQUEST,
            RegistryError::NotFound => StatusCode::NOT_FOUND,
            RegistryError::Conflict
            | RegistryError::IllegalTransition { .. }
            | RegistryError::Contended { .. } => StatusCode::CONFLICT,
            RegistryError::PipelinePaused | RegistryError::Unavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.0.code(),
            "message": self.0.to_string(),
        });
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
