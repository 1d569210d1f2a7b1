// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP+JSON surface of the registry.
//!
//! All endpoints share one port. Producers create jobs, stage workers poll
//! candidates and claim them, operators retry/cancel/pause. Every response
//! echoes `X-Trace-ID` (generated when the caller sent none), and every
//! request runs under the configured deadline.

mod admin;
mod error;
mod jobs;

pub use error::ApiError;

use axum::extract::{Request, State};
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use im2_core::RegistryError;
use im2_registry::Registry;
use std::sync::Arc;
use std::time::{Duration, Instant};

static TRACE_HEADER: HeaderName = HeaderName::from_static("x-trace-id");

/// Shared handler context.
pub struct AppState {
    pub registry: Arc<Registry>,
    pub started_at: Instant,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
}

/// The trace id the caller supplied, if any.
///
/// Handlers that mint jobs propagate it; the response header is echoed (or
/// generated) by the middleware regardless.
#[derive(Debug, Clone)]
pub struct RequestTrace(pub Option<String>);

/// Build the full route table.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/jobs", post(jobs::create).get(jobs::list))
        .route("/api/jobs/candidates", get(jobs::candidates))
        .route("/api/jobs/{id}", get(jobs::get).put(jobs::update))
        .route("/api/jobs/{id}/history", get(jobs::history))
        .route("/api/jobs/{id}/claim", post(jobs::claim))
        .route("/api/jobs/{id}/retry", post(jobs::retry))
        .route("/api/jobs/{id}/cancel", post(jobs::cancel))
        .route("/api/stats", get(admin::stats))
        .route("/api/pause", post(admin::pause))
        .route("/api/resume", post(admin::resume))
        .route("/health", get(admin::health))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            deadline_layer,
        ))
        .layer(middleware::from_fn(trace_layer))
        .with_state(state)
}

/// Read `X-Trace-ID` (or mint one) and echo it on the response.
async fn trace_layer(mut req: Request, next: Next) -> Response {
    let supplied = req
        .headers()
        .get(&TRACE_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    let echo = supplied
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    req.extensions_mut().insert(RequestTrace(supplied));

    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&echo) {
        response.headers_mut().insert(&TRACE_HEADER, value);
    }
    response
}

/// Enforce the per-request deadline; expiry surfaces as `Unavailable`.
async fn deadline_layer(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    match tokio::time::timeout(state.request_timeout, next.run(req)).await {
        Ok(response) => response,
        Err(_) => ApiError::from(RegistryError::Unavailable(
            "request deadline exceeded".into(),
        ))
        .into_response(),
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
