// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admin endpoints: aggregate stats, the pause switch, service health.

use super::AppState;
use axum::extract::State;
use axum::Json;
use im2_registry::Stats;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub async fn stats(State(state): State<Arc<AppState>>) -> Json<Stats> {
    Json(state.registry.stats())
}

pub async fn pause(State(state): State<Arc<AppState>>) -> Json<Value> {
    state.registry.pause();
    Json(json!({ "status": "paused" }))
}

pub async fn resume(State(state): State<Arc<AppState>>) -> Json<Value> {
    state.registry.resume();
    Json(json!({ "status": "resumed" }))
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub version: &'static str,
    pub paused: bool,
    pub uptime_ms: u64,
    /// Advisory: how often workers should poll for candidates.
    pub poll_interval_secs: u64,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Health> {
    Json(Health {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        paused: state.registry.is_paused(),
        uptime_ms: state.started_at.elapsed().as_millis() as u64,
        poll_interval_secs: state.poll_interval.as_secs(),
    })
}
