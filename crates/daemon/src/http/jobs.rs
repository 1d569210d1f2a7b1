// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job endpoints: create, list, fetch, transition, claim, retry, cancel.

use super::{AppState, RequestTrace};
use crate::http::ApiError;
use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use im2_core::stage::UnknownStage;
use im2_core::{Bag, HistoryEntry, Job, RegistryError, Stage};
use im2_registry::{Actor, CreateJob};
use im2_storage::JobFilter;
use serde::Deserialize;
use std::sync::Arc;

const DEFAULT_LIST_LIMIT: usize = 100;
const DEFAULT_CANDIDATES_LIMIT: usize = 50;

fn bad_stage(err: UnknownStage) -> ApiError {
    ApiError(RegistryError::BadRequest(err.to_string()))
}

/// Store writes fsync; run them off the request reactor.
async fn run_blocking<T: Send + 'static>(
    op: impl FnOnce() -> Result<T, RegistryError> + Send + 'static,
) -> Result<T, ApiError> {
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| ApiError(RegistryError::Unavailable(e.to_string())))?
        .map_err(ApiError)
}

#[derive(Debug, Deserialize)]
pub struct CreateJobBody {
    #[serde(default)]
    pub id: Option<String>,
    pub owner: String,
    pub source_ref: String,
    pub display_name: String,
    #[serde(default)]
    pub engine_hint: Option<String>,
    #[serde(default)]
    pub trace_id: Option<String>,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(trace): Extension<RequestTrace>,
    Json(body): Json<CreateJobBody>,
) -> Result<Json<Job>, ApiError> {
    let registry = Arc::clone(&state.registry);
    let req = CreateJob {
        id: body.id,
        owner: body.owner,
        source_ref: body.source_ref,
        display_name: body.display_name,
        engine_hint: body.engine_hint,
        // Header wins over body, the engine generates when both are absent
        trace_id: trace.0.or(body.trace_id),
    };
    let job = run_blocking(move || registry.create_job(req)).await?;
    Ok(Json(job))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub owner: Option<String>,
    /// Single stage or comma-separated set.
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub created_after: Option<u64>,
    #[serde(default)]
    pub created_before: Option<u64>,
    #[serde(default = "default_list_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_list_limit() -> usize {
    DEFAULT_LIST_LIMIT
}

fn parse_stage_set(raw: Option<&str>) -> Result<Vec<Stage>, ApiError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().map_err(bad_stage))
        .collect()
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Job>>, ApiError> {
    let filter = JobFilter {
        owner: query.owner.map(Into::into),
        stages: parse_stage_set(query.stage.as_deref())?,
        created_after_ms: query.created_after,
        created_before_ms: query.created_before,
    };
    Ok(Json(state.registry.list(&filter, query.limit, query.offset)))
}

#[derive(Debug, Deserialize)]
pub struct CandidatesQuery {
    pub stage: String,
    #[serde(default)]
    pub engine: Option<String>,
    #[serde(default = "default_candidates_limit")]
    pub limit: usize,
}

fn default_candidates_limit() -> usize {
    DEFAULT_CANDIDATES_LIMIT
}

/// Worker poll: jobs claimable in a stage, oldest first. A read, no lease.
pub async fn candidates(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CandidatesQuery>,
) -> Result<Json<Vec<Job>>, ApiError> {
    let stage: Stage = query.stage.parse().map_err(bad_stage)?;
    Ok(Json(state.registry.list_candidates(
        stage,
        query.engine.as_deref(),
        query.limit,
    )))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    Ok(Json(state.registry.get(&id)?))
}

pub async fn history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    Ok(Json(state.registry.history(&id)?))
}

#[derive(Debug, Deserialize)]
pub struct UpdateJobBody {
    pub stage: String,
    #[serde(default)]
    pub bag: Option<Bag>,
    #[serde(default)]
    pub error: Option<String>,
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateJobBody>,
) -> Result<Json<Job>, ApiError> {
    let target: Stage = body.stage.parse().map_err(bad_stage)?;
    let registry = Arc::clone(&state.registry);
    let job = run_blocking(move || {
        registry.transition(&id, target, body.bag, body.error, Actor::External)
    })
    .await?;
    Ok(Json(job))
}

#[derive(Debug, Deserialize)]
pub struct ClaimBody {
    pub from_stage: String,
    pub to_stage: String,
}

/// Worker claim: atomic CAS out of `from_stage`. Losing returns 409.
pub async fn claim(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<ClaimBody>,
) -> Result<Json<Job>, ApiError> {
    let from: Stage = body.from_stage.parse().map_err(bad_stage)?;
    let to: Stage = body.to_stage.parse().map_err(bad_stage)?;
    let registry = Arc::clone(&state.registry);
    let job = run_blocking(move || registry.claim(&id, from, to)).await?;
    Ok(Json(job))
}

pub async fn retry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    let registry = Arc::clone(&state.registry);
    let job = run_blocking(move || registry.retry(&id)).await?;
    Ok(Json(job))
}

pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    let registry = Arc::clone(&state.registry);
    let job = run_blocking(move || registry.cancel(&id)).await?;
    Ok(Json(job))
}

#[cfg(test)]
#[path = "jobs_tests.rs"]
mod tests;
