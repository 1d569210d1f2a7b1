// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job row and identifiers.

use crate::bag::Bag;
use crate::stage::Stage;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a job.
    ///
    /// Assigned at creation (UUID) or supplied by the caller, in which case
    /// it must be unique across all jobs ever created.
    #[derive(Default)]
    pub struct JobId;
}

crate::define_id! {
    /// Logical principal a job belongs to.
    #[derive(Default)]
    pub struct OwnerId;
}

crate::define_id! {
    /// Correlation identifier propagated across events and downstream calls.
    #[derive(Default)]
    pub struct TraceId;
}

/// Parameters for creating a new job.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub id: JobId,
    pub owner: OwnerId,
    pub source_ref: String,
    pub display_name: String,
    pub engine_hint: Option<String>,
    pub trace_id: TraceId,
}

/// A unit of work tracked through the pipeline.
///
/// The row the registry persists; one per job, retained forever (no
/// implicit deletion). `stage` always equals the stage of the newest
/// history entry for this job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub owner: OwnerId,
    /// Opaque reference to the input artifact; never interpreted here.
    pub source_ref: String,
    pub display_name: String,
    pub stage: Stage,
    /// Routing tag stage workers use to pick themselves (e.g. which separator).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_hint: Option<String>,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
    /// Most recent failure message; cleared on successful advance or retry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub trace_id: TraceId,
    #[serde(default)]
    pub bag: Bag,
}

impl Job {
    /// Create a new job in `submitted`.
    pub fn new(config: JobConfig, epoch_ms: u64) -> Self {
        Self {
            id: config.id,
            owner: config.owner,
            source_ref: config.source_ref,
            display_name: config.display_name,
            stage: Stage::Submitted,
            engine_hint: config.engine_hint,
            created_at_ms: epoch_ms,
            updated_at_ms: epoch_ms,
            last_error: None,
            trace_id: config.trace_id,
            bag: Bag::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }

    /// Bump `updated_at_ms`, never letting it go backwards.
    pub fn touch(&mut self, epoch_ms: u64) {
        self.updated_at_ms = self.updated_at_ms.max(epoch_ms);
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
