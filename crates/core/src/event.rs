// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle events published to the bus.
//!
//! Publication is best-effort from the registry's perspective: the
//! transition is committed before publish is attempted, subscribers must
//! tolerate duplicates and drops, and may rebuild state from the history
//! log. Serializes with `{"event": "created", ...fields}` format.

use crate::job::{Job, JobId, OwnerId, TraceId};
use crate::stage::Stage;
use serde::{Deserialize, Serialize};

/// Topic carrying per-job lifecycle events.
pub const TOPIC_JOBS_LIFECYCLE: &str = "jobs.lifecycle";

/// Topic carrying pipeline-wide pause/resume events.
pub const TOPIC_SYSTEM_LIFECYCLE: &str = "system.lifecycle";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    Created {
        job_id: JobId,
        owner: OwnerId,
        stage: Stage,
        at_ms: u64,
        trace_id: TraceId,
    },
    Updated {
        job_id: JobId,
        owner: OwnerId,
        stage: Stage,
        at_ms: u64,
        trace_id: TraceId,
    },
    Retried {
        job_id: JobId,
        owner: OwnerId,
        stage: Stage,
        at_ms: u64,
        trace_id: TraceId,
    },
    Canceled {
        job_id: JobId,
        owner: OwnerId,
        stage: Stage,
        at_ms: u64,
        trace_id: TraceId,
    },
    Paused {
        at_ms: u64,
    },
    Resumed {
        at_ms: u64,
    },
}

impl Event {
    pub fn created(job: &Job) -> Self {
        Event::Created {
            job_id: job.id.clone(),
            owner: job.owner.clone(),
            stage: job.stage,
            at_ms: job.updated_at_ms,
            trace_id: job.trace_id.clone(),
        }
    }

    pub fn updated(job: &Job) -> Self {
        Event::Updated {
            job_id: job.id.clone(),
            owner: job.owner.clone(),
            stage: job.stage,
            at_ms: job.updated_at_ms,
            trace_id: job.trace_id.clone(),
        }
    }

    pub fn retried(job: &Job) -> Self {
        Event::Retried {
            job_id: job.id.clone(),
            owner: job.owner.clone(),
            stage: job.stage,
            at_ms: job.updated_at_ms,
            trace_id: job.trace_id.clone(),
        }
    }

    pub fn canceled(job: &Job) -> Self {
        Event::Canceled {
            job_id: job.id.clone(),
            owner: job.owner.clone(),
            stage: job.stage,
            at_ms: job.updated_at_ms,
            trace_id: job.trace_id.clone(),
        }
    }

    /// The named channel this event is published on.
    pub fn topic(&self) -> &'static str {
        match self {
            Event::Created { .. }
            | Event::Updated { .. }
            | Event::Retried { .. }
            | Event::Canceled { .. } => TOPIC_JOBS_LIFECYCLE,
            Event::Paused { .. } | Event::Resumed { .. } => TOPIC_SYSTEM_LIFECYCLE,
        }
    }

    /// The job this event concerns, if any.
    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            Event::Created { job_id, .. }
            | Event::Updated { job_id, .. }
            | Event::Retried { job_id, .. }
            | Event::Canceled { job_id, .. } => Some(job_id),
            Event::Paused { .. } | Event::Resumed { .. } => None,
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
