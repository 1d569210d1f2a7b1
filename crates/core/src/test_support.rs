// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test builders shared across crates.

use crate::bag::Bag;
use crate::history::HistoryEntry;
use crate::job::{Job, JobConfig, JobId};
use crate::stage::Stage;

/// A job owned by `u1` in `submitted`, created at the fake-clock origin.
pub fn make_job(id: &str) -> Job {
    Job::new(
        JobConfig {
            id: id.into(),
            owner: "u1".into(),
            source_ref: format!("/incoming/{id}.flac"),
            display_name: format!("{id}.flac"),
            engine_hint: None,
            trace_id: format!("trace-{id}").into(),
        },
        1_000_000,
    )
}

/// A history entry for `job_id` with an empty bag snapshot.
pub fn make_entry(job_id: &str, seq: u64, stage: Stage, at_ms: u64) -> HistoryEntry {
    HistoryEntry {
        job_id: JobId::new(job_id),
        seq,
        stage,
        at_ms,
        bag_snapshot: Bag::new(),
        error: None,
    }
}
