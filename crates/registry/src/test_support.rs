// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for registry tests.

use crate::bus::BroadcastBus;
use crate::engine::{Actor, CreateJob, Registry};
use im2_core::{FakeClock, Job, SequentialIdGen, Stage};
use im2_storage::JobStore;
use std::sync::Arc;

pub(crate) type TestRegistry = Registry<FakeClock, SequentialIdGen>;

pub(crate) struct Harness {
    pub registry: TestRegistry,
    pub bus: Arc<BroadcastBus>,
    pub clock: FakeClock,
    // Keeps the store directory alive for the test's duration
    #[allow(dead_code)]
    pub dir: tempfile::TempDir,
}

pub(crate) fn harness() -> Harness {
    harness_with(false)
}

pub(crate) fn harness_with(start_paused: bool) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = JobStore::open(dir.path()).unwrap();
    let bus = Arc::new(BroadcastBus::new(64));
    let clock = FakeClock::new();
    let registry = Registry::with_parts(
        Arc::new(store),
        Arc::clone(&bus) as Arc<dyn crate::bus::EventSink>,
        clock.clone(),
        SequentialIdGen::new("job"),
        start_paused,
    );
    Harness {
        registry,
        bus,
        clock,
        dir,
    }
}

pub(crate) fn create(registry: &TestRegistry, id: &str) -> Job {
    registry
        .create_job(CreateJob {
            id: Some(id.to_string()),
            owner: "u1".into(),
            source_ref: format!("/incoming/{id}.flac"),
            display_name: format!("{id}.flac"),
            ..Default::default()
        })
        .unwrap()
}

/// Walk a job forward one legal step at a time until it reaches `target`.
pub(crate) fn advance_to(registry: &TestRegistry, id: &str, target: Stage) -> Job {
    let mut job = registry.get(id).unwrap();
    while job.stage != target {
        let next = job.stage.successor().unwrap();
        job = registry
            .transition(id, next, None, None, Actor::External)
            .unwrap();
    }
    job
}
