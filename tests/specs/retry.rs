// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry rewinds a failed job to its last known-good stage.

use crate::prelude::*;
use im2_core::{Bag, Stage, TOPIC_JOBS_LIFECYCLE};
use im2_registry::Actor;
use serde_json::json;

#[test]
fn retry_resumes_from_the_last_good_stage() {
    let h = harness();
    create(&h.registry, "j2", "u");
    advance_to(&h.registry, "j2", Stage::Splitting);

    h.registry
        .transition(
            "j2",
            Stage::Failed,
            None,
            Some("decoder crashed".into()),
            Actor::External,
        )
        .unwrap();
    assert_eq!(
        h.registry.get("j2").unwrap().last_error.as_deref(),
        Some("decoder crashed")
    );

    let job = h.registry.retry("j2").unwrap();

    // The most recent non-failed entry was the splitting one
    assert_eq!(job.stage, Stage::Splitting);
    assert!(job.last_error.is_none());

    // Append-only: walk to splitting (8 entries), the failure, the rewind
    let history = h.registry.history("j2").unwrap();
    assert_eq!(history.len(), 10);
    assert_eq!(history[8].stage, Stage::Failed);
    assert_eq!(history[9].stage, Stage::Splitting);
}

#[test]
fn retry_preserves_outputs_accumulated_before_the_failure() {
    let h = harness();
    create(&h.registry, "j1", "u");
    h.registry
        .transition(
            "j1",
            Stage::Categorizing,
            Some(Bag::from([("staged_path", json!("/staging/j1"))])),
            None,
            Actor::External,
        )
        .unwrap();
    h.registry
        .transition("j1", Stage::Failed, None, Some("oom".into()), Actor::External)
        .unwrap();

    let job = h.registry.retry("j1").unwrap();
    assert_eq!(job.bag.get("staged_path"), Some(&json!("/staging/j1")));
}

#[test]
fn retry_publishes_retried_on_the_jobs_topic() {
    let h = harness();
    create(&h.registry, "j1", "u");
    h.registry
        .transition("j1", Stage::Failed, None, Some("oom".into()), Actor::External)
        .unwrap();

    let mut events = h.bus.subscribe(TOPIC_JOBS_LIFECYCLE).unwrap();
    h.registry.retry("j1").unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&events.try_recv().unwrap()).unwrap();
    assert_eq!(value["event"], "retried");
    assert_eq!(value["job_id"], "j1");
}

#[test]
fn failed_then_retried_jobs_can_complete() {
    let h = harness();
    create(&h.registry, "j1", "u");
    advance_to(&h.registry, "j1", Stage::Staging);
    h.registry
        .transition("j1", Stage::Failed, None, Some("disk full".into()), Actor::External)
        .unwrap();
    h.registry.retry("j1").unwrap();

    let job = advance_to(&h.registry, "j1", Stage::Complete);
    assert_eq!(job.stage, Stage::Complete);
    assert_eq!(h.registry.stats().completed, 1);
}
