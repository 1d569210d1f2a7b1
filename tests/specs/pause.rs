// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The pause switch: admission stops, in-flight work drains.

use crate::prelude::*;
use im2_core::{RegistryError, Stage, TOPIC_SYSTEM_LIFECYCLE};
use im2_registry::{Actor, CreateJob};

#[test]
fn paused_pipeline_refuses_claims_but_drains_cancels() {
    let h = harness();
    create(&h.registry, "j4", "u");
    advance_to(&h.registry, "j4", Stage::Staged);

    h.registry.pause();

    let result = h.registry.claim("j4", Stage::Staged, Stage::Splitting);
    assert_eq!(result.map(|_| ()), Err(RegistryError::PipelinePaused));

    // Terminal transitions still pass
    let job = h
        .registry
        .transition("j4", Stage::Canceled, None, None, Actor::External)
        .unwrap();
    assert_eq!(job.stage, Stage::Canceled);

    h.registry.resume();
    assert_eq!(h.registry.stats().by_stage[&Stage::Canceled], 1);
}

#[test]
fn paused_pipeline_refuses_creation() {
    let h = harness();
    h.registry.pause();

    let result = h.registry.create_job(CreateJob {
        id: Some("j1".into()),
        owner: "u".into(),
        source_ref: "/a.flac".into(),
        display_name: "a.flac".into(),
        ..Default::default()
    });
    assert_eq!(result.map(|_| ()), Err(RegistryError::PipelinePaused));

    h.registry.resume();
    create(&h.registry, "j1", "u");
}

#[test]
fn fail_still_lands_while_paused() {
    let h = harness();
    create(&h.registry, "j1", "u");
    advance_to(&h.registry, "j1", Stage::Splitting);
    h.registry.pause();

    let job = h
        .registry
        .transition(
            "j1",
            Stage::Failed,
            None,
            Some("worker died".into()),
            Actor::External,
        )
        .unwrap();
    assert_eq!(job.stage, Stage::Failed);
}

#[test]
fn pause_and_resume_publish_system_events() {
    let h = harness();
    let mut events = h.bus.subscribe(TOPIC_SYSTEM_LIFECYCLE).unwrap();

    h.registry.pause();
    h.registry.resume();

    let paused: serde_json::Value =
        serde_json::from_str(&events.try_recv().unwrap()).unwrap();
    let resumed: serde_json::Value =
        serde_json::from_str(&events.try_recv().unwrap()).unwrap();
    assert_eq!(paused["event"], "paused");
    assert_eq!(resumed["event"], "resumed");
}
