// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cancel semantics and terminal-state invariants.

use crate::prelude::*;
use im2_core::{RegistryError, Stage};
use im2_registry::Actor;

#[test]
fn double_cancel_is_idempotent() {
    let h = harness();
    create(&h.registry, "j6", "u");

    let first = h.registry.cancel("j6").unwrap();
    assert_eq!(first.stage, Stage::Canceled);
    let history_len = h.registry.history("j6").unwrap().len();

    let second = h.registry.cancel("j6").unwrap();
    assert_eq!(second.stage, Stage::Canceled);
    assert_eq!(h.registry.history("j6").unwrap().len(), history_len);
}

#[test]
fn canceled_jobs_accept_no_further_transitions() {
    let h = harness();
    create(&h.registry, "j1", "u");
    h.registry.cancel("j1").unwrap();

    for target in [Stage::Categorizing, Stage::Failed, Stage::Complete] {
        let result = h
            .registry
            .transition("j1", target, None, None, Actor::External);
        assert!(result.is_err(), "{target}");
    }

    let history = h.registry.history("j1").unwrap();
    assert_eq!(history.last().map(|e| e.stage), Some(Stage::Canceled));
}

#[test]
fn complete_jobs_cannot_be_canceled() {
    let h = harness();
    create(&h.registry, "j1", "u");
    advance_to(&h.registry, "j1", Stage::Complete);

    assert_eq!(
        h.registry.cancel("j1").map(|_| ()),
        Err(RegistryError::Terminal)
    );
    assert_eq!(h.registry.get("j1").unwrap().stage, Stage::Complete);
}

#[test]
fn failed_jobs_can_be_finalized_by_cancel() {
    let h = harness();
    create(&h.registry, "j1", "u");
    h.registry
        .transition("j1", Stage::Failed, None, Some("oom".into()), Actor::External)
        .unwrap();

    let job = h.registry.cancel("j1").unwrap();
    assert_eq!(job.stage, Stage::Canceled);
}
