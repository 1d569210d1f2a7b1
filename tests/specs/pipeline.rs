// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Full pipeline walks and bag accumulation.

use crate::prelude::*;
use im2_core::{Bag, Stage};
use im2_registry::Actor;
use serde_json::json;

#[test]
fn full_walk_from_submitted_to_complete() {
    let h = harness();
    create(&h.registry, "j1", "u");

    let job = advance_to(&h.registry, "j1", Stage::Complete);
    assert_eq!(job.stage, Stage::Complete);

    // One entry per stage of the walk: submitted through complete
    let history = h.registry.history("j1").unwrap();
    assert_eq!(history.len(), 13);
    assert_eq!(history[0].stage, Stage::Submitted);
    assert_eq!(history[12].stage, Stage::Complete);

    // Every consecutive pair is a legal forward step
    for pair in history.windows(2) {
        assert_eq!(pair[0].stage.successor(), Some(pair[1].stage));
    }

    let stats = h.registry.stats();
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.active, 0);
}

#[test]
fn bag_is_the_left_fold_of_all_patches() {
    let h = harness();
    create(&h.registry, "j5", "u");

    h.registry
        .transition(
            "j5",
            Stage::Categorizing,
            Some(Bag::from([("a", json!(1))])),
            None,
            Actor::External,
        )
        .unwrap();
    h.registry
        .transition(
            "j5",
            Stage::Categorized,
            Some(Bag::from([("b", json!(2))])),
            None,
            Actor::External,
        )
        .unwrap();
    h.registry
        .transition(
            "j5",
            Stage::MetadataExtracting,
            None,
            None,
            Actor::External,
        )
        .unwrap();
    h.registry
        .transition(
            "j5",
            Stage::MetadataExtracted,
            Some(Bag::from([("a", json!(3))])),
            None,
            Actor::External,
        )
        .unwrap();

    // Later writes overwrite keys, untouched keys survive
    let job = h.registry.get("j5").unwrap();
    assert_eq!(job.bag.get("a"), Some(&json!(3)));
    assert_eq!(job.bag.get("b"), Some(&json!(2)));
    assert_eq!(job.bag.len(), 2);

    // Each history entry snapshots the bag as of its transition
    let history = h.registry.history("j5").unwrap();
    assert_eq!(history[1].bag_snapshot.get("a"), Some(&json!(1)));
    assert_eq!(history[4].bag_snapshot.get("a"), Some(&json!(3)));
}

#[test]
fn history_length_counts_only_committed_transitions() {
    let h = harness();
    create(&h.registry, "j1", "u");
    advance_to(&h.registry, "j1", Stage::Categorized);

    // Idempotent repeats and rejected transitions leave no trace
    h.registry
        .transition("j1", Stage::Categorized, None, None, Actor::External)
        .unwrap();
    let _ = h
        .registry
        .transition("j1", Stage::Complete, None, None, Actor::External);

    assert_eq!(h.registry.history("j1").unwrap().len(), 3);
}
