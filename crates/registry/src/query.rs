// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read side: listings, per-job fetch, aggregates.
//!
//! All reads are lock-brief clones of the materialized state; callers
//! tolerate answers that are a few seconds stale.

use crate::engine::Registry;
use im2_core::{Clock, HistoryEntry, IdGen, Job, RegistryError, Stage};
use im2_storage::JobFilter;
use indexmap::IndexMap;
use serde::Serialize;

/// Aggregate job counts.
#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub total: u64,
    /// Jobs in any non-terminal stage.
    pub active: u64,
    pub completed: u64,
    pub failed: u64,
    /// Every stage, zero-filled, in pipeline order.
    pub by_stage: IndexMap<Stage, u64>,
}

impl<C: Clock, G: IdGen> Registry<C, G> {
    pub fn get(&self, id: &str) -> Result<Job, RegistryError> {
        self.store().get(id).ok_or(RegistryError::NotFound)
    }

    pub fn history(&self, id: &str) -> Result<Vec<HistoryEntry>, RegistryError> {
        self.store().history(id).ok_or(RegistryError::NotFound)
    }

    pub fn list(&self, filter: &JobFilter, limit: usize, offset: usize) -> Vec<Job> {
        self.store().list(filter, limit, offset)
    }

    /// Jobs a worker could claim: currently in `stage`, oldest first.
    ///
    /// A plain read; no lease is taken and concurrent claimers are expected.
    pub fn list_candidates(
        &self,
        stage: Stage,
        engine_hint: Option<&str>,
        limit: usize,
    ) -> Vec<Job> {
        self.store().candidates(stage, engine_hint, limit)
    }

    pub fn stats(&self) -> Stats {
        let by_stage = self.store().count_by_stage();
        let total: u64 = by_stage.values().sum();
        let active = by_stage
            .iter()
            .filter(|(stage, _)| !stage.is_terminal())
            .map(|(_, count)| count)
            .sum();
        Stats {
            total,
            active,
            completed: by_stage.get(&Stage::Complete).copied().unwrap_or(0),
            failed: by_stage.get(&Stage::Failed).copied().unwrap_or(0),
            by_stage,
        }
    }
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
