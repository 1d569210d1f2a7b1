// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized registry state rebuilt from WAL replay.

use crate::wal::JournalRecord;
use im2_core::{HistoryEntry, Job, OwnerId, Stage};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Read-side filters for job listings.
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub owner: Option<OwnerId>,
    /// Empty means any stage.
    pub stages: Vec<Stage>,
    pub created_after_ms: Option<u64>,
    pub created_before_ms: Option<u64>,
}

impl JobFilter {
    fn matches(&self, job: &Job) -> bool {
        if let Some(owner) = &self.owner {
            if &job.owner != owner {
                return false;
            }
        }
        if !self.stages.is_empty() && !self.stages.contains(&job.stage) {
            return false;
        }
        if let Some(after) = self.created_after_ms {
            if job.created_at_ms < after {
                return false;
            }
        }
        if let Some(before) = self.created_before_ms {
            if job.created_at_ms > before {
                return false;
            }
        }
        true
    }
}

/// Jobs and their history, keyed by job id.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct RegistryState {
    pub jobs: HashMap<String, Job>,
    pub history: HashMap<String, Vec<HistoryEntry>>,
}

impl RegistryState {
    /// Apply a committed record.
    ///
    /// Idempotent per history seq, so replaying a record that is already
    /// reflected (snapshot raced a commit) is harmless.
    pub fn apply(&mut self, record: &JournalRecord) {
        let job = record.job();
        let entry = record.entry();
        let id = job.id.as_str();

        let entries = self.history.entry(id.to_string()).or_default();
        let last_seq = entries.last().map(|e| e.seq).unwrap_or(0);
        if entry.seq <= last_seq {
            return;
        }
        entries.push(entry.clone());
        self.jobs.insert(id.to_string(), job.clone());
    }

    pub fn get_job(&self, id: &str) -> Option<&Job> {
        self.jobs.get(id)
    }

    pub fn history_of(&self, id: &str) -> &[HistoryEntry] {
        self.history.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    /// The seq the next history entry for `id` should carry.
    pub fn next_seq(&self, id: &str) -> u64 {
        self.history_of(id).last().map(|e| e.seq).unwrap_or(0) + 1
    }

    pub fn total_jobs(&self) -> usize {
        self.jobs.len()
    }

    /// Filtered listing, newest first (`created_at` desc, id as tie-break).
    pub fn list(&self, filter: &JobFilter, limit: usize, offset: usize) -> Vec<Job> {
        let mut jobs: Vec<&Job> = self.jobs.values().filter(|j| filter.matches(j)).collect();
        jobs.sort_by(|a, b| {
            b.created_at_ms
                .cmp(&a.created_at_ms)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
        jobs.into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Jobs currently in `stage`, oldest first, for worker polling.
    pub fn candidates(&self, stage: Stage, engine_hint: Option<&str>, limit: usize) -> Vec<Job> {
        let mut jobs: Vec<&Job> = self
            .jobs
            .values()
            .filter(|j| j.stage == stage)
            .filter(|j| match engine_hint {
                Some(hint) => j.engine_hint.as_deref() == Some(hint),
                None => true,
            })
            .collect();
        jobs.sort_by(|a, b| {
            a.created_at_ms
                .cmp(&b.created_at_ms)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
        jobs.into_iter().take(limit).cloned().collect()
    }

    /// Job counts per stage, zero-filled, in pipeline order.
    pub fn count_by_stage(&self) -> IndexMap<Stage, u64> {
        let mut counts: IndexMap<Stage, u64> = Stage::ALL.into_iter().map(|s| (s, 0)).collect();
        for job in self.jobs.values() {
            if let Some(count) = counts.get_mut(&job.stage) {
                *count += 1;
            }
        }
        counts
    }

    /// Diagnostic cross-check of the state invariants.
    ///
    /// Verifies that every job's stage matches its newest history entry and
    /// that history seqs are dense from 1. Run after recovery; a violation
    /// means the WAL and snapshot disagree.
    pub fn check_invariants(&self) -> Result<(), String> {
        for (id, job) in &self.jobs {
            let entries = self.history_of(id);
            let Some(last) = entries.last() else {
                return Err(format!("job {id} has no history"));
            };
            if last.stage != job.stage {
                return Err(format!(
                    "job {id} is in {} but newest history entry says {}",
                    job.stage, last.stage
                ));
            }
            for (i, entry) in entries.iter().enumerate() {
                if entry.seq != i as u64 + 1 {
                    return Err(format!(
                        "job {id} history seq {} at position {i}",
                        entry.seq
                    ));
                }
            }
        }
        for id in self.history.keys() {
            if !self.jobs.contains_key(id) {
                return Err(format!("history for unknown job {id}"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
