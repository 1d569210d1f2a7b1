// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transactional job store.
//!
//! `JobStore` is the single write path for jobs. Every mutation runs under
//! a per-job lock (a stripe keyed by a stable hash of the id) that is
//! acquired *before* the current row is read and held until the WAL record
//! is fsynced and applied, so the stage a mutator observes cannot change
//! before commit. Mutations on different jobs proceed in parallel up to the
//! stripe count; two mutations on the same job are strictly serialized.

use crate::snapshot::{Snapshot, SnapshotError};
use crate::state::{JobFilter, RegistryState};
use crate::wal::{JournalRecord, Wal};
use im2_core::{HistoryEntry, Job, RegistryError, Stage};
use indexmap::IndexMap;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const LOCK_STRIPES: usize = 64;

const WAL_FILE: &str = "registry.wal";
const SNAPSHOT_FILE: &str = "registry.snapshot";

/// What a mutator decided to do with the row it was shown.
#[derive(Debug, Clone)]
pub enum TxnOutcome {
    /// Commit this post-image and append a history entry carrying
    /// `entry_error`.
    Apply {
        job: Job,
        entry_error: Option<String>,
    },
    /// Leave the row untouched; no WAL write, no history entry.
    Noop,
}

/// Result of a committed (or no-op) transaction.
#[derive(Debug, Clone)]
pub struct Committed {
    pub job: Job,
    /// The history entry appended by this transaction, absent for no-ops.
    pub appended: Option<HistoryEntry>,
}

/// What recovery found on disk.
#[derive(Debug, Clone, Copy)]
pub struct RecoveryReport {
    pub jobs: usize,
    pub snapshot_seq: u64,
    pub replayed: usize,
}

/// Durable job store: materialized state + WAL + snapshot.
pub struct JobStore {
    state: Mutex<RegistryState>,
    wal: Mutex<Wal>,
    locks: Vec<Mutex<()>>,
    snapshot_path: PathBuf,
}

impl JobStore {
    /// Open the store in `data_dir`, recovering state from snapshot + WAL.
    pub fn open(data_dir: &Path) -> Result<(Self, RecoveryReport), RegistryError> {
        let snapshot_path = data_dir.join(SNAPSHOT_FILE);
        let wal_path = data_dir.join(WAL_FILE);

        let (mut state, snapshot_seq) = match Snapshot::load(&snapshot_path).map_err(unavailable)? {
            Some(snapshot) => (snapshot.state, snapshot.seq),
            None => (RegistryState::default(), 0),
        };

        let wal = Wal::open(&wal_path).map_err(unavailable)?;
        let tail = wal.entries_after(snapshot_seq).map_err(unavailable)?;
        let replayed = tail.len();
        for entry in &tail {
            state.apply(&entry.record);
        }

        let report = RecoveryReport {
            jobs: state.total_jobs(),
            snapshot_seq,
            replayed,
        };
        info!(
            jobs = report.jobs,
            snapshot_seq = report.snapshot_seq,
            replayed = report.replayed,
            "store recovered",
        );

        Ok((
            Self {
                state: Mutex::new(state),
                wal: Mutex::new(wal),
                locks: (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
                snapshot_path,
            },
            report,
        ))
    }

    /// Stable lock stripe for a job id.
    fn stripe(id: &str) -> usize {
        let digest = Sha256::digest(id.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        (u64::from_be_bytes(prefix) % LOCK_STRIPES as u64) as usize
    }

    /// Insert a new job with its creation history entry, atomically.
    ///
    /// `on_commit` runs after the WAL fsync while the per-job lock is still
    /// held, so whatever it does (event publication) observes commits in
    /// order.
    pub fn insert_job(
        &self,
        job: Job,
        on_commit: impl FnOnce(&Job),
    ) -> Result<Committed, RegistryError> {
        let _job_guard = self.locks[Self::stripe(job.id.as_str())].lock();

        if self.state.lock().get_job(job.id.as_str()).is_some() {
            return Err(RegistryError::Conflict);
        }

        let entry = HistoryEntry {
            job_id: job.id.clone(),
            seq: 1,
            stage: job.stage,
            at_ms: job.created_at_ms,
            bag_snapshot: job.bag.clone(),
            error: None,
        };
        let record = JournalRecord::JobInserted { job, entry };
        self.commit(&record)?;
        on_commit(record.job());

        Ok(Committed {
            job: record.job().clone(),
            appended: Some(record.entry().clone()),
        })
    }

    /// Run `mutate` against the current row inside a transaction.
    ///
    /// The mutator sees the row and its full history as of lock acquisition
    /// and either returns a post-image to commit, a no-op, or an error
    /// (which rolls the transaction back with nothing written). The history
    /// seq is assigned here, from the entry count observed under the lock.
    /// `on_commit` runs only for `Apply`, after the fsync, still under the
    /// per-job lock (events for one job observe commit order).
    pub fn update_job(
        &self,
        id: &str,
        expect_not_terminal: bool,
        mutate: impl FnOnce(&Job, &[HistoryEntry]) -> Result<TxnOutcome, RegistryError>,
        on_commit: impl FnOnce(&Job),
    ) -> Result<Committed, RegistryError> {
        let _job_guard = self.locks[Self::stripe(id)].lock();

        let (current, history) = {
            let state = self.state.lock();
            match state.get_job(id) {
                Some(job) => (job.clone(), state.history_of(id).to_vec()),
                None => return Err(RegistryError::NotFound),
            }
        };

        if expect_not_terminal && current.is_terminal() {
            return Err(RegistryError::Terminal);
        }

        match mutate(&current, &history)? {
            TxnOutcome::Noop => Ok(Committed {
                job: current,
                appended: None,
            }),
            TxnOutcome::Apply { job, entry_error } => {
                let entry = HistoryEntry {
                    job_id: job.id.clone(),
                    seq: history.len() as u64 + 1,
                    stage: job.stage,
                    at_ms: job.updated_at_ms,
                    bag_snapshot: job.bag.clone(),
                    error: entry_error,
                };
                let record = JournalRecord::JobUpdated { job, entry };
                self.commit(&record)?;
                on_commit(record.job());

                Ok(Committed {
                    job: record.job().clone(),
                    appended: Some(record.entry().clone()),
                })
            }
        }
    }

    /// Append to the WAL and apply to state.
    ///
    /// The state lock is taken while still holding the WAL lock so records
    /// become visible in seq order; a WAL failure rolls back (state is
    /// untouched).
    fn commit(&self, record: &JournalRecord) -> Result<(), RegistryError> {
        let mut wal = self.wal.lock();
        wal.append(record).map_err(unavailable)?;
        self.state.lock().apply(record);
        Ok(())
    }

    // ── Read side ────────────────────────────────────────────────────────────

    pub fn get(&self, id: &str) -> Option<Job> {
        self.state.lock().get_job(id).cloned()
    }

    pub fn history(&self, id: &str) -> Option<Vec<HistoryEntry>> {
        let state = self.state.lock();
        state.get_job(id)?;
        Some(state.history_of(id).to_vec())
    }

    pub fn list(&self, filter: &JobFilter, limit: usize, offset: usize) -> Vec<Job> {
        self.state.lock().list(filter, limit, offset)
    }

    pub fn candidates(&self, stage: Stage, engine_hint: Option<&str>, limit: usize) -> Vec<Job> {
        self.state.lock().candidates(stage, engine_hint, limit)
    }

    pub fn count_by_stage(&self) -> IndexMap<Stage, u64> {
        self.state.lock().count_by_stage()
    }

    pub fn total_jobs(&self) -> usize {
        self.state.lock().total_jobs()
    }

    /// Diagnostic invariant check over the whole state (see
    /// [`RegistryState::check_invariants`]).
    pub fn check_invariants(&self) -> Result<(), String> {
        self.state.lock().check_invariants()
    }

    // ── Maintenance ──────────────────────────────────────────────────────────

    /// Write a durable snapshot and truncate the WAL up to it.
    ///
    /// Returns the snapshotted sequence number. WAL truncation failure is
    /// non-fatal (the log is merely longer than it needs to be).
    pub fn checkpoint(&self) -> Result<u64, SnapshotError> {
        let (state_clone, seq) = {
            let wal = self.wal.lock();
            let state = self.state.lock();
            (state.clone(), wal.write_seq())
        };

        Snapshot::new(seq, state_clone).save(&self.snapshot_path)?;

        if let Err(e) = self.wal.lock().truncate_through(seq) {
            warn!(error = %e, "failed to truncate WAL after checkpoint");
        }

        Ok(seq)
    }
}

fn unavailable(err: impl std::fmt::Display) -> RegistryError {
    RegistryError::Unavailable(err.to_string())
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
