// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Storage layer for the IM2 job registry.
//!
//! Jobs and their history live in a materialized in-memory state backed by
//! a JSONL write-ahead log. Each transaction appends one WAL record (the
//! job post-image plus the history entry it commits) and fsyncs before the
//! mutation becomes visible; recovery replays the WAL over the most recent
//! zstd snapshot.

mod snapshot;
mod state;
mod store;
mod wal;

pub use snapshot::{Snapshot, SnapshotError, CURRENT_SNAPSHOT_VERSION};
pub use state::{JobFilter, RegistryState};
pub use store::{Committed, JobStore, RecoveryReport, TxnOutcome};
pub use wal::{JournalRecord, Wal, WalEntry, WalError};
