// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSONL transaction log.
//!
//! Each committed job transaction is one line of JSON:
//! `{"seq":N,"record":{...}}\n`. The record carries the full job post-image
//! and the history entry committed with it, so replaying the log after a
//! snapshot rebuilds both the jobs table and the history table. `append`
//! fsyncs before returning; the WAL write is the commit point of every
//! transaction.
//!
//! The only damage a crash can leave is a torn final line (appends are
//! single writes followed by fsync). On open, a log with a torn tail is
//! quarantined and replaced by its intact prefix, so replay never sees a
//! half-committed transaction.

use im2_core::{HistoryEntry, Job};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Errors that can occur in Wal operations
#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One committed transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum JournalRecord {
    /// A new job row plus its creation history entry.
    JobInserted { job: Job, entry: HistoryEntry },
    /// A job post-image plus the history entry appended in the same
    /// transaction.
    JobUpdated { job: Job, entry: HistoryEntry },
}

impl JournalRecord {
    pub fn job(&self) -> &Job {
        match self {
            JournalRecord::JobInserted { job, .. } | JournalRecord::JobUpdated { job, .. } => job,
        }
    }

    pub fn entry(&self) -> &HistoryEntry {
        match self {
            JournalRecord::JobInserted { entry, .. } | JournalRecord::JobUpdated { entry, .. } => {
                entry
            }
        }
    }
}

/// Serialization helper for writing WAL lines without cloning the record.
#[derive(Serialize)]
struct WalLineRef<'a> {
    seq: u64,
    record: &'a JournalRecord,
}

/// Deserialization helper for reading WAL lines.
#[derive(Deserialize)]
struct WalLine {
    seq: u64,
    record: JournalRecord,
}

/// A single WAL entry with its global sequence number.
#[derive(Debug, Clone)]
pub struct WalEntry {
    pub seq: u64,
    pub record: JournalRecord,
}

/// Everything decodable in the log, front to back.
struct LogContents {
    entries: Vec<WalEntry>,
    /// The final line failed to decode (torn write from a crash).
    torn_tail: bool,
}

/// Append-only JSONL log of committed transactions.
pub struct Wal {
    file: File,
    path: PathBuf,
    /// Sequence number of the last appended record.
    write_seq: u64,
}

impl Wal {
    /// Open or create a WAL at the given path.
    ///
    /// The whole log is decoded once to find the next sequence number. A
    /// torn tail is quarantined (the damaged file moves to a `.corrupt`
    /// sibling) and the log is rebuilt from the entries that decoded.
    pub fn open(path: &Path) -> Result<Self, WalError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = Self::open_append(path)?;
        let contents = Self::read_log(&file)?;

        if contents.torn_tail {
            drop(file);
            let quarantined = crate::snapshot::quarantine(path)?;
            warn!(
                path = %path.display(),
                moved_to = %quarantined.display(),
                kept_entries = contents.entries.len(),
                "WAL has a torn tail, quarantined it and keeping the intact prefix",
            );
            file = Self::rebuild(path, &contents.entries)?;
        }

        let write_seq = contents.entries.iter().map(|e| e.seq).max().unwrap_or(0);

        Ok(Self {
            file,
            path: path.to_owned(),
            write_seq,
        })
    }

    fn open_append(path: &Path) -> Result<File, WalError> {
        Ok(OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?)
    }

    /// One encoded log line, newline included.
    fn encode_line(seq: u64, record: &JournalRecord) -> Result<Vec<u8>, WalError> {
        let mut bytes = serde_json::to_vec(&WalLineRef { seq, record })?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Decode the log front to back, collecting every readable entry.
    ///
    /// Stops at the first line that fails to decode: a torn final line is
    /// the expected crash artifact, and nothing after a damaged line can be
    /// trusted either way.
    fn read_log(file: &File) -> Result<LogContents, WalError> {
        let mut reader = BufReader::new(file.try_clone()?);
        reader.seek(SeekFrom::Start(0))?;

        let mut entries = Vec::new();
        let mut torn_tail = false;
        let mut line = String::new();

        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    torn_tail = true;
                    break;
                }
                Err(e) => return Err(e.into()),
            }

            let text = line.trim();
            if text.is_empty() {
                continue;
            }

            match serde_json::from_str::<WalLine>(text) {
                Ok(parsed) => entries.push(WalEntry {
                    seq: parsed.seq,
                    record: parsed.record,
                }),
                Err(_) => {
                    torn_tail = true;
                    break;
                }
            }
        }

        Ok(LogContents { entries, torn_tail })
    }

    /// Write a fresh log holding exactly `entries`, fsynced, then reopen it
    /// for appending.
    fn rebuild(path: &Path, entries: &[WalEntry]) -> Result<File, WalError> {
        {
            let mut fresh = File::create(path)?;
            for entry in entries {
                fresh.write_all(&Self::encode_line(entry.seq, &entry.record)?)?;
            }
            fresh.sync_all()?;
        }
        Self::open_append(path)
    }

    /// Append a record and fsync it.
    ///
    /// Returns the assigned sequence number. When this returns Ok the
    /// transaction is durable; an error means nothing was committed from the
    /// caller's point of view (a torn line is discarded on the next open).
    pub fn append(&mut self, record: &JournalRecord) -> Result<u64, WalError> {
        let seq = self.write_seq + 1;
        self.file.write_all(&Self::encode_line(seq, record)?)?;
        self.file.sync_all()?;
        self.write_seq = seq;
        Ok(seq)
    }

    /// Sequence number of the last appended record.
    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    /// All entries with `seq > after`, for replaying over a snapshot.
    pub fn entries_after(&self, after: u64) -> Result<Vec<WalEntry>, WalError> {
        let contents = Self::read_log(&self.file)?;
        if contents.torn_tail {
            warn!(
                path = %self.path.display(),
                "skipping torn WAL tail during replay",
            );
        }
        Ok(contents
            .entries
            .into_iter()
            .filter(|entry| entry.seq > after)
            .collect())
    }

    /// Drop entries with `seq <= through`, keeping the rest.
    ///
    /// Called after a checkpoint to reclaim disk space. The retained tail is
    /// written to a temp file and renamed into place.
    pub fn truncate_through(&mut self, through: u64) -> Result<(), WalError> {
        let kept = self.entries_after(through)?;

        let tmp_path = self.path.with_extension("tmp");
        {
            let mut tmp_file = File::create(&tmp_path)?;
            for entry in &kept {
                tmp_file.write_all(&Self::encode_line(entry.seq, &entry.record)?)?;
            }
            tmp_file.sync_all()?;
        }

        std::fs::rename(&tmp_path, &self.path)?;
        self.file = Self::open_append(&self.path)?;

        Ok(())
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
