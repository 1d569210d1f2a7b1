// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot persistence for crash recovery.
//!
//! Snapshots store the complete registry state at a point in time,
//! identified by the WAL sequence number. Recovery loads the snapshot and
//! replays WAL entries after that sequence. Files are zstd-compressed JSON
//! written via tmp + atomic rename + directory fsync, so a crash mid-save
//! can never clobber the previous snapshot.

use crate::RegistryState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Current snapshot schema version. Snapshots newer than this are rejected
/// at load so an old binary never misreads a new layout.
pub const CURRENT_SNAPSHOT_VERSION: u32 = 1;

// zstd level 3 is a good balance of speed and compression
const COMPRESSION_LEVEL: i32 = 3;

/// Errors that can occur in snapshot operations
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("compression error: {0}")]
    Compress(String),
    #[error("snapshot version {0} is newer than supported ({CURRENT_SNAPSHOT_VERSION})")]
    TooNew(u32),
}

/// A snapshot of the registry state at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub v: u32,
    /// WAL sequence number at the time of snapshot
    pub seq: u64,
    pub state: RegistryState,
    pub created_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(seq: u64, state: RegistryState) -> Self {
        Self {
            v: CURRENT_SNAPSHOT_VERSION,
            seq,
            state,
            created_at: Utc::now(),
        }
    }

    /// Save the snapshot durably.
    ///
    /// Write ordering: tmp write → tmp fsync → atomic rename → directory
    /// fsync. Only after this returns is it safe to truncate the WAL up to
    /// `self.seq`.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json_bytes = serde_json::to_vec(self)?;
        let compressed = zstd::encode_all(json_bytes.as_slice(), COMPRESSION_LEVEL)
            .map_err(|e| SnapshotError::Compress(e.to_string()))?;

        let tmp_path = path.with_extension("tmp");
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&compressed)?;
            file.sync_all()?;
        }

        fs::rename(&tmp_path, path)?;

        if let Some(parent) = path.parent() {
            let dir = File::open(parent)?;
            dir.sync_all()?;
        }

        Ok(())
    }

    /// Load a snapshot if one exists.
    ///
    /// Returns `Ok(None)` if the file doesn't exist or is corrupt. Corrupt
    /// snapshots are quarantined so recovery can proceed via WAL
    /// replay from scratch. A snapshot written by a newer binary is an error,
    /// not a silent fallback.
    pub fn load(path: &Path) -> Result<Option<Self>, SnapshotError> {
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(path)?;
        let decoder = zstd::stream::read::Decoder::new(file)
            .map_err(|e| SnapshotError::Io(std::io::Error::other(e.to_string())))?;
        let value: serde_json::Value = match serde_json::from_reader(decoder) {
            Ok(v) => v,
            Err(e) => {
                let quarantined = quarantine(path)?;
                warn!(
                    error = %e,
                    path = %path.display(),
                    moved_to = %quarantined.display(),
                    "corrupt snapshot quarantined, recovering from WAL",
                );
                return Ok(None);
            }
        };

        let version = value.get("v").and_then(|v| v.as_u64()).unwrap_or(1) as u32;
        if version > CURRENT_SNAPSHOT_VERSION {
            return Err(SnapshotError::TooNew(version));
        }

        match serde_json::from_value(value) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                let quarantined = quarantine(path)?;
                warn!(
                    error = %e,
                    path = %path.display(),
                    moved_to = %quarantined.display(),
                    "unreadable snapshot quarantined, recovering from WAL",
                );
                Ok(None)
            }
        }
    }
}

/// How many quarantined copies of a damaged store file to keep around.
const KEPT_CORRUPT_FILES: u32 = 3;

/// Move a damaged store file aside so recovery can proceed.
///
/// Returns the file's new location. The most recent copies live at
/// `.corrupt`, `.corrupt.2`, `.corrupt.3`; anything older falls off the end.
/// Shared by snapshots and the WAL, which quarantine and then rebuild.
pub(crate) fn quarantine(path: &Path) -> std::io::Result<PathBuf> {
    let slot = |n: u32| {
        if n == 1 {
            path.with_extension("corrupt")
        } else {
            path.with_extension(format!("corrupt.{n}"))
        }
    };

    // Age every kept copy by one slot; the oldest is dropped first so the
    // renames never collide
    let _ = fs::remove_file(slot(KEPT_CORRUPT_FILES));
    for n in (2..=KEPT_CORRUPT_FILES).rev() {
        let _ = fs::rename(slot(n - 1), slot(n));
    }

    let dest = slot(1);
    fs::rename(path, &dest)?;
    Ok(dest)
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
