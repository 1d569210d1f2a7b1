// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup, recovery, and shutdown.
//!
//! Startup acquires the single-instance lock, recovers the store from
//! snapshot + WAL, sanity-checks the recovered state, and builds the
//! registry. Shutdown writes one last checkpoint so the next start replays
//! an empty WAL tail.

use crate::env::{Config, ConfigError};
use fs2::FileExt;
use im2_registry::{BroadcastBus, EventSink, Registry};
use im2_storage::JobStore;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

const LOCK_FILE: &str = "im2d.lock";

/// Checkpoint interval (60 seconds)
const CHECKPOINT_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("another im2d holds the lock at {0}")]
    LockFailed(PathBuf),
    #[error("store recovery failed: {0}")]
    Store(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A started daemon: registry, bus, store, and the held instance lock.
pub struct Daemon {
    pub registry: Arc<Registry>,
    pub bus: Arc<BroadcastBus>,
    pub store: Arc<JobStore>,
    pub config: Config,
    // Held for the process lifetime; dropping releases the flock
    #[allow(dead_code)]
    lock_file: File,
}

/// Bring the registry up from disk.
pub fn startup(config: Config) -> Result<Daemon, LifecycleError> {
    std::fs::create_dir_all(&config.data_dir)?;

    let lock_path = config.data_dir.join(LOCK_FILE);
    let mut lock_file = File::create(&lock_path)?;
    if lock_file.try_lock_exclusive().is_err() {
        return Err(LifecycleError::LockFailed(lock_path));
    }
    let _ = writeln!(lock_file, "{}", std::process::id());

    let (store, report) = JobStore::open(&config.data_dir)
        .map_err(|e| LifecycleError::Store(e.to_string()))?;
    if let Err(violation) = store.check_invariants() {
        // Recoverable: the registry still serves, but something disagrees
        warn!(violation = %violation, "recovered state failed invariant check");
    }
    info!(
        jobs = report.jobs,
        replayed = report.replayed,
        paused = config.start_paused,
        "registry recovered",
    );

    let store = Arc::new(store);
    let bus = Arc::new(BroadcastBus::default());
    let registry = Arc::new(Registry::new(
        Arc::clone(&store),
        Arc::clone(&bus) as Arc<dyn EventSink>,
        config.start_paused,
    ));

    Ok(Daemon {
        registry,
        bus,
        store,
        config,
        lock_file,
    })
}

impl Daemon {
    /// Final checkpoint before exit; failure is logged, not fatal.
    pub fn shutdown(&self) {
        match self.store.checkpoint() {
            Ok(seq) => info!(seq, "final checkpoint written"),
            Err(e) => error!(error = %e, "final checkpoint failed"),
        }
    }
}

/// Spawn the periodic checkpoint task.
///
/// Snapshots run on the blocking pool so serialization and fsync never
/// stall request handling.
pub fn spawn_checkpoint(store: Arc<JobStore>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CHECKPOINT_INTERVAL);
        // The first tick fires immediately; skip it
        interval.tick().await;

        loop {
            interval.tick().await;

            let store = Arc::clone(&store);
            let result = tokio::task::spawn_blocking(move || store.checkpoint()).await;
            match result {
                Ok(Ok(seq)) => tracing::debug!(seq, "checkpoint complete"),
                Ok(Err(e)) => warn!(error = %e, "checkpoint failed"),
                Err(e) => warn!(error = %e, "checkpoint task panicked"),
            }
        }
    });
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
