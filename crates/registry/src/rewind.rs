// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry and cancel.
//!
//! Retry rewinds a failed or canceled job to its last known-good stage,
//! derived from history. The bag is deliberately preserved: stages that
//! already ran left their outputs there, and stages are required (by
//! contract, not by the registry) to be idempotent with respect to their
//! own bag entries.

use crate::engine::Registry;
use im2_core::{Clock, Event, HistoryEntry, IdGen, Job, RegistryError, Stage};
use im2_storage::TxnOutcome;
use tracing::info;

/// The stage a retried job re-enters.
///
/// The most recent history entry that is neither `failed` nor `canceled`;
/// `submitted` if no such entry exists. History is append-only, so earlier
/// failure entries stay in place and the retry appends a fresh entry at the
/// rewind target.
pub fn rewind_target(history: &[HistoryEntry]) -> Stage {
    history
        .iter()
        .rev()
        .map(|entry| entry.stage)
        .find(|stage| !stage.is_aborted())
        .unwrap_or(Stage::Submitted)
}

impl<C: Clock, G: IdGen> Registry<C, G> {
    /// Rewind a failed or canceled job to its last known-good stage.
    ///
    /// Clears `last_error`, appends a history entry at the rewind target,
    /// and publishes `retried`. Refused while paused: the rewind target is
    /// always non-terminal, so a retry would admit new work.
    pub fn retry(&self, id: &str) -> Result<Job, RegistryError> {
        let now = self.clock().epoch_ms();
        let paused = self.pause_switch().is_paused();

        let committed = self.store().update_job(
            id,
            false,
            |current, history| {
                if !current.stage.is_aborted() {
                    return Err(RegistryError::BadRequest(
                        "only failed or canceled jobs can be retried".into(),
                    ));
                }
                if paused {
                    return Err(RegistryError::PipelinePaused);
                }

                let target = rewind_target(history);
                let mut next = current.clone();
                next.stage = target;
                next.last_error = None;
                next.touch(now);
                Ok(TxnOutcome::Apply {
                    job: next,
                    entry_error: None,
                })
            },
            |job| self.publish(Event::retried(job)),
        )?;

        info!(job_id = %committed.job.id, stage = %committed.job.stage, "job retried");
        Ok(committed.job)
    }

    /// Cancel a job.
    ///
    /// Non-terminal jobs (and failed ones, as a finalization) move to
    /// `canceled`; cancelling a canceled job is an idempotent no-op with no
    /// history entry. A completed job cannot be canceled. Cancel is always
    /// admitted while paused — it is how in-flight work drains.
    ///
    /// Active workers are not preempted: they discover the cancellation when
    /// their next claim or transition no longer matches.
    pub fn cancel(&self, id: &str) -> Result<Job, RegistryError> {
        let now = self.clock().epoch_ms();

        let committed = self.store().update_job(
            id,
            false,
            |current, _| match current.stage {
                Stage::Canceled => Ok(TxnOutcome::Noop),
                Stage::Complete => Err(RegistryError::Terminal),
                _ => {
                    let mut next = current.clone();
                    next.stage = Stage::Canceled;
                    next.touch(now);
                    Ok(TxnOutcome::Apply {
                        job: next,
                        entry_error: None,
                    })
                }
            },
            |job| self.publish(Event::canceled(job)),
        )?;

        Ok(committed.job)
    }
}

#[cfg(test)]
#[path = "rewind_tests.rs"]
mod tests;
