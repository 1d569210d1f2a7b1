// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The transition engine.
//!
//! All writes funnel through here: creation, the generic transition
//! contract, and the worker claim CAS. Each operation runs its validation
//! inside the store's per-job transaction, so the stage it checks is the
//! stage it commits against.

use crate::bus::EventSink;
use crate::pause::PauseSwitch;
use im2_core::{
    Bag, Clock, Event, IdGen, Job, JobConfig, RegistryError, Stage, StepKind, SystemClock,
    UuidIdGen,
};
use im2_storage::{JobStore, TxnOutcome};
use std::sync::Arc;
use tracing::{info, warn};

/// Who is asking for a transition.
///
/// System actors (operator tooling acting on the registry's behalf) bypass
/// the pause gate; external callers, including stage workers, do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    External,
    System,
}

/// Parameters for job creation.
#[derive(Debug, Clone, Default)]
pub struct CreateJob {
    /// Caller-supplied id; must be unique. Generated when absent.
    pub id: Option<String>,
    pub owner: String,
    pub source_ref: String,
    pub display_name: String,
    pub engine_hint: Option<String>,
    pub trace_id: Option<String>,
}

/// The job queue and state-transition coordinator.
pub struct Registry<C: Clock = SystemClock, G: IdGen = UuidIdGen> {
    store: Arc<JobStore>,
    bus: Arc<dyn EventSink>,
    pause: PauseSwitch,
    clock: C,
    ids: G,
}

impl Registry {
    pub fn new(store: Arc<JobStore>, bus: Arc<dyn EventSink>, start_paused: bool) -> Self {
        Self::with_parts(store, bus, SystemClock, UuidIdGen, start_paused)
    }
}

impl<C: Clock, G: IdGen> Registry<C, G> {
    pub fn with_parts(
        store: Arc<JobStore>,
        bus: Arc<dyn EventSink>,
        clock: C,
        ids: G,
        start_paused: bool,
    ) -> Self {
        Self {
            store,
            bus,
            pause: PauseSwitch::new(start_paused),
            clock,
            ids,
        }
    }

    pub(crate) fn store(&self) -> &JobStore {
        &self.store
    }

    pub(crate) fn clock(&self) -> &C {
        &self.clock
    }

    pub(crate) fn pause_switch(&self) -> &PauseSwitch {
        &self.pause
    }

    /// Create a job in `submitted` and publish `created`.
    pub fn create_job(&self, req: CreateJob) -> Result<Job, RegistryError> {
        if self.pause.is_paused() {
            return Err(RegistryError::PipelinePaused);
        }
        for (field, value) in [
            ("owner", &req.owner),
            ("source_ref", &req.source_ref),
            ("display_name", &req.display_name),
        ] {
            if value.trim().is_empty() {
                return Err(RegistryError::BadRequest(format!("{field} is required")));
            }
        }

        let now = self.clock.epoch_ms();
        let id = match req.id.filter(|s| !s.trim().is_empty()) {
            Some(id) => id,
            None => self.ids.next(),
        };
        let trace_id = match req.trace_id.filter(|s| !s.trim().is_empty()) {
            Some(trace) => trace,
            None => format!("{now}-{id}"),
        };

        let job = Job::new(
            JobConfig {
                id: id.into(),
                owner: req.owner.into(),
                source_ref: req.source_ref,
                display_name: req.display_name,
                engine_hint: req.engine_hint,
                trace_id: trace_id.into(),
            },
            now,
        );

        let committed = self
            .store
            .insert_job(job, |job| self.publish(Event::created(job)))?;
        info!(job_id = %committed.job.id, owner = %committed.job.owner, "job created");
        Ok(committed.job)
    }

    /// Move a job to `target`, merging `bag_patch` into its bag.
    ///
    /// An idempotent request (`target` equals the current stage) returns the
    /// current row without history or events. While paused, non-terminal
    /// targets are refused unless the caller is a system actor; terminal
    /// targets always pass so in-flight work can drain.
    pub fn transition(
        &self,
        id: &str,
        target: Stage,
        bag_patch: Option<Bag>,
        error: Option<String>,
        actor: Actor,
    ) -> Result<Job, RegistryError> {
        let now = self.clock.epoch_ms();
        let paused = self.pause.is_paused();

        let committed = self.store.update_job(
            id,
            false,
            |current, _| {
                let kind = Stage::classify(current.stage, target)?;
                if kind == StepKind::Idempotent {
                    return Ok(TxnOutcome::Noop);
                }
                if paused && !target.is_terminal() && actor != Actor::System {
                    return Err(RegistryError::PipelinePaused);
                }

                let mut next = current.clone();
                next.stage = target;
                if let Some(patch) = &bag_patch {
                    next.bag.merge(patch);
                }
                next.touch(now);

                let entry_error = match kind {
                    StepKind::Fail => {
                        let Some(message) = error.clone().filter(|e| !e.trim().is_empty()) else {
                            return Err(RegistryError::BadRequest(
                                "error message is required when failing a job".into(),
                            ));
                        };
                        next.last_error = Some(message.clone());
                        Some(message)
                    }
                    StepKind::Forward => {
                        next.last_error = None;
                        None
                    }
                    // Cancel keeps whatever error the job died with
                    _ => None,
                };

                Ok(TxnOutcome::Apply {
                    job: next,
                    entry_error,
                })
            },
            |job| self.publish(Event::updated(job)),
        )?;

        Ok(committed.job)
    }

    /// Worker claim: compare-and-set out of `from` into `to`.
    ///
    /// The serialization point that yields at-most-one active worker per job
    /// per stage. Losing the race is a normal outcome (`Contended`), as is
    /// finding the pipeline paused.
    pub fn claim(&self, id: &str, from: Stage, to: Stage) -> Result<Job, RegistryError> {
        let now = self.clock.epoch_ms();
        let paused = self.pause.is_paused();

        let committed = self.store.update_job(
            id,
            false,
            |current, _| {
                if paused {
                    return Err(RegistryError::PipelinePaused);
                }
                if current.stage != from {
                    return Err(RegistryError::Contended {
                        expected: from,
                        actual: current.stage,
                    });
                }
                if Stage::classify(from, to)? != StepKind::Forward {
                    return Err(RegistryError::IllegalTransition { from, to });
                }

                let mut next = current.clone();
                next.stage = to;
                next.last_error = None;
                next.touch(now);
                Ok(TxnOutcome::Apply {
                    job: next,
                    entry_error: None,
                })
            },
            |job| self.publish(Event::updated(job)),
        )?;

        Ok(committed.job)
    }

    /// Halt admission of new work and publish `paused`.
    pub fn pause(&self) {
        self.pause.set(true);
        info!("pipeline paused");
        self.publish(Event::Paused {
            at_ms: self.clock.epoch_ms(),
        });
    }

    /// Re-open admission and publish `resumed`.
    pub fn resume(&self) {
        self.pause.set(false);
        info!("pipeline resumed");
        self.publish(Event::Resumed {
            at_ms: self.clock.epoch_ms(),
        });
    }

    pub fn is_paused(&self) -> bool {
        self.pause.is_paused()
    }

    /// Best-effort publication; the committed transition stands either way.
    pub(crate) fn publish(&self, event: Event) {
        if let Err(e) = self.bus.publish(&event) {
            warn!(error = %e, topic = event.topic(), "event publish failed");
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "property_tests.rs"]
mod property_tests;
