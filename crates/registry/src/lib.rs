// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Transition engine and worker protocol for the IM2 job registry.
//!
//! [`Registry`] is the write-side coordinator: it validates transitions
//! against the stage machine, serializes them through the store's per-job
//! locks, and publishes lifecycle events after each commit. The read side
//! (list, get, history, stats) is lock-brief and tolerates slightly stale
//! answers.

mod bus;
mod engine;
mod pause;
mod query;
mod rewind;

#[cfg(test)]
mod test_support;

pub use bus::{BroadcastBus, EventSink, PublishError};
pub use engine::{Actor, CreateJob, Registry};
pub use pause::PauseSwitch;
pub use query::Stats;
pub use rewind::rewind_target;
