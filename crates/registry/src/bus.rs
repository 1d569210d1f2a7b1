// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event bus client.
//!
//! The registry hands events to an [`EventSink`] strictly after the
//! transition commits; `publish` is a synchronous enqueue invoked while the
//! per-job lock is still held, which is what keeps events for one job in
//! commit order. Delivery is best-effort: a publish failure is logged and
//! the committed transition stands, and subscribers must tolerate drops and
//! duplicates (they can rebuild from the history log).

use im2_core::{Event, TOPIC_JOBS_LIFECYCLE, TOPIC_SYSTEM_LIFECYCLE};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

/// Errors from handing an event to the bus.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("event serialization failed: {0}")]
    Serialize(String),
}

/// Broker-neutral publisher of lifecycle events onto named topics.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: &Event) -> Result<(), PublishError>;
}

/// In-process fan-out bus backed by per-topic broadcast channels.
///
/// Payloads are the JSON event bodies; slow subscribers lag and lose the
/// oldest messages, which the publication contract allows.
pub struct BroadcastBus {
    jobs: broadcast::Sender<String>,
    system: broadcast::Sender<String>,
}

impl BroadcastBus {
    pub fn new(capacity: usize) -> Self {
        let (jobs, _) = broadcast::channel(capacity);
        let (system, _) = broadcast::channel(capacity);
        Self { jobs, system }
    }

    /// Subscribe to one of the named topics; `None` for unknown topics.
    pub fn subscribe(&self, topic: &str) -> Option<broadcast::Receiver<String>> {
        match topic {
            TOPIC_JOBS_LIFECYCLE => Some(self.jobs.subscribe()),
            TOPIC_SYSTEM_LIFECYCLE => Some(self.system.subscribe()),
            _ => None,
        }
    }

    fn sender(&self, topic: &str) -> &broadcast::Sender<String> {
        if topic == TOPIC_SYSTEM_LIFECYCLE {
            &self.system
        } else {
            &self.jobs
        }
    }
}

impl Default for BroadcastBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventSink for BroadcastBus {
    fn publish(&self, event: &Event) -> Result<(), PublishError> {
        let payload =
            serde_json::to_string(event).map_err(|e| PublishError::Serialize(e.to_string()))?;
        let topic = event.topic();
        if self.sender(topic).send(payload).is_err() {
            // No subscribers; the topic is allowed to drop events
            debug!(topic, "event dropped, no subscribers");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
