// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Caller-facing error taxonomy.
//!
//! Every fallible registry operation resolves to one of these variants.
//! `IllegalTransition` and `Contended` are normal worker outcomes, not
//! alarms; `Unavailable` is the only retryable variant.

use crate::stage::Stage;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("job not found")]
    NotFound,

    #[error("job id already exists")]
    Conflict,

    #[error("illegal transition: {from} → {to}")]
    IllegalTransition { from: Stage, to: Stage },

    #[error("pipeline is paused")]
    PipelinePaused,

    #[error("claim lost: expected stage {expected}, job is in {actual}")]
    Contended { expected: Stage, actual: Stage },

    #[error("job is in a terminal stage")]
    Terminal,

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    BadRequest(String),
}

impl RegistryError {
    /// Stable machine-readable code for wire payloads and logs.
    pub fn code(&self) -> &'static str {
        match self {
            RegistryError::NotFound => "not_found",
            RegistryError::Conflict => "conflict",
            RegistryError::IllegalTransition { .. } => "illegal_transition",
            RegistryError::PipelinePaused => "pipeline_paused",
            RegistryError::Contended { .. } => "contended",
            RegistryError::Terminal => "terminal",
            RegistryError::Unavailable(_) => "unavailable",
            RegistryError::BadRequest(_) => "bad_request",
        }
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RegistryError::Unavailable(_))
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
