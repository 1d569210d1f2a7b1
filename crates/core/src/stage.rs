// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline stage state machine.
//!
//! A job walks the linear pipeline `submitted → … → complete`, with side
//! exits to `failed` and `canceled` from every non-terminal stage. Terminal
//! stages admit no outgoing step except cancel-finalization of a failed job;
//! retry re-enters the machine through the engine, not through this table.

use crate::error::RegistryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Position of a job in the processing pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Submitted,
    Categorizing,
    Categorized,
    MetadataExtracting,
    MetadataExtracted,
    Staging,
    Staged,
    Splitting,
    Split,
    Recombining,
    Recombined,
    Organizing,
    Complete,
    Failed,
    Canceled,
}

/// Classification of a requested stage step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// Target equals the current stage; tolerated worker retry, no-op.
    Idempotent,
    /// Advance to the immediate successor.
    Forward,
    /// Side exit to `failed`; requires an error message.
    Fail,
    /// Side exit to `canceled`.
    Cancel,
}

impl Stage {
    /// All stages in pipeline order, terminals last.
    pub const ALL: [Stage; 15] = [
        Stage::Submitted,
        Stage::Categorizing,
        Stage::Categorized,
        Stage::MetadataExtracting,
        Stage::MetadataExtracted,
        Stage::Staging,
        Stage::Staged,
        Stage::Splitting,
        Stage::Split,
        Stage::Recombining,
        Stage::Recombined,
        Stage::Organizing,
        Stage::Complete,
        Stage::Failed,
        Stage::Canceled,
    ];

    /// The immediate successor in the forward pipeline, if any.
    pub fn successor(self) -> Option<Stage> {
        match self {
            Stage::Submitted => Some(Stage::Categorizing),
            Stage::Categorizing => Some(Stage::Categorized),
            Stage::Categorized => Some(Stage::MetadataExtracting),
            Stage::MetadataExtracting => Some(Stage::MetadataExtracted),
            Stage::MetadataExtracted => Some(Stage::Staging),
            Stage::Staging => Some(Stage::Staged),
            Stage::Staged => Some(Stage::Splitting),
            Stage::Splitting => Some(Stage::Split),
            Stage::Split => Some(Stage::Recombining),
            Stage::Recombining => Some(Stage::Recombined),
            Stage::Recombined => Some(Stage::Organizing),
            Stage::Organizing => Some(Stage::Complete),
            Stage::Complete | Stage::Failed | Stage::Canceled => None,
        }
    }

    /// Whether this stage admits no forward progress.
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Complete | Stage::Failed | Stage::Canceled)
    }

    /// Whether this stage marks an aborted run (`failed` or `canceled`).
    ///
    /// These are the entries retry skips over when deriving the rewind target.
    pub fn is_aborted(self) -> bool {
        matches!(self, Stage::Failed | Stage::Canceled)
    }

    /// Classify the step `from → to` against the legal transition set.
    ///
    /// `Idempotent` is reported even for terminal stages so callers can treat
    /// repeated requests as no-ops. Everything else out of a terminal stage is
    /// illegal here, with one exception: a failed job may still be finalized
    /// to `canceled`.
    pub fn classify(from: Stage, to: Stage) -> Result<StepKind, RegistryError> {
        if from == to {
            return Ok(StepKind::Idempotent);
        }
        if !from.is_terminal() {
            return if Some(to) == from.successor() {
                Ok(StepKind::Forward)
            } else if to == Stage::Failed {
                Ok(StepKind::Fail)
            } else if to == Stage::Canceled {
                Ok(StepKind::Cancel)
            } else {
                Err(RegistryError::IllegalTransition { from, to })
            };
        }
        if from == Stage::Failed && to == Stage::Canceled {
            return Ok(StepKind::Cancel);
        }
        Err(RegistryError::IllegalTransition { from, to })
    }

    /// The wire name of this stage (same as its serde representation).
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Submitted => "submitted",
            Stage::Categorizing => "categorizing",
            Stage::Categorized => "categorized",
            Stage::MetadataExtracting => "metadata_extracting",
            Stage::MetadataExtracted => "metadata_extracted",
            Stage::Staging => "staging",
            Stage::Staged => "staged",
            Stage::Splitting => "splitting",
            Stage::Split => "split",
            Stage::Recombining => "recombining",
            Stage::Recombined => "recombined",
            Stage::Organizing => "organizing",
            Stage::Complete => "complete",
            Stage::Failed => "failed",
            Stage::Canceled => "canceled",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unrecognized stage names at the API edge.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown stage: {0}")]
pub struct UnknownStage(pub String);

impl FromStr for Stage {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| UnknownStage(s.to_string()))
    }
}

#[cfg(test)]
#[path = "stage_tests.rs"]
mod tests;
