// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only per-job audit records.

use crate::bag::Bag;
use crate::job::JobId;
use crate::stage::Stage;
use serde::{Deserialize, Serialize};

/// One committed transition of one job.
///
/// `seq` starts at 1 (the creation entry) and increases by exactly one per
/// committed non-idempotent transition, in commit order. Retries append new
/// entries pointing at the rewind target; earlier entries are never
/// rewritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub job_id: JobId,
    pub seq: u64,
    pub stage: Stage,
    pub at_ms: u64,
    /// Full bag as of this transition (after the merge, if any).
    #[serde(default)]
    pub bag_snapshot: Bag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
