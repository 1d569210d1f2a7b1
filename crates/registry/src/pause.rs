// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide admission gate.
//!
//! A single atomic flag; while set, job creation and non-terminal
//! transitions are refused so in-flight work can drain. The flag is not
//! persisted: a restarted registry comes up with its configured initial
//! value.

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug)]
pub struct PauseSwitch {
    paused: AtomicBool,
}

impl PauseSwitch {
    pub fn new(initially_paused: bool) -> Self {
        Self {
            paused: AtomicBool::new(initially_paused),
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Set the flag; returns true if the value changed.
    pub fn set(&self, paused: bool) -> bool {
        self.paused.swap(paused, Ordering::AcqRel) != paused
    }
}

#[cfg(test)]
#[path = "pause_tests.rs"]
mod tests;
