// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! im2-daemon: the registry service (`im2d`).
//!
//! Hosts the HTTP+JSON surface over the transition engine, owns the data
//! directory (single-instance lock, recovery, periodic checkpoints), and
//! wires configuration from the environment.

pub mod env;
pub mod http;
pub mod lifecycle;
