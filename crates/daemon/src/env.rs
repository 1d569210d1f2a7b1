// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8200";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no usable data directory (set IM2_DATA_DIR or HOME)")]
    NoDataDir,
    #[error("invalid {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Daemon configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Where the WAL, snapshot, and lock file live.
    pub data_dir: PathBuf,
    /// Daemon log file, rotated at startup when it has grown too large.
    pub log_path: PathBuf,
    pub listen_addr: SocketAddr,
    /// Initial value of the pause switch.
    pub start_paused: bool,
    /// Deadline applied to every request.
    pub request_timeout: Duration,
    /// Advisory worker poll interval, surfaced via `/health`.
    pub poll_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let data_dir = data_dir()?;
        Ok(Self {
            log_path: data_dir.join("im2d.log"),
            data_dir,
            listen_addr: parse_var("IM2_LISTEN_ADDR", DEFAULT_LISTEN_ADDR.parse().ok())?,
            start_paused: parse_bool("IM2_START_PAUSED", false)?,
            request_timeout: Duration::from_secs(parse_var(
                "IM2_REQUEST_TIMEOUT_SECS",
                Some(DEFAULT_REQUEST_TIMEOUT_SECS),
            )?),
            poll_interval: Duration::from_secs(parse_var(
                "IM2_POLL_INTERVAL_SECS",
                Some(DEFAULT_POLL_INTERVAL_SECS),
            )?),
        })
    }
}

/// Resolve data directory: IM2_DATA_DIR > XDG_STATE_HOME/im2 > ~/.local/state/im2
fn data_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("IM2_DATA_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("im2"));
    }
    let home = std::env::var("HOME").map_err(|_| ConfigError::NoDataDir)?;
    Ok(PathBuf::from(home).join(".local/state/im2"))
}

fn parse_var<T: std::str::FromStr>(
    name: &'static str,
    default: Option<T>,
) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
            name,
            value: raw.clone(),
        }),
        Err(_) => default.ok_or(ConfigError::Invalid {
            name,
            value: String::new(),
        }),
    }
}

fn parse_bool(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" | "" => Ok(false),
            _ => Err(ConfigError::Invalid { name, value: raw }),
        },
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
