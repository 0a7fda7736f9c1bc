// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the bus daemon.

use std::path::PathBuf;
use std::time::Duration;

/// Remote base directory: `BASE_DIR` > `$HOME/.theoldswitcheroo` >
/// `.theoldswitcheroo` relative to the working directory.
pub fn base_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("BASE_DIR") {
        return PathBuf::from(dir);
    }
    match std::env::var("HOME") {
        Ok(home) => PathBuf::from(home).join(".theoldswitcheroo"),
        Err(_) => PathBuf::from(".theoldswitcheroo"),
    }
}

/// Bus socket path: `THEOLDSWITCHEROO_SOCKET` > `<base>/daemon.sock`.
pub fn socket_path() -> PathBuf {
    if let Ok(path) = std::env::var("THEOLDSWITCHEROO_SOCKET") {
        return PathBuf::from(path);
    }
    base_dir().join("daemon.sock")
}

/// Poll interval for watching our own socket file. The handoff
/// contract promises exit within ~2s of deletion; this keeps detection
/// well inside that bound.
pub fn watch_poll() -> Option<Duration> {
    std::env::var("SWOD_WATCH_POLL_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}
