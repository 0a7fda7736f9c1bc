// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the CLI crate.

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

/// How long to wait for the daemon to close our connection after a
/// send. `SWO_TIMEOUT_ACK_MS`, default 5s.
pub fn ack_timeout() -> Duration {
    std::env::var("SWO_TIMEOUT_ACK_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}
