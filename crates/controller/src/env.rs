// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the controller crate.

use std::path::PathBuf;
use std::time::Duration;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

// --- Local data directory ---

/// Resolve the local per-user data directory:
/// `SWO_DATA_DIR` > `XDG_DATA_HOME/theoldswitcheroo` >
/// `~/.local/share/theoldswitcheroo`.
pub fn data_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("SWO_DATA_DIR") {
        return Some(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return Some(PathBuf::from(xdg).join("theoldswitcheroo"));
    }
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".local/share/theoldswitcheroo"))
}

// --- Remote base directory ---

/// Remote base directory as used in remote commands. `BASE_DIR` >
/// `.theoldswitcheroo` (relative, i.e. under the remote home).
pub fn remote_base_dir() -> String {
    std::env::var("BASE_DIR").unwrap_or_else(|_| ".theoldswitcheroo".to_string())
}

// --- Download locations ---

/// Base URL for editor-server release archives.
pub fn editor_download_base() -> String {
    std::env::var("SWO_EDITOR_DOWNLOAD_BASE")
        .unwrap_or_else(|_| "https://github.com/gitpod-io/openvscode-server/releases/download".to_string())
}

/// Base URL for the remote-tools (swo/swod) release archives.
pub fn tools_download_base() -> String {
    std::env::var("SWO_TOOLS_DOWNLOAD_BASE")
        .unwrap_or_else(|_| "https://downloads.theoldswitcheroo.dev/remote-tools".to_string())
}

// --- Timeouts ---

/// Editor-server startup window (port announcement deadline).
pub fn startup_timeout() -> Duration {
    parse_duration_ms("SWO_TIMEOUT_STARTUP_MS").unwrap_or(Duration::from_secs(60))
}

/// Per-attempt HTTP probe timeout.
pub fn probe_timeout() -> Duration {
    parse_duration_ms("SWO_TIMEOUT_PROBE_MS").unwrap_or(Duration::from_secs(2))
}

/// How long to wait after deleting an incumbent daemon's socket before
/// starting our own.
pub fn handoff_wait() -> Duration {
    parse_duration_ms("SWO_HANDOFF_WAIT_MS").unwrap_or(Duration::from_secs(2))
}
