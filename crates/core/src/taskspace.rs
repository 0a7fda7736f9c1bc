// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Taskspace records and their runtime lifecycle state.

use crate::event::ProgressCategory;
use crate::id::TaskspaceId;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Which view of a taskspace the window shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    Editor,
    Meta,
}

/// Extensions installed into a taskspace at server startup.
///
/// Marketplace identifiers install first, in order, then uploaded
/// `.vsix` package files, in order. Installation is idempotent within
/// one boot of a taskspace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionManifest {
    #[serde(default)]
    pub marketplace: Vec<String>,
    #[serde(default)]
    pub vsix_files: Vec<String>,
}

impl ExtensionManifest {
    pub fn is_empty(&self) -> bool {
        self.marketplace.is_empty() && self.vsix_files.is_empty()
    }
}

/// Lifecycle state of a taskspace.
///
/// `Absent` and the terminal `Removed` are represented by the taskspace
/// not being in the roster; the variants here are the states a roster
/// member can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskspaceState {
    /// Roster entry exists, remote clone creation in progress.
    Provisioning,
    /// Clone directory exists; no editor-server known to be running.
    Cloned,
    /// Editor-server launched; port not yet discovered.
    Starting,
    /// Editor-server alive on a discovered port; local forward active.
    Running,
    /// Last-known port is set but the probe fails; needs a restart.
    Stale,
}

impl TaskspaceState {
    pub fn label(&self) -> &'static str {
        match self {
            TaskspaceState::Provisioning => "provisioning",
            TaskspaceState::Cloned => "cloned",
            TaskspaceState::Starting => "starting",
            TaskspaceState::Running => "running",
            TaskspaceState::Stale => "stale",
        }
    }
}

/// One progress message attributed to a taskspace.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEntry {
    pub message: String,
    pub category: ProgressCategory,
}

/// Progress entries kept per taskspace before old ones are dropped.
const MAX_PROGRESS_ENTRIES: usize = 100;

/// An isolated editor-server instance bound to one cloned project tree.
#[derive(Debug, Clone)]
pub struct Taskspace {
    pub id: TaskspaceId,
    pub name: String,
    pub description: Option<String>,
    /// Last-known editor-server port; 0 means the server never started.
    pub port: u16,
    pub extensions: ExtensionManifest,
    pub state: TaskspaceState,
    pub view_mode: ViewMode,
    /// Epoch milliseconds of the last observed activity.
    pub last_seen_ms: u64,
    /// Recent progress messages, oldest first, bounded.
    pub progress: Vec<ProgressEntry>,
    /// Set when a `user_signal` arrived and was not yet acknowledged.
    pub attention: bool,
}

pub fn epoch_ms_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

impl Taskspace {
    /// A fresh taskspace entering *Provisioning*.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: TaskspaceId::generate(),
            name: name.into(),
            description: None,
            port: 0,
            extensions: ExtensionManifest::default(),
            state: TaskspaceState::Provisioning,
            view_mode: ViewMode::default(),
            last_seen_ms: epoch_ms_now(),
            progress: Vec::new(),
            attention: false,
        }
    }

    /// A taskspace restored from disk, entering *Cloned* with its
    /// previous last-known port.
    pub fn restored(
        id: TaskspaceId,
        name: impl Into<String>,
        port: u16,
        extensions: ExtensionManifest,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            port,
            extensions,
            state: TaskspaceState::Cloned,
            view_mode: ViewMode::default(),
            last_seen_ms: epoch_ms_now(),
            progress: Vec::new(),
            attention: false,
        }
    }

    /// Append a progress entry, dropping the oldest past the bound.
    pub fn push_progress(&mut self, message: impl Into<String>, category: ProgressCategory) {
        self.progress.push(ProgressEntry {
            message: message.into(),
            category,
        });
        if self.progress.len() > MAX_PROGRESS_ENTRIES {
            let excess = self.progress.len() - MAX_PROGRESS_ENTRIES;
            self.progress.drain(..excess);
        }
        self.last_seen_ms = epoch_ms_now();
    }
}

#[cfg(test)]
#[path = "taskspace_tests.rs"]
mod tests;
