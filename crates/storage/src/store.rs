// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The on-disk roster and settings files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use swo_core::{ExtensionManifest, TaskspaceId};
use thiserror::Error;
use tracing::warn;

use crate::atomic::write_atomic;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persisted summary of one taskspace, `taskspaces.json` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskspaceRecord {
    pub uuid: TaskspaceId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Last-known editor-server port; 0 means never started.
    #[serde(default)]
    pub port: u16,
    /// Derived remote server-data path, recorded for tooling.
    #[serde(default)]
    pub server_data_dir: String,
    /// Epoch milliseconds of last observed activity.
    #[serde(default)]
    pub last_seen: u64,
    #[serde(default)]
    pub extensions: ExtensionManifest,
}

/// Persisted roster, `taskspaces.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RosterFile {
    #[serde(default)]
    pub hostname: String,
    #[serde(
        rename = "activeTaskSpaceUuid",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub active_task_space_uuid: Option<TaskspaceId>,
    #[serde(default)]
    pub taskspaces: Vec<TaskspaceRecord>,
}

/// Persisted user settings, `settings.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub hostname: String,
}

/// Handle on the local per-user data directory.
pub struct Store {
    dir: PathBuf,
}

impl Store {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn roster_path(&self) -> PathBuf {
        self.dir.join("taskspaces.json")
    }

    pub fn settings_path(&self) -> PathBuf {
        self.dir.join("settings.json")
    }

    /// Load the roster; missing or unreadable files are an empty roster.
    pub fn load_roster(&self) -> RosterFile {
        load_tolerant(&self.roster_path())
    }

    /// Rewrite the roster atomically.
    pub fn save_roster(&self, roster: &RosterFile) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(roster)?;
        write_atomic(&self.roster_path(), &bytes)?;
        Ok(())
    }

    /// Load the settings; missing or unreadable files are defaults.
    pub fn load_settings(&self) -> Settings {
        load_tolerant(&self.settings_path())
    }

    /// Rewrite the settings atomically.
    pub fn save_settings(&self, settings: &Settings) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(settings)?;
        write_atomic(&self.settings_path(), &bytes)?;
        Ok(())
    }
}

fn load_tolerant<T: Default + for<'de> Deserialize<'de>>(path: &Path) -> T {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return T::default(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read state file, treating as empty");
            return T::default();
        }
    };
    match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to parse state file, treating as empty");
            T::default()
        }
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
