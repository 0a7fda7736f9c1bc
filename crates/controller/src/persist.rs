// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Roster <-> persisted-file conversion.

use swo_core::{RemotePaths, Roster};
use swo_storage::{RosterFile, TaskspaceRecord};

/// Snapshot the in-memory roster into its persisted form.
pub fn to_file(roster: &Roster, paths: &RemotePaths) -> RosterFile {
    RosterFile {
        hostname: roster.hostname().to_string(),
        active_task_space_uuid: roster.active_id(),
        taskspaces: roster
            .iter()
            .map(|t| TaskspaceRecord {
                uuid: t.id,
                name: t.name.clone(),
                description: t.description.clone(),
                port: t.port,
                server_data_dir: paths.server_data_dir(t.id),
                last_seen: t.last_seen_ms,
                extensions: t.extensions.clone(),
            })
            .collect(),
    }
}

#[cfg(test)]
#[path = "persist_tests.rs"]
mod tests;
