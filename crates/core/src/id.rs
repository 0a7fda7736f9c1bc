// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Taskspace identity and path-based identity derivation.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a taskspace.
///
/// A 128-bit UUID rendered in the canonical lowercase 8-4-4-4-12 form.
/// Immutable once assigned; every remote path of a taskspace is a pure
/// function of this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskspaceId(Uuid);

impl TaskspaceId {
    /// Allocate a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for TaskspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Uuid renders hyphenated lowercase, which is the canonical form.
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskspaceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Canonical 8-4-4-4-12 UUID pattern.
fn uuid_pattern() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
        )
        .ok()
    })
    .as_ref()
}

/// Derive a taskspace identifier from a filesystem path.
///
/// CLI and tool clients run inside `taskspaces/<uuid>/clone` (or a
/// subdirectory of it) and carry no explicit identity; the first
/// canonical UUID substring of the path is the taskspace they belong
/// to. Returns `None` when the path contains no UUID.
pub fn extract_taskspace_id(path: &Path) -> Option<TaskspaceId> {
    let text = path.to_string_lossy();
    let found = uuid_pattern()?.find(&text)?;
    TaskspaceId::from_str(found.as_str()).ok()
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
