// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event records exchanged on the bus.
//!
//! Wire format: one JSON object per line, `{"type": "...", "timestamp":
//! "...", ...fields}`. Timestamps are RFC 3339. The daemon relays lines
//! verbatim; only the controller's router and the clients parse them.

use crate::id::TaskspaceId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity/kind of a `progress_log` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressCategory {
    Info,
    Warn,
    Error,
    Milestone,
    Question,
}

impl ProgressCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressCategory::Info => "info",
            ProgressCategory::Warn => "warn",
            ProgressCategory::Error => "error",
            ProgressCategory::Milestone => "milestone",
            ProgressCategory::Question => "question",
        }
    }
}

/// One taskspace in a `status_response`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskspaceStatusEntry {
    pub name: String,
    pub status: String,
    pub uuid: TaskspaceId,
}

/// Events exchanged between the controller and taskspace clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusEvent {
    /// A client asks the controller to create a taskspace.
    NewTaskspaceRequest {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cwd: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initial_prompt: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// A client renames or re-describes its own taskspace.
    UpdateTaskspace {
        uuid: TaskspaceId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// A client asks for a roster summary.
    StatusRequest { timestamp: DateTime<Utc> },

    /// Controller reply to `status_request`, broadcast to all clients.
    StatusResponse {
        taskspaces: Vec<TaskspaceStatusEntry>,
        #[serde(
            rename = "activeTaskSpace",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        active_task_space: Option<TaskspaceId>,
        timestamp: DateTime<Utc>,
    },

    /// A progress message, optionally attributed to a taskspace.
    ProgressLog {
        message: String,
        category: ProgressCategory,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        taskspace_uuid: Option<TaskspaceId>,
        timestamp: DateTime<Utc>,
    },

    /// A request for the user's attention, optionally attributed.
    UserSignal {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        taskspace_uuid: Option<TaskspaceId>,
        timestamp: DateTime<Utc>,
    },
}

impl BusEvent {
    /// The wire `type` tag of this event.
    pub fn type_name(&self) -> &'static str {
        match self {
            BusEvent::NewTaskspaceRequest { .. } => "new_taskspace_request",
            BusEvent::UpdateTaskspace { .. } => "update_taskspace",
            BusEvent::StatusRequest { .. } => "status_request",
            BusEvent::StatusResponse { .. } => "status_response",
            BusEvent::ProgressLog { .. } => "progress_log",
            BusEvent::UserSignal { .. } => "user_signal",
        }
    }

    /// The taskspace this event is attributed to, when it carries one.
    pub fn taskspace_uuid(&self) -> Option<TaskspaceId> {
        match self {
            BusEvent::UpdateTaskspace { uuid, .. } => Some(*uuid),
            BusEvent::ProgressLog { taskspace_uuid, .. }
            | BusEvent::UserSignal { taskspace_uuid, .. } => *taskspace_uuid,
            _ => None,
        }
    }

    /// Serialize to a single wire line (no trailing newline).
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse one wire line.
    pub fn parse_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
