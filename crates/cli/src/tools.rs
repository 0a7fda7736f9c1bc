// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool-protocol endpoint.
//!
//! The same binary in a different front end: an agent harness drives
//! it over stdio with line-delimited JSON (`list_tools` /
//! `call_tool`), and every call turns into the same bus events the
//! subcommands emit. Tools exist only when a taskspace UUID is
//! derivable from the working directory; outside a taskspace the tool
//! set is empty.

use anyhow::Result;
use chrono::Utc;
use clap::{Args, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use swo_core::{extract_taskspace_id, BusEvent, ProgressCategory, TaskspaceId};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::client;

#[derive(Args)]
pub struct ToolsArgs {
    #[command(subcommand)]
    pub command: ToolsCommand,
}

#[derive(Subcommand)]
pub enum ToolsCommand {
    /// Serve the tool protocol on stdio (line-delimited JSON)
    Serve,
}

pub async fn handle(args: ToolsArgs) -> Result<()> {
    match args.command {
        ToolsCommand::Serve => serve().await,
    }
}

#[derive(Debug, Deserialize)]
struct ToolRequest {
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct ToolSpec {
    name: &'static str,
    description: &'static str,
}

/// The advertised tool set. Empty without a derived taskspace UUID.
fn tool_list(taskspace: Option<TaskspaceId>) -> Vec<ToolSpec> {
    if taskspace.is_none() {
        return Vec::new();
    }
    vec![
        ToolSpec {
            name: "log_progress",
            description: "Record a progress message for this taskspace",
        },
        ToolSpec {
            name: "signal_user",
            description: "Ask the user to look at this taskspace",
        },
        ToolSpec {
            name: "update_taskspace",
            description: "Rename or re-describe this taskspace",
        },
        ToolSpec {
            name: "spawn_taskspace",
            description: "Ask the controller to create a new taskspace",
        },
    ]
}

fn parse_category(s: &str) -> ProgressCategory {
    match s {
        "warn" => ProgressCategory::Warn,
        "error" => ProgressCategory::Error,
        "milestone" => ProgressCategory::Milestone,
        "question" => ProgressCategory::Question,
        _ => ProgressCategory::Info,
    }
}

fn required_str(arguments: &Value, field: &str) -> Result<String, String> {
    arguments
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| format!("missing required argument: {field}"))
}

fn optional_str(arguments: &Value, field: &str) -> Option<String> {
    arguments.get(field).and_then(Value::as_str).map(str::to_string)
}

/// Build the bus event for one tool call. The derived taskspace UUID
/// is attached to every event that carries one.
fn build_event(
    name: &str,
    arguments: &Value,
    taskspace: TaskspaceId,
    cwd: Option<String>,
) -> Result<BusEvent, String> {
    match name {
        "log_progress" => Ok(BusEvent::ProgressLog {
            message: required_str(arguments, "message")?,
            category: optional_str(arguments, "category")
                .map(|s| parse_category(&s))
                .unwrap_or(ProgressCategory::Info),
            taskspace_uuid: Some(taskspace),
            timestamp: Utc::now(),
        }),
        "signal_user" => Ok(BusEvent::UserSignal {
            message: required_str(arguments, "message")?,
            taskspace_uuid: Some(taskspace),
            timestamp: Utc::now(),
        }),
        "update_taskspace" => {
            let name = optional_str(arguments, "name");
            let description = optional_str(arguments, "description");
            if name.is_none() && description.is_none() {
                return Err("nothing to update: pass name and/or description".to_string());
            }
            Ok(BusEvent::UpdateTaskspace {
                uuid: taskspace,
                name,
                description,
                timestamp: Utc::now(),
            })
        }
        "spawn_taskspace" => Ok(BusEvent::NewTaskspaceRequest {
            name: required_str(arguments, "name")?,
            description: optional_str(arguments, "description"),
            cwd,
            initial_prompt: optional_str(arguments, "initial_prompt"),
            timestamp: Utc::now(),
        }),
        other => Err(format!("unknown tool: {other}")),
    }
}

fn response(id: Option<Value>, body: Result<Value, String>) -> Value {
    match body {
        Ok(result) => json!({ "id": id, "result": result }),
        Err(message) => json!({ "id": id, "error": { "message": message } }),
    }
}

/// Process one request line into one response value.
async fn handle_line(line: &str, taskspace: Option<TaskspaceId>, cwd: Option<String>) -> Value {
    let request: ToolRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => return response(None, Err(format!("invalid request: {e}"))),
    };

    match request.method.as_str() {
        "list_tools" => response(
            request.id,
            Ok(json!({ "tools": tool_list(taskspace) })),
        ),
        "call_tool" => {
            let Some(taskspace) = taskspace else {
                return response(
                    request.id,
                    Err("not inside a taskspace: no tools available".to_string()),
                );
            };
            let Some(name) = request.name else {
                return response(request.id, Err("missing tool name".to_string()));
            };
            let event = match build_event(&name, &request.arguments, taskspace, cwd) {
                Ok(event) => event,
                Err(message) => return response(request.id, Err(message)),
            };
            match client::send_event(&event).await {
                Ok(()) => response(request.id, Ok(json!({ "ok": true }))),
                Err(e) => response(request.id, Err(e.to_string())),
            }
        }
        other => response(request.id, Err(format!("unknown method: {other}"))),
    }
}

async fn serve() -> Result<()> {
    let cwd = std::env::current_dir().ok();
    let taskspace = cwd.as_deref().and_then(extract_taskspace_id);
    let cwd_string = cwd.map(|p| p.to_string_lossy().into_owned());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let reply = handle_line(&line, taskspace, cwd_string.clone()).await;
        let mut framed = serde_json::to_string(&reply)?;
        framed.push('\n');
        stdout.write_all(framed.as_bytes()).await?;
        stdout.flush().await?;
    }

    Ok(())
}

#[cfg(test)]
#[path = "tools_tests.rs"]
mod tests;
