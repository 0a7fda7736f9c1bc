// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Taskspace creation and update commands.

use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use clap::Args;
use swo_core::{extract_taskspace_id, BusEvent};

use crate::client;

#[derive(Args)]
pub struct NewTaskspaceArgs {
    /// Human-visible short name for the new taskspace
    #[arg(long)]
    pub name: String,

    /// Longer description
    #[arg(long)]
    pub description: Option<String>,

    /// Working directory to report with the request (default: cwd)
    #[arg(long)]
    pub cwd: Option<String>,

    /// Prompt handed to the agent once the taskspace is up
    #[arg(long = "initial-prompt")]
    pub initial_prompt: Option<String>,
}

pub async fn new_taskspace(args: NewTaskspaceArgs) -> Result<()> {
    let cwd = match args.cwd {
        Some(cwd) => Some(cwd),
        None => std::env::current_dir()
            .ok()
            .map(|p| p.to_string_lossy().into_owned()),
    };

    let event = BusEvent::NewTaskspaceRequest {
        name: args.name,
        description: args.description,
        cwd,
        initial_prompt: args.initial_prompt,
        timestamp: Utc::now(),
    };
    client::send_event(&event).await?;
    Ok(())
}

#[derive(Args)]
pub struct UpdateTaskspaceArgs {
    /// New short name
    #[arg(long)]
    pub name: Option<String>,

    /// New description
    #[arg(long)]
    pub description: Option<String>,
}

pub async fn update_taskspace(args: UpdateTaskspaceArgs) -> Result<()> {
    if args.name.is_none() && args.description.is_none() {
        bail!("nothing to update: pass --name and/or --description");
    }

    // Identity comes from where we are: the working directory path
    // carries the taskspace UUID. Resolved before any socket I/O so a
    // stray invocation never touches the bus.
    let cwd = std::env::current_dir()?;
    let uuid = extract_taskspace_id(&cwd).ok_or_else(|| {
        anyhow!(
            "working directory {} is not inside a taskspace (no UUID in path)",
            cwd.display()
        )
    })?;

    let event = BusEvent::UpdateTaskspace {
        uuid,
        name: args.name,
        description: args.description,
        timestamp: Utc::now(),
    };
    client::send_event(&event).await?;
    Ok(())
}
