// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Progress and attention commands.

use anyhow::Result;
use chrono::Utc;
use clap::{Args, ValueEnum};
use swo_core::{extract_taskspace_id, BusEvent, ProgressCategory, TaskspaceId};

use crate::client;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum CategoryArg {
    #[default]
    Info,
    Warn,
    Error,
    Milestone,
    Question,
}

impl From<CategoryArg> for ProgressCategory {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::Info => ProgressCategory::Info,
            CategoryArg::Warn => ProgressCategory::Warn,
            CategoryArg::Error => ProgressCategory::Error,
            CategoryArg::Milestone => ProgressCategory::Milestone,
            CategoryArg::Question => ProgressCategory::Question,
        }
    }
}

#[derive(Args)]
pub struct LogProgressArgs {
    /// Progress message
    #[arg(long)]
    pub message: String,

    /// Message category
    #[arg(long, value_enum, default_value = "info")]
    pub category: CategoryArg,
}

/// The taskspace this process runs inside, when derivable from cwd.
fn current_taskspace() -> Option<TaskspaceId> {
    std::env::current_dir()
        .ok()
        .and_then(|cwd| extract_taskspace_id(&cwd))
}

pub async fn log_progress(args: LogProgressArgs) -> Result<()> {
    let event = BusEvent::ProgressLog {
        message: args.message,
        category: args.category.into(),
        taskspace_uuid: current_taskspace(),
        timestamp: Utc::now(),
    };
    client::send_event(&event).await?;
    Ok(())
}

#[derive(Args)]
pub struct SignalUserArgs {
    /// What the user should look at
    #[arg(long)]
    pub message: String,
}

pub async fn signal_user(args: SignalUserArgs) -> Result<()> {
    let event = BusEvent::UserSignal {
        message: args.message,
        taskspace_uuid: current_taskspace(),
        timestamp: Utc::now(),
    };
    client::send_event(&event).await?;
    Ok(())
}
