// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! swo - theoldswitcheroo taskspace CLI
//!
//! Fire-and-forget client of the bus daemon: each subcommand composes
//! one event record and deposits it on the daemon's socket. Responses,
//! if any, flow to the controller, not back here.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod commands;
mod env;
mod exit_error;
mod tools;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "swo",
    version,
    about = "theoldswitcheroo - talk to the taskspace controller from inside a taskspace"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the controller to create a new taskspace
    NewTaskspace(commands::taskspace::NewTaskspaceArgs),
    /// Rename or re-describe the taskspace containing the working directory
    UpdateTaskspace(commands::taskspace::UpdateTaskspaceArgs),
    /// Ask the controller for a roster summary
    Status,
    /// Record a progress message against the current taskspace
    LogProgress(commands::progress::LogProgressArgs),
    /// Ask the controller to bring the user's attention here
    SignalUser(commands::progress::SignalUserArgs),
    /// Tool-protocol endpoint for agent tooling
    Tools(tools::ToolsArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::NewTaskspace(args) => commands::taskspace::new_taskspace(args).await,
        Commands::UpdateTaskspace(args) => commands::taskspace::update_taskspace(args).await,
        Commands::Status => commands::status::status().await,
        Commands::LogProgress(args) => commands::progress::log_progress(args).await,
        Commands::SignalUser(args) => commands::progress::signal_user(args).await,
        Commands::Tools(args) => tools::handle(args).await,
    };

    if let Err(e) = result {
        exit_error::exit_with(e);
    }
}
