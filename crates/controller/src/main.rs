// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! swoc - headless taskspace controller
//!
//! Drives the full lifecycle against the configured host and routes
//! bus events until terminated. The desktop shell embeds the same
//! library; this binary fronts it with a logging surface.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use swo_controller::{
    bus::Bus, env, frontend::Frontend, frontend::LoggingFrontend, lifecycle::Controller,
    lifecycle::ProjectConfig, router,
};
use swo_core::RemotePaths;
use swo_storage::Store;
use swo_transport::{SshMux, SshMuxConfig, Transport};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("swoc {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: swoc [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let data_dir = match env::data_dir() {
        Some(dir) => dir,
        None => {
            eprintln!("swoc: could not determine the data directory (no HOME)");
            std::process::exit(1);
        }
    };
    std::fs::create_dir_all(&data_dir)?;

    let log_path = data_dir.join("controller.log");
    rotate_log_if_needed(&log_path);
    let _log_guard = setup_logging(&log_path)?;

    let store = Store::new(&data_dir);
    let settings = store.load_settings();
    if settings.hostname.is_empty() {
        eprintln!(
            "swoc: no hostname configured; write {{\"hostname\": \"<host>\"}} to {}",
            store.settings_path().display()
        );
        std::process::exit(1);
    }
    let host = settings.hostname.clone();

    info!(host, "starting controller");

    let transport: Arc<dyn Transport> = Arc::new(SshMux::new(SshMuxConfig::new(
        data_dir.join("control"),
    )));
    let frontend: Arc<dyn Frontend> = Arc::new(LoggingFrontend::new());
    let paths = RemotePaths::new(env::remote_base_dir());
    let project = load_project_config();

    let mut controller = Controller::new(
        host.clone(),
        Arc::clone(&transport),
        Arc::clone(&frontend),
        store,
        paths.clone(),
        project,
    );

    if let Err(e) = controller.startup().await {
        // Initial boot is the one path that reaches the terminal
        // error surface.
        frontend.show_error(
            "Startup failed",
            &format!("Could not bring up {host}"),
            Some(&e.to_string()),
        );
        error!(error = %e, "startup failed");
        controller.shutdown().await;
        std::process::exit(1);
    }

    let mut bus = match Bus::start(
        transport.as_ref(),
        &host,
        &paths,
        env::handoff_wait(),
    )
    .await
    {
        Ok(bus) => bus,
        Err(e) => {
            frontend.show_error(
                "Startup failed",
                "Could not start the bus daemon",
                Some(&e.to_string()),
            );
            error!(error = %e, "bus startup failed");
            controller.shutdown().await;
            std::process::exit(1);
        }
    };

    info!("controller ready");

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    loop {
        tokio::select! {
            line = bus.next_line() => match line {
                Some(line) => router::dispatch_line(&mut controller, &mut bus, &line).await,
                None => {
                    warn!("bus daemon stream ended");
                    break;
                }
            },
            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
                break;
            }
            _ = sigint.recv() => {
                info!("received SIGINT, shutting down");
                break;
            }
        }
    }

    bus.shutdown().await;
    controller.shutdown().await;
    info!("controller stopped");
    Ok(())
}

fn print_help() {
    println!("swoc {}", env!("CARGO_PKG_VERSION"));
    println!("theoldswitcheroo controller - provisions and supervises taskspaces");
    println!("on one remote host and routes bus events");
    println!();
    println!("USAGE:");
    println!("    swoc");
    println!();
    println!("CONFIGURATION:");
    println!("    settings.json in the data directory must contain the hostname.");
    println!();
    println!("ENVIRONMENT:");
    println!("    SWO_DATA_DIR       local data directory override");
    println!("    BASE_DIR           remote base directory (default ~/.theoldswitcheroo)");
    println!("    SWO_PROJECT_DIR    project definition directory (fresh-clone.sh, extensions)");
}

/// Load the project definition the collaborator would normally hand
/// us: `SWO_PROJECT_DIR` with `fresh-clone.sh`,
/// `vscode-extensions.json`, and any `.vsix` packages.
fn load_project_config() -> ProjectConfig {
    let Some(dir) = std::env::var("SWO_PROJECT_DIR").ok().map(PathBuf::from) else {
        return ProjectConfig::default();
    };

    let mut project = ProjectConfig::default();

    match std::fs::read_to_string(dir.join("fresh-clone.sh")) {
        Ok(script) => project.clone_script = script,
        Err(e) => warn!(error = %e, dir = %dir.display(), "no usable fresh-clone.sh, using default"),
    }

    if let Ok(raw) = std::fs::read_to_string(dir.join("vscode-extensions.json")) {
        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(extensions) => project.marketplace_extensions = extensions,
            Err(e) => warn!(error = %e, "could not parse vscode-extensions.json"),
        }
    }

    if let Ok(entries) = std::fs::read_dir(&dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "vsix") {
                project.vsix_paths.push(path);
            }
        }
        project.vsix_paths.sort();
    }

    project
}

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep.
const MAX_ROTATED_LOGS: u32 = 3;

/// Shift controller.log -> .1 -> .2 -> .3, dropping the oldest.
/// Best-effort: rotation failures never block startup.
fn rotate_log_if_needed(log_path: &Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

fn setup_logging(
    log_path: &Path,
) -> Result<tracing_appender::non_blocking::WorkerGuard, std::io::Error> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let dir = log_path.parent().unwrap_or_else(|| Path::new("."));
    let name = log_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "controller.log".into());
    let file_appender = tracing_appender::rolling::never(dir, name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(guard)
}
