// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! theoldswitcheroo bus daemon (swod)
//!
//! Remote-side process that relays single-line JSON events between the
//! controller (attached to this process's stdio) and local clients on
//! a Unix-domain socket under the base directory.
//!
//! The socket file's presence is the single-instance lock: if it
//! already exists another daemon holds it and this one refuses to
//! start; if it disappears while we run, a new controller is taking
//! over and we exit.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod env;
mod relay;

use std::os::unix::fs::PermissionsExt;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

use crate::relay::Relay;

/// Default poll interval for watching our own socket file.
const DEFAULT_WATCH_POLL: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("swod {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("swod {}", env!("CARGO_PKG_VERSION"));
                println!("theoldswitcheroo bus daemon - relays events between the");
                println!("controller (stdio) and taskspace clients (unix socket)");
                println!();
                println!("USAGE:");
                println!("    swod");
                println!();
                println!("The daemon is started by the controller over the remote");
                println!("channel and should not normally be invoked directly.");
                println!();
                println!("ENVIRONMENT:");
                println!("    BASE_DIR                  base directory (default ~/.theoldswitcheroo)");
                println!("    THEOLDSWITCHEROO_SOCKET   socket path override");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: swod [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    // stdout is the controller channel; all diagnostics go to stderr.
    setup_logging();

    let socket_path = env::socket_path();

    if socket_path.exists() {
        eprintln!(
            "swod: socket {} already exists; another daemon appears to be running",
            socket_path.display()
        );
        std::process::exit(1);
    }

    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let listener = UnixListener::bind(&socket_path)?;
    // Owner-only: the socket is the bus's single multi-writer resource.
    std::fs::set_permissions(&socket_path, std::fs::Permissions::from_mode(0o600))?;

    info!(socket = %socket_path.display(), "bus daemon listening");

    let (relay, mut out_rx) = Relay::new();

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut stdin_lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut watch = tokio::time::interval(env::watch_poll().unwrap_or(DEFAULT_WATCH_POLL));
    let mut handoff = false;

    loop {
        tokio::select! {
            // New local client
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => relay.register(stream),
                Err(e) => error!(error = %e, "accept failed"),
            },

            // Controller -> clients: broadcast each stdin line
            line = stdin_lines.next_line() => match line {
                Ok(Some(line)) => relay.broadcast(&line),
                Ok(None) => {
                    info!("controller stdin closed, shutting down");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "stdin read failed, shutting down");
                    break;
                }
            },

            // Clients -> controller: write each line to stdout
            line = out_rx.recv() => match line {
                Some(line) => {
                    let framed = format!("{line}\n");
                    if let Err(e) = write_out(&mut stdout, framed.as_bytes()).await {
                        // Controller is gone; nothing left to relay for.
                        error!(error = %e, "stdout write failed, shutting down");
                        break;
                    }
                }
                None => break,
            },

            // Handoff: our socket file disappearing means a new
            // controller wants the host.
            _ = watch.tick() => {
                if !socket_path.exists() {
                    info!("socket file removed, handing off and exiting");
                    handoff = true;
                    break;
                }
            }

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

    relay.shutdown();
    // On handoff the file is already gone, and the successor may have
    // bound a fresh socket at the same path; never touch it then.
    if !handoff {
        let _ = std::fs::remove_file(&socket_path);
    }
    info!("bus daemon stopped");
    Ok(())
}

async fn write_out(
    stdout: &mut tokio::io::Stdout,
    bytes: &[u8],
) -> Result<(), std::io::Error> {
    stdout.write_all(bytes).await?;
    stdout.flush().await
}

fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
