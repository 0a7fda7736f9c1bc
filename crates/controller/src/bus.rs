// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bus daemon lifecycle from the controller side.
//!
//! The daemon runs on the remote host with its stdio attached to a
//! streaming subordinate: its stdout is the event stream into the
//! router, its stdin carries broadcasts back to taskspace clients.
//! The socket file's presence is the single-instance lock; taking the
//! host over means deleting the incumbent's socket, waiting out the
//! handoff interval, then starting our own daemon.

use std::time::Duration;

use swo_core::{BusEvent, RemotePaths};
use swo_transport::{RemoteProcess, Transport};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, ChildStdout};
use tracing::{info, warn};

use crate::error::ControllerError;
use crate::install::remote_exists;

/// The controller's handle on the remote bus daemon.
pub struct Bus {
    process: RemoteProcess,
    stdin: ChildStdin,
    lines: tokio::io::Lines<BufReader<ChildStdout>>,
}

impl Bus {
    /// Start the bus daemon, taking over from an incumbent if needed.
    pub async fn start(
        transport: &dyn Transport,
        host: &str,
        paths: &RemotePaths,
        handoff_wait: Duration,
    ) -> Result<Self, ControllerError> {
        let socket = paths.daemon_socket();

        if remote_exists(transport, host, "-S", &socket).await? {
            info!(host, socket, "incumbent bus daemon found, requesting handoff");
            transport.execute(host, &format!("rm -f {socket}")).await?;
            // The incumbent watches its socket and exits within this
            // interval of the deletion.
            tokio::time::sleep(handoff_wait).await;
        }

        let command = format!(
            "BASE_DIR={base} exec {daemon}",
            base = paths.base(),
            daemon = paths.tools_daemon()
        );
        let mut process = transport.execute_streaming(host, &command).await?;

        let stdin = process
            .take_stdin()
            .ok_or_else(|| ControllerError::Bus("bus daemon process has no stdin".to_string()))?;
        let stdout = process
            .take_stdout()
            .ok_or_else(|| ControllerError::Bus("bus daemon process has no stdout".to_string()))?;
        if let Some(stderr) = process.take_stderr() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    info!(target: "swod", "{line}");
                }
            });
        }

        info!(host, "bus daemon started");
        Ok(Self {
            process,
            stdin,
            lines: BufReader::new(stdout).lines(),
        })
    }

    /// Next event line from the daemon; `None` once the stream ends
    /// (daemon exited or channel died).
    pub async fn next_line(&mut self) -> Option<String> {
        match self.lines.next_line().await {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "bus stdout read failed");
                None
            }
        }
    }

    /// Send one event to the daemon for broadcast to all clients.
    pub async fn send(&mut self, event: &BusEvent) -> Result<(), ControllerError> {
        let mut line = event
            .to_line()
            .map_err(|e| ControllerError::Bus(format!("event serialization failed: {e}")))?;
        line.push('\n');
        self.stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| ControllerError::Bus(format!("bus stdin write failed: {e}")))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| ControllerError::Bus(format!("bus stdin flush failed: {e}")))?;
        Ok(())
    }

    /// Stop the daemon: closing its stdin tells it the controller is
    /// gone; the kill is a backstop.
    pub async fn shutdown(mut self) {
        drop(self.stdin);
        let graceful =
            tokio::time::timeout(Duration::from_secs(2), self.process.wait()).await;
        if graceful.is_err() {
            let _ = self.process.start_kill();
            let _ = self.process.wait().await;
        }
        info!("bus daemon stopped");
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
