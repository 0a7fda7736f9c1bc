// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Editor-server invocation and port discovery.
//!
//! One shell script, streamed through the transport, prepares the
//! taskspace-local directories, installs extensions, and execs the
//! editor server on an OS-chosen port. Only stdout is scanned for the
//! port announcement; stderr is logged verbatim.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use swo_core::{RemotePaths, Taskspace, TaskspaceId};
use swo_transport::{RemoteProcess, Transport};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use crate::error::ControllerError;

/// Port-announcement patterns, tried in order per line; the first
/// match of any pattern wins. Narrowing this set breaks some editor
/// versions.
fn port_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?i)web ui available at\s+\S*:(\d+)",
            r"localhost:(\d+)",
            r"127\.0\.0\.1:(\d+)",
            r"0\.0\.0\.0:(\d+)",
        ]
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
    })
}

/// Extract the announced port from one stdout line.
pub fn parse_port_line(line: &str) -> Option<u16> {
    for pattern in port_patterns() {
        if let Some(captures) = pattern.captures(line) {
            if let Some(port) = captures.get(1).and_then(|m| m.as_str().parse::<u16>().ok()) {
                return Some(port);
            }
        }
    }
    None
}

/// The startup script: directories, extension installs, then exec the
/// server bound on all interfaces with port 0 so the OS picks.
pub fn build_start_script(paths: &RemotePaths, taskspace: &Taskspace) -> String {
    let id = taskspace.id;
    let editor = paths.editor_binary();
    let server_data = paths.server_data_dir(id);
    let extensions = paths.extensions_dir(id);
    let user_data = paths.user_data_dir();
    let clone = paths.clone_dir(id);

    let mut script = String::new();
    script.push_str("set -e\n");
    script.push_str(&format!(
        "mkdir -p {server_data} {extensions} {user_data}\n"
    ));

    for ext in &taskspace.extensions.marketplace {
        script.push_str(&format!(
            "{editor} --extensions-dir {extensions} --install-extension {ext}\n"
        ));
    }
    for vsix in &taskspace.extensions.vsix_files {
        script.push_str(&format!(
            "{editor} --extensions-dir {extensions} --install-extension {root}/{vsix}\n",
            root = paths.taskspace_root(id)
        ));
    }

    script.push_str(&format!(
        "exec {editor} --host 0.0.0.0 --port 0 \
         --server-data-dir {server_data} \
         --extensions-dir {extensions} \
         --user-data-dir {user_data} \
         --without-connection-token \
         --enable-remote-auto-shutdown \
         --disable-workspace-trust \
         --default-folder {clone}\n"
    ));
    script
}

/// A started editor server: discovered port plus the live process.
#[derive(Debug)]
pub struct StartedServer {
    pub port: u16,
    pub process: RemoteProcess,
}

/// Launch the editor server and wait for its port announcement.
///
/// On timeout the process handle is dropped (killing the subordinate)
/// and the caller reverts the taskspace to cloned.
pub async fn start_editor_server(
    transport: &dyn Transport,
    host: &str,
    paths: &RemotePaths,
    taskspace: &Taskspace,
    startup_timeout: Duration,
) -> Result<StartedServer, ControllerError> {
    let id = taskspace.id;
    let script = build_start_script(paths, taskspace);
    let mut process = transport.execute_streaming(host, &script).await?;

    let stdout = process.take_stdout().ok_or_else(|| ControllerError::Startup {
        id,
        detail: "editor server process has no stdout".to_string(),
    })?;
    if let Some(stderr) = process.take_stderr() {
        drain_stderr(id, stderr);
    }

    let mut lines = BufReader::new(stdout).lines();
    let scan = async {
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    debug!(target: "editor-server", taskspace = %id, "{line}");
                    if let Some(port) = parse_port_line(&line) {
                        return Ok(port);
                    }
                }
                Ok(None) => {
                    return Err(ControllerError::Startup {
                        id,
                        detail: "editor server exited before announcing a port".to_string(),
                    })
                }
                Err(e) => {
                    return Err(ControllerError::Startup {
                        id,
                        detail: format!("failed reading editor server output: {e}"),
                    })
                }
            }
        }
    };

    let port = match tokio::time::timeout(startup_timeout, scan).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(ControllerError::StartupTimeout {
                id,
                timeout_secs: startup_timeout.as_secs(),
            })
        }
    };

    // Keep draining stdout so the subordinate never blocks on a full
    // pipe once we stop caring about its output.
    tokio::spawn(async move {
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(target: "editor-server", taskspace = %id, "{line}");
        }
    });

    Ok(StartedServer { port, process })
}

fn drain_stderr(id: TaskspaceId, stderr: tokio::process::ChildStderr) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            warn!(target: "editor-server", taskspace = %id, "{line}");
        }
    });
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
