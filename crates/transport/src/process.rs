// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handles for streaming subordinates and port forwards.

use std::process::ExitStatus;
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout};

/// A streaming remote process with piped stdio.
///
/// The child is spawned with kill-on-drop, so discarding the handle
/// ends the subordinate; the channel closing ends it too.
#[derive(Debug)]
pub struct RemoteProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
}

impl RemoteProcess {
    pub(crate) fn new(mut child: Child) -> Self {
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        Self {
            child,
            stdin,
            stdout,
            stderr,
        }
    }

    pub fn take_stdin(&mut self) -> Option<ChildStdin> {
        self.stdin.take()
    }

    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.stdout.take()
    }

    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.stderr.take()
    }

    /// Wait for the subordinate to exit.
    pub async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        self.child.wait().await
    }

    /// Ask the subordinate to stop without waiting.
    pub fn start_kill(&mut self) -> std::io::Result<()> {
        self.child.start_kill()
    }
}

/// A live local-to-remote port forward.
///
/// Holds the forwarding subordinate; dropping the handle kills it,
/// which tears the forward down.
#[derive(Debug)]
pub struct Tunnel {
    local_port: u16,
    remote_port: u16,
    // None for test tunnels that have no backing process.
    child: Option<Child>,
}

impl Tunnel {
    pub(crate) fn new(local_port: u16, remote_port: u16, child: Child) -> Self {
        Self {
            local_port,
            remote_port,
            child: Some(child),
        }
    }

    /// A tunnel handle with no backing process, for fakes and tests.
    pub fn detached(local_port: u16, remote_port: u16) -> Self {
        Self {
            local_port,
            remote_port,
            child: None,
        }
    }

    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    pub fn remote_port(&self) -> u16 {
        self.remote_port
    }
}

impl Drop for Tunnel {
    fn drop(&mut self) {
        if let Some(child) = self.child.as_mut() {
            // kill-on-drop also covers this; the explicit kill makes
            // teardown immediate rather than at next reap.
            let _ = child.start_kill();
        }
    }
}
