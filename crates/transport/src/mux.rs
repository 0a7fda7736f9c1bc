// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SSH ControlMaster-backed transport.
//!
//! One `ssh -M -N` master per host, bound to a per-host control
//! socket. Every other operation is a short-lived `ssh -S` / `scp -o
//! ControlPath` child riding that master, so controller exit (which
//! kills the masters) ends every subordinate with no PID tracking.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::process::{RemoteProcess, Tunnel};
use crate::Transport;

/// Keep-alive probe interval on the master; three missed probes drop
/// the channel so hung transports fail fast.
const SERVER_ALIVE_INTERVAL_SECS: u32 = 60;
const SERVER_ALIVE_COUNT_MAX: u32 = 3;

/// Default grace period after spawning a master before the channel is
/// considered usable.
const DEFAULT_SETUP_GRACE: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone)]
pub struct SshMuxConfig {
    /// Directory holding per-host control sockets.
    pub control_dir: PathBuf,
    pub ssh_binary: String,
    pub scp_binary: String,
    pub setup_grace: Duration,
}

impl SshMuxConfig {
    pub fn new(control_dir: impl Into<PathBuf>) -> Self {
        Self {
            control_dir: control_dir.into(),
            ssh_binary: env_or("SWO_SSH_BINARY", "ssh"),
            scp_binary: env_or("SWO_SCP_BINARY", "scp"),
            setup_grace: env_duration_ms("SWO_SETUP_GRACE_MS").unwrap_or(DEFAULT_SETUP_GRACE),
        }
    }
}

fn env_or(var: &str, default: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| default.to_string())
}

fn env_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Transport multiplexer over OpenSSH control sockets.
pub struct SshMux {
    config: SshMuxConfig,
    masters: tokio::sync::Mutex<HashMap<String, Child>>,
}

/// Reduce a host name to something safe in a socket file name.
fn sanitize_host(host: &str) -> String {
    host.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Arguments for the persistent control master.
fn master_args(control_path: &str, host: &str) -> Vec<String> {
    vec![
        "-M".to_string(),
        "-N".to_string(),
        "-o".to_string(),
        format!("ControlPath={control_path}"),
        "-o".to_string(),
        "ControlPersist=no".to_string(),
        "-o".to_string(),
        format!("ServerAliveInterval={SERVER_ALIVE_INTERVAL_SECS}"),
        "-o".to_string(),
        format!("ServerAliveCountMax={SERVER_ALIVE_COUNT_MAX}"),
        "-o".to_string(),
        "BatchMode=yes".to_string(),
        host.to_string(),
    ]
}

/// Arguments for a command subordinate riding the master.
fn exec_args(control_path: &str, host: &str, command: &str) -> Vec<String> {
    vec![
        "-S".to_string(),
        control_path.to_string(),
        "-o".to_string(),
        "BatchMode=yes".to_string(),
        host.to_string(),
        "--".to_string(),
        command.to_string(),
    ]
}

/// Arguments for a dedicated port-forward subordinate.
fn forward_args(control_path: &str, host: &str, local_port: u16, remote_port: u16) -> Vec<String> {
    vec![
        "-S".to_string(),
        control_path.to_string(),
        "-N".to_string(),
        "-o".to_string(),
        "BatchMode=yes".to_string(),
        "-L".to_string(),
        format!("{local_port}:localhost:{remote_port}"),
        host.to_string(),
    ]
}

impl SshMux {
    pub fn new(config: SshMuxConfig) -> Self {
        Self {
            config,
            masters: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    fn control_path(&self, host: &str) -> String {
        self.config
            .control_dir
            .join(format!("ctl-{}.sock", sanitize_host(host)))
            .to_string_lossy()
            .into_owned()
    }

    fn exit_code(status: std::process::ExitStatus) -> i32 {
        status.code().unwrap_or(-1)
    }
}

#[async_trait]
impl Transport for SshMux {
    async fn ensure_channel(&self, host: &str) -> Result<(), TransportError> {
        let mut masters = self.masters.lock().await;
        if let Some(master) = masters.get_mut(host) {
            match master.try_wait()? {
                // Live master: idempotent success.
                None => return Ok(()),
                // The master died (network drop, keep-alive expiry);
                // fall through and re-establish.
                Some(status) => {
                    warn!(host, code = status.code(), "control channel died, re-establishing");
                    masters.remove(host);
                }
            }
        }

        std::fs::create_dir_all(&self.config.control_dir)?;
        let control_path = self.control_path(host);

        let mut child = Command::new(&self.config.ssh_binary)
            .args(master_args(&control_path, host))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        // The master authenticates in the background; give it a grace
        // period, and fail setup if it died before the channel is up.
        tokio::time::sleep(self.config.setup_grace).await;

        if let Some(status) = child.try_wait()? {
            let mut detail = String::new();
            if let Some(mut stderr) = child.stderr.take() {
                let _ = stderr.read_to_string(&mut detail).await;
            }
            let detail = detail.trim();
            return Err(TransportError::Setup {
                host: host.to_string(),
                detail: if detail.is_empty() {
                    format!("control process exited with {}", Self::exit_code(status))
                } else {
                    detail.to_string()
                },
            });
        }

        info!(host, control_path, "control channel established");
        masters.insert(host.to_string(), child);
        Ok(())
    }

    async fn execute(&self, host: &str, command: &str) -> Result<String, TransportError> {
        let control_path = self.control_path(host);
        debug!(host, command, "executing remote command");

        let output = Command::new(&self.config.ssh_binary)
            .args(exec_args(&control_path, host, command))
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(TransportError::CommandFailed {
                host: host.to_string(),
                command: command.to_string(),
                code: Self::exit_code(output.status),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .trim_end()
            .to_string())
    }

    async fn execute_streaming(
        &self,
        host: &str,
        command: &str,
    ) -> Result<RemoteProcess, TransportError> {
        let control_path = self.control_path(host);
        debug!(host, command, "spawning streaming remote command");

        let child = Command::new(&self.config.ssh_binary)
            .args(exec_args(&control_path, host, command))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        Ok(RemoteProcess::new(child))
    }

    async fn upload(
        &self,
        host: &str,
        local_path: &Path,
        remote_path: &str,
    ) -> Result<(), TransportError> {
        let control_path = self.control_path(host);

        let output = Command::new(&self.config.scp_binary)
            .arg("-o")
            .arg(format!("ControlPath={control_path}"))
            .arg("-o")
            .arg("BatchMode=yes")
            .arg(local_path)
            .arg(format!("{host}:{remote_path}"))
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(TransportError::UploadFailed {
                host: host.to_string(),
                local: local_path.display().to_string(),
                remote: remote_path.to_string(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }

    async fn forward_port(
        &self,
        host: &str,
        local_port: u16,
        remote_port: u16,
    ) -> Result<Tunnel, TransportError> {
        {
            let masters = self.masters.lock().await;
            if !masters.contains_key(host) {
                return Err(TransportError::ChannelNotEstablished {
                    host: host.to_string(),
                });
            }
        }

        let control_path = self.control_path(host);
        let child = Command::new(&self.config.ssh_binary)
            .args(forward_args(&control_path, host, local_port, remote_port))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        info!(host, local_port, remote_port, "port forward opened");
        Ok(Tunnel::new(local_port, remote_port, child))
    }

    async fn shutdown_all(&self) {
        let mut masters = self.masters.lock().await;
        for (host, mut child) in masters.drain() {
            let control_path = self.control_path(&host);

            // Ask the master to exit cleanly first; fall back to a kill.
            let exit = Command::new(&self.config.ssh_binary)
                .args(["-S", &control_path, "-O", "exit", &host])
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .output();
            match tokio::time::timeout(Duration::from_secs(5), exit).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => warn!(host, error = %e, "control exit request failed"),
                Err(_) => warn!(host, "control exit request timed out"),
            }

            let _ = child.start_kill();
            let _ = child.wait().await;
            info!(host, "control channel closed");
        }
    }
}

#[cfg(test)]
#[path = "mux_tests.rs"]
mod tests;
