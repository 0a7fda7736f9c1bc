// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted in-memory transport for tests.
//!
//! Commands are matched by substring against registered rules;
//! streaming commands run a local `sh` script standing in for the
//! remote process, so callers exercise real piped stdio.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::process::Command;

use crate::error::TransportError;
use crate::process::{RemoteProcess, Tunnel};
use crate::Transport;

#[derive(Default)]
pub struct FakeTransport {
    calls: Mutex<Vec<String>>,
    uploads: Mutex<Vec<(PathBuf, String)>>,
    channels: Mutex<HashSet<String>>,
    exec_rules: Mutex<Vec<(String, Result<String, String>)>>,
    stream_scripts: Mutex<Vec<(String, String)>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// When an executed command contains `needle`, reply with `stdout`.
    pub fn on_exec(&self, needle: impl Into<String>, stdout: impl Into<String>) {
        self.exec_rules
            .lock()
            .push((needle.into(), Ok(stdout.into())));
    }

    /// When an executed command contains `needle`, fail with `stderr`.
    pub fn on_exec_fail(&self, needle: impl Into<String>, stderr: impl Into<String>) {
        self.exec_rules
            .lock()
            .push((needle.into(), Err(stderr.into())));
    }

    /// When a streamed command contains `needle`, run `script` locally
    /// under `sh -c` as the stand-in remote process.
    pub fn on_stream(&self, needle: impl Into<String>, script: impl Into<String>) {
        self.stream_scripts
            .lock()
            .push((needle.into(), script.into()));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn uploads(&self) -> Vec<(PathBuf, String)> {
        self.uploads.lock().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn ensure_channel(&self, host: &str) -> Result<(), TransportError> {
        self.record(format!("ensure_channel:{host}"));
        self.channels.lock().insert(host.to_string());
        Ok(())
    }

    async fn execute(&self, host: &str, command: &str) -> Result<String, TransportError> {
        self.record(format!("execute:{command}"));
        let rules = self.exec_rules.lock();
        for (needle, response) in rules.iter() {
            if command.contains(needle.as_str()) {
                return match response {
                    Ok(stdout) => Ok(stdout.clone()),
                    Err(stderr) => Err(TransportError::CommandFailed {
                        host: host.to_string(),
                        command: command.to_string(),
                        code: 1,
                        stderr: stderr.clone(),
                    }),
                };
            }
        }
        Ok(String::new())
    }

    async fn execute_streaming(
        &self,
        host: &str,
        command: &str,
    ) -> Result<RemoteProcess, TransportError> {
        self.record(format!("stream:{command}"));
        let script = {
            let scripts = self.stream_scripts.lock();
            scripts
                .iter()
                .find(|(needle, _)| command.contains(needle.as_str()))
                .map(|(_, script)| script.clone())
        };
        let script = match script {
            Some(script) => script,
            None => {
                return Err(TransportError::CommandFailed {
                    host: host.to_string(),
                    command: command.to_string(),
                    code: 127,
                    stderr: "no stream script registered".to_string(),
                })
            }
        };

        let child = Command::new("sh")
            .arg("-c")
            .arg(script)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;
        Ok(RemoteProcess::new(child))
    }

    async fn upload(
        &self,
        _host: &str,
        local_path: &Path,
        remote_path: &str,
    ) -> Result<(), TransportError> {
        self.record(format!("upload:{remote_path}"));
        self.uploads
            .lock()
            .push((local_path.to_path_buf(), remote_path.to_string()));
        Ok(())
    }

    async fn forward_port(
        &self,
        host: &str,
        local_port: u16,
        remote_port: u16,
    ) -> Result<Tunnel, TransportError> {
        if !self.channels.lock().contains(host) {
            return Err(TransportError::ChannelNotEstablished {
                host: host.to_string(),
            });
        }
        self.record(format!("forward:{local_port}->{remote_port}"));
        Ok(Tunnel::detached(local_port, remote_port))
    }

    async fn shutdown_all(&self) {
        self.record("shutdown_all".to_string());
        self.channels.lock().clear();
    }
}
