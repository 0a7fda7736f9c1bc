// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote filesystem layout under the base directory.
//!
//! Every derived path is a pure function of the base directory and,
//! where applicable, the taskspace identifier, so a restarted
//! controller rediscovers the same layout. Paths are remote POSIX
//! strings, never local `PathBuf`s.

use crate::id::TaskspaceId;

/// Pinned editor-server release installed on the remote host.
pub const EDITOR_VERSION: &str = "1.84.2";

/// Short architecture tag for a `uname -m` value.
///
/// Unknown machines fall back to `linux-x64`; the caller decides
/// whether that deserves a warning.
pub fn arch_tag(uname_machine: &str) -> Option<&'static str> {
    match uname_machine.trim() {
        "x86_64" => Some("linux-x64"),
        "aarch64" | "arm64" => Some("linux-arm64"),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePaths {
    base: String,
}

impl RemotePaths {
    pub fn new(base: impl Into<String>) -> Self {
        let mut base = base.into();
        while base.ends_with('/') {
            base.pop();
        }
        Self { base }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Bus daemon socket. Its presence is the daemon liveness signal.
    pub fn daemon_socket(&self) -> String {
        format!("{}/daemon.sock", self.base)
    }

    pub fn bin_dir(&self) -> String {
        format!("{}/bin", self.base)
    }

    /// Wrapper script taskspace processes invoke as `swo`.
    pub fn cli_wrapper(&self) -> String {
        format!("{}/bin/swo", self.base)
    }

    pub fn tools_dir(&self) -> String {
        format!("{}/remote-tools", self.base)
    }

    pub fn tools_cli(&self) -> String {
        format!("{}/remote-tools/swo", self.base)
    }

    pub fn tools_daemon(&self) -> String {
        format!("{}/remote-tools/swod", self.base)
    }

    pub fn tools_archive(&self, version: &str, arch: &str) -> String {
        format!("{}/swo-remote-{version}-{arch}.tar.gz", self.base)
    }

    pub fn editor_dir(&self) -> String {
        format!("{}/openvscode-server", self.base)
    }

    pub fn editor_binary(&self) -> String {
        format!("{}/openvscode-server/bin/openvscode-server", self.base)
    }

    pub fn editor_archive(&self) -> String {
        format!("{}/openvscode-server.tar.gz", self.base)
    }

    /// User-data root shared by every taskspace on the host.
    pub fn user_data_dir(&self) -> String {
        format!("{}/vscode-user-data", self.base)
    }

    pub fn taskspace_root(&self, id: TaskspaceId) -> String {
        format!("{}/taskspaces/{id}", self.base)
    }

    pub fn clone_dir(&self, id: TaskspaceId) -> String {
        format!("{}/taskspaces/{id}/clone", self.base)
    }

    pub fn clone_script(&self, id: TaskspaceId) -> String {
        format!("{}/taskspaces/{id}/fresh-clone.sh", self.base)
    }

    pub fn server_data_dir(&self, id: TaskspaceId) -> String {
        format!("{}/taskspaces/taskspace-{id}/server-data", self.base)
    }

    pub fn extensions_dir(&self, id: TaskspaceId) -> String {
        format!("{}/taskspaces/taskspace-{id}/extensions", self.base)
    }

    /// Parent of `server_data_dir`/`extensions_dir`, removed on delete.
    pub fn editor_state_root(&self, id: TaskspaceId) -> String {
        format!("{}/taskspaces/taskspace-{id}", self.base)
    }
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
