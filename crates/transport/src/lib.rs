// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transport multiplexer: one persistent authenticated channel per
//! remote host, with command execution, streaming execution, file
//! upload, and port forwarding riding that channel as subordinate
//! processes.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod error;
mod mux;
mod process;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use error::TransportError;
pub use mux::{SshMux, SshMuxConfig};
pub use process::{RemoteProcess, Tunnel};

use async_trait::async_trait;
use std::path::Path;

/// Host-addressed operations over a persistent authenticated channel.
///
/// All methods assume `ensure_channel` for the host succeeded first;
/// only `forward_port` turns a missing channel into a typed
/// precondition error, the rest surface whatever the underlying
/// subordinate reports. Failures are never retried here.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establish the control channel for `host`. Idempotent.
    async fn ensure_channel(&self, host: &str) -> Result<(), TransportError>;

    /// Run `command` on `host`, capturing stdout until exit.
    ///
    /// Returns stdout trimmed of trailing whitespace; a non-zero exit
    /// fails with the command text, exit code, and captured stderr.
    async fn execute(&self, host: &str, command: &str) -> Result<String, TransportError>;

    /// Run `command` on `host` with piped stdio; the caller frames.
    async fn execute_streaming(
        &self,
        host: &str,
        command: &str,
    ) -> Result<RemoteProcess, TransportError>;

    /// Copy a local file to `remote_path` on `host`.
    async fn upload(
        &self,
        host: &str,
        local_path: &Path,
        remote_path: &str,
    ) -> Result<(), TransportError>;

    /// Forward `localhost:local_port` to `remote_port` on `host`.
    ///
    /// Requires a prior successful `ensure_channel`. Dropping the
    /// returned handle terminates the forward.
    async fn forward_port(
        &self,
        host: &str,
        local_port: u16,
        remote_port: u16,
    ) -> Result<Tunnel, TransportError>;

    /// Terminate every live control channel.
    async fn shutdown_all(&self);
}
