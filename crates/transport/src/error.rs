// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transport error taxonomy.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    /// The control channel could not be brought up (or died during the
    /// setup grace period).
    #[error("control channel setup failed for {host}: {detail}")]
    Setup { host: String, detail: String },

    /// A remote command exited non-zero.
    #[error("remote command failed on {host}: `{command}` exited with {code}: {stderr}")]
    CommandFailed {
        host: String,
        command: String,
        code: i32,
        stderr: String,
    },

    /// A file copy subordinate exited non-zero.
    #[error("upload to {host} failed: {local} -> {remote}: {detail}")]
    UploadFailed {
        host: String,
        local: String,
        remote: String,
        detail: String,
    },

    /// An operation that requires an established channel was called
    /// before `ensure_channel`.
    #[error("no control channel established for {host}")]
    ChannelNotEstablished { host: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
