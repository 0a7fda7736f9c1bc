// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Controller error taxonomy, by origin.
//!
//! Probe and persistence failures recover locally; everything else
//! surfaces to the caller and resolves the in-flight transition to a
//! defined state.

use swo_core::TaskspaceId;
use swo_transport::TransportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Clone script or directory creation failed; the roster entry
    /// reverts to absent.
    #[error("provisioning failed for taskspace {id}: {detail}")]
    Provisioning { id: TaskspaceId, detail: String },

    /// The editor server announced no port within the startup window;
    /// the taskspace reverts to cloned with its port cleared.
    #[error("editor server for taskspace {id} announced no port within {timeout_secs}s")]
    StartupTimeout { id: TaskspaceId, timeout_secs: u64 },

    /// The editor server could not be launched at all.
    #[error("editor server startup failed for taskspace {id}: {detail}")]
    Startup { id: TaskspaceId, detail: String },

    /// The HTTP probe failed after its retry budget; the taskspace is
    /// stale until the next interaction restarts it.
    #[error("health probe on port {port} failed after {attempts} attempts")]
    Probe { port: u16, attempts: u32 },

    #[error("bus daemon error: {0}")]
    Bus(String),

    #[error(transparent)]
    Persistence(#[from] swo_storage::StorageError),

    #[error("unknown taskspace {0}")]
    UnknownTaskspace(TaskspaceId),

    #[error("no hostname configured; set \"hostname\" in settings.json")]
    NoHostname,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
