// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bus daemon client: deposit one event line on the socket.

use std::path::{Path, PathBuf};
use std::time::Duration;

use swo_core::BusEvent;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The daemon socket does not exist; there is no bus to talk to.
    #[error("bus daemon unavailable: no socket at {0}")]
    Unavailable(PathBuf),

    /// The daemon did not close our connection within the ack window.
    #[error("timed out waiting for the bus daemon to accept the event")]
    Timeout,

    #[error("event serialization failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Send one event to the daemon resolved from the environment.
pub async fn send_event(event: &BusEvent) -> Result<(), ClientError> {
    send_event_to(&crate::env::socket_path(), crate::env::ack_timeout(), event).await
}

/// Send one event: connect, write the line, half-close, then wait for
/// the daemon to close its side.
pub async fn send_event_to(
    socket_path: &Path,
    ack_timeout: Duration,
    event: &BusEvent,
) -> Result<(), ClientError> {
    if !socket_path.exists() {
        return Err(ClientError::Unavailable(socket_path.to_path_buf()));
    }

    let mut stream = UnixStream::connect(socket_path).await?;
    let mut line = event.to_line()?;
    line.push('\n');
    stream.write_all(line.as_bytes()).await?;
    stream.shutdown().await?;

    // Drain until EOF so the daemon has observed the full line before
    // we exit; any broadcast bytes arriving meanwhile are discarded.
    let wait = async {
        let mut buf = [0u8; 256];
        loop {
            match stream.read(&mut buf).await {
                Ok(0) => return Ok(()),
                Ok(_) => continue,
                Err(e) => return Err(ClientError::Io(e)),
            }
        }
    };
    match tokio::time::timeout(ack_timeout, wait).await {
        Ok(result) => result,
        Err(_) => Err(ClientError::Timeout),
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
