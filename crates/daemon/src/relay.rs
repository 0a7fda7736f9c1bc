// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Two-way fan-in/fan-out between the controller channel and local
//! socket clients.
//!
//! The relay never parses message bodies: complete newline-terminated
//! lines are copied verbatim. Client lines funnel into a single
//! ordered channel (the daemon's stdout writer), so lines from
//! different clients interleave whole, never byte-wise. Lines from the
//! controller broadcast to every connected client.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tracing::{debug, warn};

type ClientMap = Arc<Mutex<HashMap<u64, mpsc::UnboundedSender<String>>>>;

/// Fan-in/fan-out hub for bus clients.
pub struct Relay {
    clients: ClientMap,
    next_id: AtomicU64,
    out_tx: mpsc::Sender<String>,
}

impl Relay {
    /// Create the relay and the ordered stream of client lines the
    /// daemon writes to its stdout.
    pub fn new() -> (Self, mpsc::Receiver<String>) {
        let (out_tx, out_rx) = mpsc::channel(256);
        (
            Self {
                clients: Arc::new(Mutex::new(HashMap::new())),
                next_id: AtomicU64::new(1),
                out_tx,
            },
            out_rx,
        )
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }

    /// Adopt a newly accepted client connection.
    pub fn register(&self, stream: UnixStream) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (read_half, write_half) = stream.into_split();
        let (tx, rx) = mpsc::unbounded_channel();

        self.clients.lock().insert(id, tx);
        debug!(client = id, "client connected");

        tokio::spawn(reader_task(
            id,
            read_half,
            self.out_tx.clone(),
            Arc::clone(&self.clients),
        ));
        tokio::spawn(writer_task(id, write_half, rx, Arc::clone(&self.clients)));
    }

    /// Broadcast one controller line to every connected client.
    ///
    /// A client whose writer is gone is dropped here; nobody else is
    /// affected.
    pub fn broadcast(&self, line: &str) {
        self.clients.lock().retain(|id, tx| {
            let delivered = tx.send(line.to_string()).is_ok();
            if !delivered {
                debug!(client = id, "dropping client with closed writer");
            }
            delivered
        });
    }

    /// Disconnect every client (their writer channels close).
    pub fn shutdown(&self) {
        self.clients.lock().clear();
    }
}

fn deregister(clients: &ClientMap, id: u64) {
    clients.lock().remove(&id);
}

/// Copy complete lines from one client to the controller stream.
async fn reader_task(
    id: u64,
    read_half: OwnedReadHalf,
    out_tx: mpsc::Sender<String>,
    clients: ClientMap,
) {
    let mut lines = BufReader::new(read_half).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if out_tx.send(line).await.is_err() {
                    // Controller stream gone; the daemon is exiting.
                    break;
                }
            }
            Ok(None) => {
                debug!(client = id, "client disconnected");
                break;
            }
            Err(e) => {
                warn!(client = id, error = %e, "client read failed, dropping client");
                break;
            }
        }
    }
    deregister(&clients, id);
}

/// Deliver broadcast lines to one client.
async fn writer_task(
    id: u64,
    mut write_half: OwnedWriteHalf,
    mut rx: mpsc::UnboundedReceiver<String>,
    clients: ClientMap,
) {
    while let Some(line) = rx.recv().await {
        let framed = format!("{line}\n");
        if let Err(e) = write_half.write_all(framed.as_bytes()).await {
            warn!(client = id, error = %e, "client write failed, dropping client");
            break;
        }
    }
    deregister(&clients, id);
    // Half-close so fire-and-forget clients waiting for EOF move on.
    let _ = write_half.shutdown().await;
}

#[cfg(test)]
#[path = "relay_tests.rs"]
mod tests;
