// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status request command.

use anyhow::Result;
use chrono::Utc;
use swo_core::BusEvent;

use crate::client;

/// Emit a `status_request`. The `status_response` goes to the
/// controller and is broadcast to bus clients; this command does not
/// wait for it.
pub async fn status() -> Result<()> {
    let event = BusEvent::StatusRequest {
        timestamp: Utc::now(),
    };
    client::send_event(&event).await?;
    Ok(())
}
