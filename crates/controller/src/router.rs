// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event router: line-by-line dispatch of bus daemon output.
//!
//! Lines are processed synchronously in arrival order on one stream;
//! there is no parallel dispatch. Every line ends in exactly one of
//! three places: a named lifecycle handler, the unrecognized-event
//! record, or the daemon-log record.

use swo_core::BusEvent;
use tracing::{error, info, warn};

use crate::bus::Bus;
use crate::lifecycle::Controller;

/// Dispatch one line from the daemon's stdout.
pub async fn dispatch_line(controller: &mut Controller, bus: &mut Bus, line: &str) {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return;
    }

    match BusEvent::parse_line(trimmed) {
        Ok(event) => route_event(controller, bus, event).await,
        Err(_) => match serde_json::from_str::<serde_json::Value>(trimmed) {
            Ok(value) => {
                // Well-formed JSON with an unknown (or missing) type:
                // recorded once, then ignored.
                let event_type = value
                    .get("type")
                    .and_then(|v| v.as_str())
                    .unwrap_or("<missing>");
                warn!(event_type, "unrecognized bus event");
            }
            Err(_) => {
                // Not JSON at all: daemon log output.
                info!(target: "swod", "{trimmed}");
            }
        },
    }
}

async fn route_event(controller: &mut Controller, bus: &mut Bus, event: BusEvent) {
    match event {
        BusEvent::NewTaskspaceRequest {
            name,
            description,
            initial_prompt,
            ..
        } => {
            if let Err(e) = controller
                .handle_new_taskspace_request(name, description, initial_prompt)
                .await
            {
                error!(error = %e, "new_taskspace_request failed");
            }
        }

        BusEvent::UpdateTaskspace {
            uuid,
            name,
            description,
            ..
        } => {
            if let Err(e) = controller.handle_update_taskspace(uuid, name, description) {
                warn!(error = %e, "update_taskspace failed");
            }
        }

        BusEvent::StatusRequest { .. } => {
            let response = controller.status_response();
            if let Err(e) = bus.send(&response).await {
                error!(error = %e, "failed to answer status_request");
            }
        }

        BusEvent::ProgressLog {
            message,
            category,
            taskspace_uuid,
            ..
        } => controller.handle_progress_log(message, category, taskspace_uuid),

        BusEvent::UserSignal {
            message,
            taskspace_uuid,
            ..
        } => controller.handle_user_signal(message, taskspace_uuid),

        // Controller-origin type arriving inbound: a client echoing
        // our own broadcasts. Recorded and ignored.
        BusEvent::StatusResponse { .. } => {
            warn!("status_response received on the inbound stream, ignoring");
        }
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
