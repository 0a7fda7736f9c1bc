// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Port-bound health probe with capped exponential backoff.
//!
//! `GET /` on the forwarded local port; anything but a 200 counts as a
//! failed attempt. Probe failure is locally recoverable: the caller
//! marks the taskspace stale and retries the whole start cycle on the
//! next interaction.

use std::time::Duration;

use tracing::debug;

use crate::error::ControllerError;

#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Per-attempt HTTP timeout.
    pub attempt_timeout: Duration,
    pub backoff_start: Duration,
    pub backoff_cap: Duration,
    pub max_attempts: u32,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            attempt_timeout: crate::env::probe_timeout(),
            backoff_start: Duration::from_secs(1),
            backoff_cap: Duration::from_secs(5),
            max_attempts: 10,
        }
    }
}

/// Probe the editor server on a forwarded local port.
pub async fn probe_editor(port: u16, config: &ProbeConfig) -> Result<(), ControllerError> {
    probe_url(&format!("http://localhost:{port}/"), config)
        .await
        .map_err(|attempts| ControllerError::Probe { port, attempts })
}

/// Probe `url` until it answers 200 or the attempt budget runs out.
/// On failure returns the number of attempts made.
pub async fn probe_url(url: &str, config: &ProbeConfig) -> Result<(), u32> {
    // The target is always a forwarded localhost port; never route
    // probes through a configured proxy.
    let client = match reqwest::Client::builder()
        .timeout(config.attempt_timeout)
        .no_proxy()
        .build()
    {
        Ok(client) => client,
        Err(_) => return Err(0),
    };

    let mut delay = config.backoff_start;
    for attempt in 1..=config.max_attempts {
        match client.get(url).send().await {
            Ok(response) if response.status().as_u16() == 200 => {
                debug!(url, attempt, "probe succeeded");
                return Ok(());
            }
            Ok(response) => {
                debug!(url, attempt, status = %response.status(), "probe got non-200");
            }
            Err(e) => {
                debug!(url, attempt, error = %e, "probe attempt failed");
            }
        }

        if attempt < config.max_attempts {
            tokio::time::sleep(delay).await;
            delay = std::cmp::min(delay * 2, config.backoff_cap);
        }
    }
    Err(config.max_attempts)
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
