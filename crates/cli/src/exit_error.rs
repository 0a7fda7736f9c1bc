// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exit-code mapping for CLI failures.
//!
//! 0 success, 1 generic failure, 2 when the bus is unreachable (socket
//! missing or the ack window elapsed). Every failure prints a single
//! diagnostic line on stderr.

use crate::client::ClientError;

pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<ClientError>() {
        Some(ClientError::Unavailable(_)) | Some(ClientError::Timeout) => 2,
        _ => 1,
    }
}

pub fn exit_with(err: anyhow::Error) -> ! {
    eprintln!("swo: {err:#}");
    std::process::exit(exit_code(&err));
}

#[cfg(test)]
#[path = "exit_error_tests.rs"]
mod tests;
