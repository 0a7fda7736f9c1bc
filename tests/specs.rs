//! Behavioral specifications for the theoldswitcheroo binaries.
//!
//! These tests are black-box: they run the built `swod` and `swo`
//! binaries against a real Unix socket in a temp base directory and
//! verify stdout, stderr, exit codes, and wire traffic.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

// bus/
#[path = "specs/bus/daemon.rs"]
mod bus_daemon;
#[path = "specs/bus/handoff.rs"]
mod bus_handoff;

// cli/
#[path = "specs/cli/emit.rs"]
mod cli_emit;
#[path = "specs/cli/errors.rs"]
mod cli_errors;
#[path = "specs/cli/tools.rs"]
mod cli_tools;
