// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Core types for theoldswitcheroo: taskspace identity, bus events,
//! the roster, and remote path derivations shared by the controller,
//! the bus daemon, and the taskspace CLI.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod event;
pub mod id;
pub mod paths;
pub mod roster;
pub mod taskspace;

pub use event::{BusEvent, ProgressCategory, TaskspaceStatusEntry};
pub use id::{extract_taskspace_id, TaskspaceId};
pub use paths::RemotePaths;
pub use roster::{Roster, RosterError};
pub use taskspace::{ExtensionManifest, ProgressEntry, Taskspace, TaskspaceState, ViewMode};
