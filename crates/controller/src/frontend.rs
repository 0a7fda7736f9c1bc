// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Loading / error surface contract.
//!
//! The narrow interface the lifecycle expects from whatever renders
//! progress, terminal failure, and the embedded editor views. View
//! handles are opaque: the UI collaborator constructs, stores, and
//! destroys the real views; the core only triggers creation and
//! presents handles back.

use std::sync::atomic::{AtomicU64, Ordering};

use swo_core::Roster;
use tracing::{error, info};

/// Opaque reference to a view owned by the UI collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewHandle(pub u64);

pub trait Frontend: Send + Sync {
    /// Advisory progress text. Fire-and-forget; returns immediately.
    fn update_progress(&self, message: &str);

    /// Terminal failure: the main view stays on the error surface.
    fn show_error(&self, title: &str, message: &str, details: Option<&str>);

    /// Swap the main view to the given handle.
    fn present(&self, view: ViewHandle);

    /// Build an editor view in `partition` pointing at `initial_url`.
    fn create_editor_view(&self, partition: &str, initial_url: &str) -> ViewHandle;

    /// Build a meta view in `partition`.
    fn create_meta_view(&self, partition: &str) -> ViewHandle;

    /// The roster changed structurally (creation, removal, focus).
    fn roster_changed(&self, roster: &Roster);
}

/// Headless frontend: renders everything into the log stream.
#[derive(Default)]
pub struct LoggingFrontend {
    next_handle: AtomicU64,
}

impl LoggingFrontend {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&self) -> ViewHandle {
        ViewHandle(self.next_handle.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

impl Frontend for LoggingFrontend {
    fn update_progress(&self, message: &str) {
        info!(target: "frontend", "{message}");
    }

    fn show_error(&self, title: &str, message: &str, details: Option<&str>) {
        match details {
            Some(details) => error!(target: "frontend", "{title}: {message}\n{details}"),
            None => error!(target: "frontend", "{title}: {message}"),
        }
    }

    fn present(&self, view: ViewHandle) {
        info!(target: "frontend", view = view.0, "present");
    }

    fn create_editor_view(&self, partition: &str, initial_url: &str) -> ViewHandle {
        let view = self.next();
        info!(target: "frontend", view = view.0, partition, url = initial_url, "editor view created");
        view
    }

    fn create_meta_view(&self, partition: &str) -> ViewHandle {
        let view = self.next();
        info!(target: "frontend", view = view.0, partition, "meta view created");
        view
    }

    fn roster_changed(&self, roster: &Roster) {
        info!(
            target: "frontend",
            taskspaces = roster.len(),
            active = %roster.active_id().map(|id| id.to_string()).unwrap_or_default(),
            "roster changed"
        );
    }
}

/// Frontend that records every call, for lifecycle tests.
#[cfg(test)]
pub(crate) struct RecordingFrontend {
    pub calls: parking_lot::Mutex<Vec<String>>,
    next_handle: AtomicU64,
}

#[cfg(test)]
impl RecordingFrontend {
    pub fn new() -> Self {
        Self {
            calls: parking_lot::Mutex::new(Vec::new()),
            next_handle: AtomicU64::new(0),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }
}

#[cfg(test)]
impl Frontend for RecordingFrontend {
    fn update_progress(&self, message: &str) {
        self.record(format!("progress:{message}"));
    }

    fn show_error(&self, title: &str, message: &str, _details: Option<&str>) {
        self.record(format!("error:{title}:{message}"));
    }

    fn present(&self, view: ViewHandle) {
        self.record(format!("present:{}", view.0));
    }

    fn create_editor_view(&self, partition: &str, initial_url: &str) -> ViewHandle {
        let view = ViewHandle(self.next_handle.fetch_add(1, Ordering::Relaxed) + 1);
        self.record(format!("editor_view:{partition}:{initial_url}"));
        view
    }

    fn create_meta_view(&self, partition: &str) -> ViewHandle {
        let view = ViewHandle(self.next_handle.fetch_add(1, Ordering::Relaxed) + 1);
        self.record(format!("meta_view:{partition}"));
        view
    }

    fn roster_changed(&self, roster: &Roster) {
        self.record(format!("roster_changed:{}", roster.len()));
    }
}
