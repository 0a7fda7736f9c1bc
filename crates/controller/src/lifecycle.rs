// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The taskspace state machine.
//!
//! Transitions are processed sequentially on the controller's main
//! task, so per-taskspace ordering needs no locks: while one
//! transition awaits its subordinates, the next bus event (focus,
//! delete, create) simply waits its turn in the event loop.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use swo_core::{
    BusEvent, ExtensionManifest, ProgressCategory, RemotePaths, Roster, Taskspace, TaskspaceId,
    TaskspaceState,
};
use swo_storage::Store;
use swo_transport::{RemoteProcess, Transport, Tunnel};
use tracing::{error, info, warn};

use chrono::Utc;

use crate::error::ControllerError;
use crate::frontend::{Frontend, ViewHandle};
use crate::install;
use crate::probe::{self, ProbeConfig};
use crate::server;

/// Resolved project definition. Loading the definition files
/// (fresh-clone.sh, extension list, .vsix packages) is the UI
/// collaborator's concern; the controller receives this form.
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    /// Contents of the per-taskspace `fresh-clone.sh`. Invoked with
    /// the clone directory as its single argument.
    pub clone_script: String,
    /// Marketplace extension identifiers to install per taskspace.
    pub marketplace_extensions: Vec<String>,
    /// Local `.vsix` packages uploaded into each taskspace root.
    pub vsix_paths: Vec<PathBuf>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            clone_script: "#!/bin/sh\nmkdir -p \"$1\"\n".to_string(),
            marketplace_extensions: Vec::new(),
            vsix_paths: Vec::new(),
        }
    }
}

impl ProjectConfig {
    fn manifest(&self) -> ExtensionManifest {
        ExtensionManifest {
            marketplace: self.marketplace_extensions.clone(),
            vsix_files: self
                .vsix_paths
                .iter()
                .filter_map(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .collect(),
        }
    }
}

/// The taskspace lifecycle controller for one remote host.
pub struct Controller {
    host: String,
    transport: Arc<dyn Transport>,
    frontend: Arc<dyn Frontend>,
    store: Store,
    paths: RemotePaths,
    project: ProjectConfig,
    roster: Roster,
    forwards: HashMap<TaskspaceId, Tunnel>,
    servers: HashMap<TaskspaceId, RemoteProcess>,
    views: HashMap<TaskspaceId, ViewHandle>,
    meta_views: HashMap<TaskspaceId, ViewHandle>,
    startup_timeout: Duration,
    probe_config: ProbeConfig,
    initial_boot: bool,
}

impl Controller {
    pub fn new(
        host: impl Into<String>,
        transport: Arc<dyn Transport>,
        frontend: Arc<dyn Frontend>,
        store: Store,
        paths: RemotePaths,
        project: ProjectConfig,
    ) -> Self {
        let host = host.into();
        Self {
            roster: Roster::new(host.clone()),
            host,
            transport,
            frontend,
            store,
            paths,
            project,
            forwards: HashMap::new(),
            servers: HashMap::new(),
            views: HashMap::new(),
            meta_views: HashMap::new(),
            startup_timeout: crate::env::startup_timeout(),
            probe_config: ProbeConfig::default(),
            initial_boot: true,
        }
    }

    /// Override the designed timeouts (tests and power users).
    pub fn with_timeouts(mut self, startup_timeout: Duration, probe_config: ProbeConfig) -> Self {
        self.startup_timeout = startup_timeout;
        self.probe_config = probe_config;
        self
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn paths(&self) -> &RemotePaths {
        &self.paths
    }

    /// Whether we are still in the initial boot, where a startup
    /// failure reaches the terminal error surface.
    pub fn is_initial_boot(&self) -> bool {
        self.initial_boot
    }

    /// Bring the host up: channel, installs, restore, and one focused
    /// running taskspace.
    pub async fn startup(&mut self) -> Result<(), ControllerError> {
        self.frontend
            .update_progress(&format!("Connecting to {}...", self.host));
        self.transport.ensure_channel(&self.host).await?;

        self.frontend.update_progress("Installing editor server...");
        install::ensure_editor(self.transport.as_ref(), &self.host, &self.paths).await?;
        self.frontend.update_progress("Installing remote tools...");
        install::ensure_remote_tools(self.transport.as_ref(), &self.host, &self.paths).await?;

        self.restore_roster().await?;

        if self.roster.is_empty() {
            self.frontend.update_progress("Creating first taskspace...");
            self.create_taskspace("Taskspace 1".to_string(), None, None)
                .await?;
        }

        let focus = match self.roster.active_id() {
            Some(id) => Some(id),
            None => self.roster.iter().next().map(|t| t.id),
        };
        if let Some(id) = focus {
            self.focus_taskspace(id).await?;
        }

        self.initial_boot = false;
        Ok(())
    }

    /// Read the persisted roster and restore every entry whose clone
    /// directory still exists; the rest are dropped.
    async fn restore_roster(&mut self) -> Result<(), ControllerError> {
        let file = self.store.load_roster();
        if file.taskspaces.is_empty() {
            return Ok(());
        }

        for record in file.taskspaces {
            self.frontend
                .update_progress(&format!("Restoring {}...", record.name));
            let clone_dir = self.paths.clone_dir(record.uuid);
            let present = install::remote_exists(
                self.transport.as_ref(),
                &self.host,
                "-d",
                &clone_dir,
            )
            .await?;
            if !present {
                info!(taskspace = %record.uuid, "clone directory gone, dropping roster entry");
                continue;
            }

            let mut taskspace = Taskspace::restored(
                record.uuid,
                record.name,
                record.port,
                record.extensions,
            );
            taskspace.description = record.description;
            if let Err(e) = self.roster.insert(taskspace) {
                warn!(error = %e, "skipping duplicate roster entry");
            }
        }

        if let Some(active) = file.active_task_space_uuid {
            if self.roster.contains(active) {
                let _ = self.roster.set_active(active);
            }
        }
        if self.roster.active_id().is_none() {
            let first = self.roster.iter().next().map(|t| t.id);
            if let Some(first) = first {
                let _ = self.roster.set_active(first);
            }
        }

        self.roster_changed();
        Ok(())
    }

    /// Absent -> Provisioning -> Cloned. On provisioning failure the
    /// entry reverts to absent, in memory and on disk.
    pub async fn create_taskspace(
        &mut self,
        name: String,
        description: Option<String>,
        initial_prompt: Option<String>,
    ) -> Result<TaskspaceId, ControllerError> {
        let mut taskspace = Taskspace::new(name.clone());
        taskspace.description = description;
        taskspace.extensions = self.project.manifest();
        if let Some(prompt) = initial_prompt {
            taskspace.push_progress(format!("initial prompt: {prompt}"), ProgressCategory::Info);
        }
        let id = taskspace.id;

        self.roster
            .insert(taskspace)
            .map_err(|e| ControllerError::Provisioning {
                id,
                detail: e.to_string(),
            })?;
        if self.roster.active_id().is_none() {
            let _ = self.roster.set_active(id);
        }
        self.roster_changed();

        self.frontend
            .update_progress(&format!("Provisioning {name}..."));
        match self.provision(id).await {
            Ok(()) => {
                if let Some(ts) = self.roster.get_mut(id) {
                    ts.state = TaskspaceState::Cloned;
                }
                self.roster_changed();
                info!(taskspace = %id, "taskspace provisioned");
                Ok(id)
            }
            Err(e) => {
                self.roster.remove(id);
                self.roster_changed();
                Err(e)
            }
        }
    }

    /// Create the remote directories and run the clone script.
    async fn provision(&mut self, id: TaskspaceId) -> Result<(), ControllerError> {
        let root = self.paths.taskspace_root(id);
        let script_path = self.paths.clone_script(id);
        let clone_dir = self.paths.clone_dir(id);

        self.transport
            .execute(&self.host, &format!("mkdir -p {root}"))
            .await
            .map_err(|e| ControllerError::Provisioning {
                id,
                detail: e.to_string(),
            })?;

        let local_script = self.write_local_temp(&format!("fresh-clone-{id}.sh"), &self.project.clone_script)?;
        let uploaded = self
            .transport
            .upload(&self.host, &local_script, &script_path)
            .await;
        let _ = std::fs::remove_file(&local_script);
        uploaded.map_err(|e| ControllerError::Provisioning {
            id,
            detail: e.to_string(),
        })?;

        self.transport
            .execute(&self.host, &format!("sh {script_path} {clone_dir}"))
            .await
            .map_err(|e| ControllerError::Provisioning {
                id,
                detail: e.to_string(),
            })?;
        Ok(())
    }

    fn write_local_temp(&self, name: &str, content: &str) -> Result<PathBuf, ControllerError> {
        let dir = self.store.dir().join("tmp");
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(name);
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Cloned/Stale -> Starting -> Running. On startup timeout the
    /// taskspace reverts to Cloned with its port cleared.
    pub async fn start_server(&mut self, id: TaskspaceId) -> Result<(), ControllerError> {
        let taskspace = self
            .roster
            .get(id)
            .cloned()
            .ok_or(ControllerError::UnknownTaskspace(id))?;

        if let Some(ts) = self.roster.get_mut(id) {
            ts.state = TaskspaceState::Starting;
        }
        // A stale forward must not outlive the server it pointed at.
        self.forwards.remove(&id);
        if let Some(mut old) = self.servers.remove(&id) {
            let _ = old.start_kill();
        }

        if let Err(e) = self.upload_vsix_packages(id).await {
            if let Some(ts) = self.roster.get_mut(id) {
                ts.state = TaskspaceState::Cloned;
            }
            return Err(e);
        }

        self.frontend
            .update_progress(&format!("Starting editor server for {}...", taskspace.name));
        let started = server::start_editor_server(
            self.transport.as_ref(),
            &self.host,
            &self.paths,
            &taskspace,
            self.startup_timeout,
        )
        .await;

        let started = match started {
            Ok(started) => started,
            Err(e) => {
                if let Some(ts) = self.roster.get_mut(id) {
                    ts.state = TaskspaceState::Cloned;
                    ts.port = 0;
                }
                self.roster_changed();
                return Err(e);
            }
        };

        let port = started.port;
        info!(taskspace = %id, port, "editor server announced its port");

        let tunnel = match self.transport.forward_port(&self.host, port, port).await {
            Ok(tunnel) => tunnel,
            Err(e) => {
                if let Some(ts) = self.roster.get_mut(id) {
                    ts.state = TaskspaceState::Cloned;
                    ts.port = 0;
                }
                self.roster_changed();
                return Err(e.into());
            }
        };

        self.frontend
            .update_progress(&format!("Waiting for editor on port {port}..."));
        if let Err(e) = probe::probe_editor(port, &self.probe_config).await {
            if let Some(ts) = self.roster.get_mut(id) {
                ts.state = TaskspaceState::Stale;
                ts.port = port;
            }
            self.roster_changed();
            return Err(e);
        }

        // The port replaces the last-known port atomically with
        // respect to persistence: memory first, then one write.
        if let Some(ts) = self.roster.get_mut(id) {
            ts.port = port;
            ts.state = TaskspaceState::Running;
            ts.last_seen_ms = swo_core::taskspace::epoch_ms_now();
        }
        self.forwards.insert(id, tunnel);
        self.servers.insert(id, started.process);
        self.roster_changed();

        self.create_views(id, port);
        Ok(())
    }

    fn create_views(&mut self, id: TaskspaceId, port: u16) {
        let partition = format!("persist:taskspace-{id}");
        let url = format!("http://localhost:{port}/");
        let view = self.frontend.create_editor_view(&partition, &url);
        self.views.insert(id, view);
    }

    /// Make a taskspace reachable, reusing a live server when the
    /// last-known port still answers.
    pub async fn ensure_running(&mut self, id: TaskspaceId) -> Result<(), ControllerError> {
        let (state, port) = {
            let ts = self
                .roster
                .get(id)
                .ok_or(ControllerError::UnknownTaskspace(id))?;
            (ts.state, ts.port)
        };

        match state {
            TaskspaceState::Running => {
                if probe::probe_editor(port, &self.adoption_probe()).await.is_ok() {
                    return Ok(());
                }
                info!(taskspace = %id, port, "running server stopped answering, restarting");
                if let Some(ts) = self.roster.get_mut(id) {
                    ts.state = TaskspaceState::Stale;
                }
                self.forwards.remove(&id);
                self.roster_changed();
                self.start_server(id).await
            }
            TaskspaceState::Cloned if port != 0 => {
                // A previous run left a last-known port. Forward and
                // probe it; a surviving server is adopted, a dead one
                // sends us through a fresh start cycle.
                let tunnel = self.transport.forward_port(&self.host, port, port).await?;
                if probe::probe_editor(port, &self.adoption_probe()).await.is_ok() {
                    info!(taskspace = %id, port, "adopted surviving editor server");
                    self.forwards.insert(id, tunnel);
                    if let Some(ts) = self.roster.get_mut(id) {
                        ts.state = TaskspaceState::Running;
                    }
                    self.roster_changed();
                    self.create_views(id, port);
                    return Ok(());
                }
                drop(tunnel);
                if let Some(ts) = self.roster.get_mut(id) {
                    ts.state = TaskspaceState::Stale;
                }
                self.roster_changed();
                self.start_server(id).await
            }
            TaskspaceState::Cloned | TaskspaceState::Stale => self.start_server(id).await,
            TaskspaceState::Provisioning | TaskspaceState::Starting => Ok(()),
        }
    }

    /// One quick attempt: adoption checks should fail fast into a
    /// restart, not sit out the full retry ladder.
    fn adoption_probe(&self) -> ProbeConfig {
        ProbeConfig {
            max_attempts: 1,
            ..self.probe_config.clone()
        }
    }

    /// Focus: make active, ensure running, present the current view.
    pub async fn focus_taskspace(&mut self, id: TaskspaceId) -> Result<(), ControllerError> {
        self.roster
            .set_active(id)
            .map_err(|_| ControllerError::UnknownTaskspace(id))?;
        self.roster_changed();
        self.ensure_running(id).await?;
        self.present_current_view(id);
        Ok(())
    }

    /// Switch a taskspace between its editor and meta views. The meta
    /// view is constructed lazily on first use; both handles stay
    /// owned by the UI collaborator.
    pub fn set_view_mode(
        &mut self,
        id: TaskspaceId,
        mode: swo_core::ViewMode,
    ) -> Result<(), ControllerError> {
        let taskspace = self
            .roster
            .get_mut(id)
            .ok_or(ControllerError::UnknownTaskspace(id))?;
        taskspace.view_mode = mode;

        if mode == swo_core::ViewMode::Meta && !self.meta_views.contains_key(&id) {
            let partition = format!("persist:taskspace-{id}");
            let view = self.frontend.create_meta_view(&partition);
            self.meta_views.insert(id, view);
        }

        if self.roster.active_id() == Some(id) {
            self.present_current_view(id);
        }
        Ok(())
    }

    fn present_current_view(&self, id: TaskspaceId) {
        let Some(taskspace) = self.roster.get(id) else {
            return;
        };
        let view = match taskspace.view_mode {
            swo_core::ViewMode::Editor => self.views.get(&id),
            swo_core::ViewMode::Meta => self.meta_views.get(&id),
        };
        if let Some(view) = view {
            self.frontend.present(*view);
        }
    }

    /// Running/Cloned -> Removed: tear down the forward, stop the
    /// server, remove the remote trees and the roster entry.
    pub async fn delete_taskspace(&mut self, id: TaskspaceId) -> Result<(), ControllerError> {
        if !self.roster.contains(id) {
            return Err(ControllerError::UnknownTaskspace(id));
        }

        self.forwards.remove(&id);
        if let Some(mut process) = self.servers.remove(&id) {
            let _ = process.start_kill();
        }
        self.views.remove(&id);
        self.meta_views.remove(&id);

        let root = self.paths.taskspace_root(id);
        let state_root = self.paths.editor_state_root(id);
        if let Err(e) = self
            .transport
            .execute(&self.host, &format!("rm -rf {root} {state_root}"))
            .await
        {
            warn!(taskspace = %id, error = %e, "remote cleanup failed");
        }

        self.roster.remove(id);
        self.roster_changed();
        info!(taskspace = %id, "taskspace removed");
        Ok(())
    }

    /// Upload the project's `.vsix` packages into the taskspace root
    /// so the startup script can install them.
    async fn upload_vsix_packages(&mut self, id: TaskspaceId) -> Result<(), ControllerError> {
        let vsix_paths = self.project.vsix_paths.clone();
        for local in &vsix_paths {
            let Some(name) = local.file_name() else {
                continue;
            };
            let remote = format!(
                "{root}/{name}",
                root = self.paths.taskspace_root(id),
                name = name.to_string_lossy()
            );
            self.transport.upload(&self.host, local, &remote).await?;
        }
        Ok(())
    }

    // --- bus event handlers (dispatched by the router) ---

    pub async fn handle_new_taskspace_request(
        &mut self,
        name: String,
        description: Option<String>,
        initial_prompt: Option<String>,
    ) -> Result<(), ControllerError> {
        let id = self
            .create_taskspace(name, description, initial_prompt)
            .await?;
        self.focus_taskspace(id).await
    }

    pub fn handle_update_taskspace(
        &mut self,
        uuid: TaskspaceId,
        name: Option<String>,
        description: Option<String>,
    ) -> Result<(), ControllerError> {
        let taskspace = self
            .roster
            .get_mut(uuid)
            .ok_or(ControllerError::UnknownTaskspace(uuid))?;
        if let Some(name) = name {
            taskspace.name = name;
        }
        if let Some(description) = description {
            taskspace.description = Some(description);
        }
        taskspace.last_seen_ms = swo_core::taskspace::epoch_ms_now();
        self.roster_changed();
        Ok(())
    }

    /// Roster summary reply for a `status_request`.
    pub fn status_response(&self) -> BusEvent {
        BusEvent::StatusResponse {
            taskspaces: self.roster.status_entries(),
            active_task_space: self.roster.active_id(),
            timestamp: Utc::now(),
        }
    }

    pub fn handle_progress_log(
        &mut self,
        message: String,
        category: ProgressCategory,
        taskspace_uuid: Option<TaskspaceId>,
    ) {
        if let Some(ts) = taskspace_uuid.and_then(|id| self.roster.get_mut(id)) {
            ts.push_progress(message.clone(), category);
        }
        self.frontend.update_progress(&message);
    }

    pub fn handle_user_signal(&mut self, message: String, taskspace_uuid: Option<TaskspaceId>) {
        if let Some(ts) = taskspace_uuid.and_then(|id| self.roster.get_mut(id)) {
            ts.attention = true;
            ts.push_progress(message.clone(), ProgressCategory::Question);
        }
        self.frontend
            .update_progress(&format!("Attention requested: {message}"));
    }

    // --- observable side effects ---

    /// Signal the UI, then persist. Persistence failure never blocks
    /// the UI update; it is logged and surfaced as progress text.
    fn roster_changed(&mut self) {
        self.frontend.roster_changed(&self.roster);
        let file = crate::persist::to_file(&self.roster, &self.paths);
        if let Err(e) = self.store.save_roster(&file) {
            error!(error = %e, "failed to persist roster");
            self.frontend
                .update_progress(&format!("warning: failed to persist roster: {e}"));
        }
    }

    /// Tear everything down: forwards, servers, then the transport.
    pub async fn shutdown(&mut self) {
        self.forwards.clear();
        for (_, mut process) in self.servers.drain() {
            let _ = process.start_kill();
        }
        self.transport.shutdown_all().await;
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
