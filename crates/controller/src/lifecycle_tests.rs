// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

use crate::frontend::RecordingFrontend;
use swo_storage::{RosterFile, TaskspaceRecord};
use swo_transport::fake::FakeTransport;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn fast_probe() -> ProbeConfig {
    ProbeConfig {
        attempt_timeout: Duration::from_millis(300),
        backoff_start: Duration::from_millis(10),
        backoff_cap: Duration::from_millis(20),
        max_attempts: 2,
    }
}

struct Harness {
    controller: Controller,
    transport: Arc<FakeTransport>,
    frontend: Arc<RecordingFrontend>,
    store_dir: tempfile::TempDir,
}

fn harness() -> Harness {
    harness_with(ProjectConfig::default())
}

fn harness_with(project: ProjectConfig) -> Harness {
    let store_dir = tempfile::tempdir().expect("tempdir");
    let transport = Arc::new(FakeTransport::new());
    let frontend = Arc::new(RecordingFrontend::new());
    let controller = Controller::new(
        "devbox",
        Arc::clone(&transport) as Arc<dyn Transport>,
        Arc::clone(&frontend) as Arc<dyn Frontend>,
        Store::new(store_dir.path()),
        RemotePaths::new("/b"),
        project,
    )
    .with_timeouts(Duration::from_millis(500), fast_probe());
    Harness {
        controller,
        transport,
        frontend,
        store_dir,
    }
}

impl Harness {
    fn saved_roster(&self) -> RosterFile {
        Store::new(self.store_dir.path()).load_roster()
    }
}

/// Serve 200s on an ephemeral local port, standing in for a forwarded
/// editor server.
async fn editor_responder() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf).await;
                let _ = stream
                    .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                    .await;
            });
        }
    });
    port
}

/// A local port nothing listens on.
async fn dead_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);
    port
}

#[tokio::test]
async fn create_taskspace_provisions_and_persists() {
    let mut h = harness();

    let id = h
        .controller
        .create_taskspace("Alpha".to_string(), Some("demo".to_string()), None)
        .await
        .unwrap();

    let ts = h.controller.roster().get(id).unwrap();
    assert_eq!(ts.state, TaskspaceState::Cloned);
    assert_eq!(ts.port, 0);

    let calls = h.transport.calls();
    assert!(calls
        .iter()
        .any(|c| c.contains(&format!("mkdir -p /b/taskspaces/{id}"))));
    assert!(calls
        .iter()
        .any(|c| c.contains(&format!("sh /b/taskspaces/{id}/fresh-clone.sh /b/taskspaces/{id}/clone"))));
    let uploads = h.transport.uploads();
    assert!(uploads
        .iter()
        .any(|(_, remote)| remote == &format!("/b/taskspaces/{id}/fresh-clone.sh")));

    let saved = h.saved_roster();
    assert_eq!(saved.hostname, "devbox");
    assert_eq!(saved.taskspaces.len(), 1);
    assert_eq!(saved.taskspaces[0].uuid, id);
    assert_eq!(saved.active_task_space_uuid, Some(id));
}

#[tokio::test]
async fn failed_clone_reverts_the_entry_to_absent() {
    let mut h = harness();
    h.transport
        .on_exec_fail("fresh-clone.sh", "fatal: repository not found");

    let err = h
        .controller
        .create_taskspace("Alpha".to_string(), None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ControllerError::Provisioning { .. }));

    assert!(h.controller.roster().is_empty());
    assert!(h.saved_roster().taskspaces.is_empty());
}

#[tokio::test]
async fn start_server_discovers_port_forwards_and_probes() {
    let mut h = harness();
    let port = editor_responder().await;
    h.transport.on_stream(
        "openvscode-server",
        format!("echo 'Web UI available at http://0.0.0.0:{port}'; sleep 5"),
    );
    h.transport.ensure_channel("devbox").await.unwrap();

    let id = h
        .controller
        .create_taskspace("Alpha".to_string(), None, None)
        .await
        .unwrap();
    h.controller.start_server(id).await.unwrap();

    let ts = h.controller.roster().get(id).unwrap();
    assert_eq!(ts.state, TaskspaceState::Running);
    assert_eq!(ts.port, port);

    let calls = h.transport.calls();
    assert!(calls.contains(&format!("forward:{port}->{port}")));

    // The UI got an editor view pointing at the forwarded port.
    let frontend_calls = h.frontend.calls();
    assert!(frontend_calls
        .iter()
        .any(|c| c == &format!("editor_view:persist:taskspace-{id}:http://localhost:{port}/")));

    assert_eq!(h.saved_roster().taskspaces[0].port, port);
}

#[tokio::test]
async fn startup_timeout_reverts_to_cloned_and_clears_the_port() {
    let mut h = harness();
    h.transport
        .on_stream("openvscode-server", "echo 'still starting'; sleep 10");
    h.transport.ensure_channel("devbox").await.unwrap();

    let id = h
        .controller
        .create_taskspace("Alpha".to_string(), None, None)
        .await
        .unwrap();
    let err = h.controller.start_server(id).await.unwrap_err();
    assert!(matches!(err, ControllerError::StartupTimeout { .. }));

    let ts = h.controller.roster().get(id).unwrap();
    assert_eq!(ts.state, TaskspaceState::Cloned);
    assert_eq!(ts.port, 0);
    assert_eq!(h.saved_roster().taskspaces[0].port, 0);
}

#[tokio::test]
async fn cold_start_creates_and_runs_the_first_taskspace() {
    let mut h = harness();
    let port = editor_responder().await;
    h.transport.on_exec("uname -m", "x86_64");
    h.transport.on_stream(
        "openvscode-server",
        format!("echo 'Web UI available at http://0.0.0.0:{port}'; sleep 5"),
    );

    h.controller.startup().await.unwrap();
    assert!(!h.controller.is_initial_boot());

    let roster = h.controller.roster();
    assert_eq!(roster.len(), 1);
    let ts = roster.iter().next().unwrap();
    assert_eq!(ts.name, "Taskspace 1");
    assert_eq!(ts.state, TaskspaceState::Running);
    assert_eq!(ts.port, port);
    assert_eq!(roster.active_id(), Some(ts.id));

    let saved = h.saved_roster();
    assert_eq!(saved.taskspaces.len(), 1);
    assert_eq!(saved.taskspaces[0].port, port);
}

#[tokio::test]
async fn warm_restart_with_dead_port_relaunches_and_replaces_the_forward() {
    let h = harness();
    let stale_port = dead_port().await;
    let fresh_port = editor_responder().await;
    let uuid: TaskspaceId = "7e6e4b7a-1111-4222-8333-abcdef012345".parse().unwrap();

    // A previous run left a roster with a port that no longer answers.
    Store::new(h.store_dir.path())
        .save_roster(&RosterFile {
            hostname: "devbox".to_string(),
            active_task_space_uuid: Some(uuid),
            taskspaces: vec![TaskspaceRecord {
                uuid,
                name: "Alpha".to_string(),
                description: None,
                port: stale_port,
                server_data_dir: String::new(),
                last_seen: 0,
                extensions: Default::default(),
            }],
        })
        .unwrap();

    let mut h = h;
    h.transport.on_exec("uname -m", "x86_64");
    h.transport
        .on_exec(format!("test -d /b/taskspaces/{uuid}/clone"), "present");
    h.transport.on_stream(
        "openvscode-server",
        format!("echo 'Web UI available at http://0.0.0.0:{fresh_port}'; sleep 5"),
    );

    h.controller.startup().await.unwrap();

    let ts = h.controller.roster().get(uuid).unwrap();
    assert_eq!(ts.state, TaskspaceState::Running);
    assert_eq!(ts.port, fresh_port);

    // The stale forward was tried first, then replaced by the new one.
    let calls = h.transport.calls();
    let stale_forward = calls
        .iter()
        .position(|c| c == &format!("forward:{stale_port}->{stale_port}"))
        .expect("stale port was never forwarded");
    let fresh_forward = calls
        .iter()
        .position(|c| c == &format!("forward:{fresh_port}->{fresh_port}"))
        .expect("fresh port was never forwarded");
    assert!(stale_forward < fresh_forward);

    assert_eq!(h.saved_roster().taskspaces[0].port, fresh_port);
}

#[tokio::test]
async fn restore_drops_entries_whose_clone_is_gone() {
    let h = harness();
    let kept: TaskspaceId = "7e6e4b7a-1111-4222-8333-abcdef012345".parse().unwrap();
    let gone: TaskspaceId = "9f8e4b7a-1111-4222-8333-abcdef012345".parse().unwrap();

    Store::new(h.store_dir.path())
        .save_roster(&RosterFile {
            hostname: "devbox".to_string(),
            active_task_space_uuid: Some(gone),
            taskspaces: vec![
                TaskspaceRecord {
                    uuid: kept,
                    name: "Kept".to_string(),
                    description: None,
                    port: 0,
                    server_data_dir: String::new(),
                    last_seen: 0,
                    extensions: Default::default(),
                },
                TaskspaceRecord {
                    uuid: gone,
                    name: "Gone".to_string(),
                    description: None,
                    port: 0,
                    server_data_dir: String::new(),
                    last_seen: 0,
                    extensions: Default::default(),
                },
            ],
        })
        .unwrap();

    let mut h = h;
    let port = editor_responder().await;
    h.transport.on_exec("uname -m", "x86_64");
    h.transport
        .on_exec(format!("test -d /b/taskspaces/{kept}/clone"), "present");
    h.transport
        .on_exec(format!("test -d /b/taskspaces/{gone}/clone"), "absent");
    h.transport.on_stream(
        "openvscode-server",
        format!("echo 'Web UI available at http://0.0.0.0:{port}'; sleep 5"),
    );

    h.controller.startup().await.unwrap();

    let roster = h.controller.roster();
    assert_eq!(roster.len(), 1);
    assert!(roster.contains(kept));
    assert!(!roster.contains(gone));
    // The active id pointed at the dropped entry; focus fell back to
    // the survivor.
    assert_eq!(roster.active_id(), Some(kept));
}

#[tokio::test]
async fn update_taskspace_renames_and_persists() {
    let mut h = harness();
    let id = h
        .controller
        .create_taskspace("scratch".to_string(), None, None)
        .await
        .unwrap();

    h.controller
        .handle_update_taskspace(id, Some("Alpha".to_string()), Some("renamed".to_string()))
        .unwrap();

    let ts = h.controller.roster().get(id).unwrap();
    assert_eq!(ts.name, "Alpha");
    assert_eq!(ts.description.as_deref(), Some("renamed"));

    let saved = h.saved_roster();
    assert_eq!(saved.taskspaces[0].name, "Alpha");

    let stranger = TaskspaceId::generate();
    let err = h
        .controller
        .handle_update_taskspace(stranger, Some("X".to_string()), None)
        .unwrap_err();
    assert!(matches!(err, ControllerError::UnknownTaskspace(_)));
}

#[tokio::test]
async fn status_response_summarizes_the_roster() {
    let mut h = harness();
    let id = h
        .controller
        .create_taskspace("Alpha".to_string(), None, None)
        .await
        .unwrap();

    match h.controller.status_response() {
        BusEvent::StatusResponse {
            taskspaces,
            active_task_space,
            ..
        } => {
            assert_eq!(taskspaces.len(), 1);
            assert_eq!(taskspaces[0].name, "Alpha");
            assert_eq!(taskspaces[0].status, "cloned");
            assert_eq!(taskspaces[0].uuid, id);
            assert_eq!(active_task_space, Some(id));
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn progress_and_signal_events_attach_to_the_taskspace() {
    let mut h = harness();
    let id = h
        .controller
        .create_taskspace("Alpha".to_string(), None, None)
        .await
        .unwrap();

    h.controller.handle_progress_log(
        "cloning dependencies".to_string(),
        ProgressCategory::Info,
        Some(id),
    );
    h.controller
        .handle_user_signal("need a decision".to_string(), Some(id));

    let ts = h.controller.roster().get(id).unwrap();
    assert_eq!(ts.progress.len(), 2);
    assert!(ts.attention);

    // Unattributed events still reach the progress surface.
    h.controller
        .handle_progress_log("ambient note".to_string(), ProgressCategory::Info, None);
    assert!(h
        .frontend
        .calls()
        .iter()
        .any(|c| c == "progress:ambient note"));
}

#[tokio::test]
async fn delete_tears_down_and_removes_remote_trees() {
    let mut h = harness();
    let id = h
        .controller
        .create_taskspace("Alpha".to_string(), None, None)
        .await
        .unwrap();

    h.controller.delete_taskspace(id).await.unwrap();

    assert!(h.controller.roster().is_empty());
    assert!(h.saved_roster().taskspaces.is_empty());
    let calls = h.transport.calls();
    assert!(calls.iter().any(|c| {
        c.contains("rm -rf")
            && c.contains(&format!("/b/taskspaces/{id}"))
            && c.contains(&format!("/b/taskspaces/taskspace-{id}"))
    }));

    let err = h.controller.delete_taskspace(id).await.unwrap_err();
    assert!(matches!(err, ControllerError::UnknownTaskspace(_)));
}

#[tokio::test]
async fn meta_view_is_created_lazily_and_presented() {
    let mut h = harness();
    let id = h
        .controller
        .create_taskspace("Alpha".to_string(), None, None)
        .await
        .unwrap();

    h.controller
        .set_view_mode(id, swo_core::ViewMode::Meta)
        .unwrap();
    h.controller
        .set_view_mode(id, swo_core::ViewMode::Meta)
        .unwrap();

    let calls = h.frontend.calls();
    let meta_creations = calls
        .iter()
        .filter(|c| c.starts_with("meta_view:"))
        .count();
    assert_eq!(meta_creations, 1, "meta view must be built once: {calls:?}");
    assert!(calls
        .iter()
        .any(|c| c == &format!("meta_view:persist:taskspace-{id}")));
    // The taskspace is active, so the swap was presented.
    assert!(calls.iter().any(|c| c.starts_with("present:")));
}

#[tokio::test]
async fn vsix_packages_upload_before_the_server_script_runs() {
    let store_dir = tempfile::tempdir().expect("tempdir");
    let vsix = store_dir.path().join("local-tool.vsix");
    std::fs::write(&vsix, b"zip").unwrap();

    let mut h = harness_with(ProjectConfig {
        clone_script: ProjectConfig::default().clone_script,
        marketplace_extensions: vec!["rust-lang.rust-analyzer".to_string()],
        vsix_paths: vec![vsix],
    });
    let port = editor_responder().await;
    h.transport.on_stream(
        "openvscode-server",
        format!("echo 'Web UI available at http://0.0.0.0:{port}'; sleep 5"),
    );
    h.transport.ensure_channel("devbox").await.unwrap();

    let id = h
        .controller
        .create_taskspace("Alpha".to_string(), None, None)
        .await
        .unwrap();
    h.controller.start_server(id).await.unwrap();

    let calls = h.transport.calls();
    let upload_pos = calls
        .iter()
        .position(|c| c == &format!("upload:/b/taskspaces/{id}/local-tool.vsix"))
        .expect("vsix upload missing");
    let stream_pos = calls
        .iter()
        .position(|c| c.starts_with("stream:"))
        .expect("server start missing");
    assert!(upload_pos < stream_pos);

    // The manifest reached the startup script.
    let script = &calls[stream_pos];
    assert!(script.contains("--install-extension rust-lang.rust-analyzer"));
    assert!(script.contains("local-tool.vsix"));
}
