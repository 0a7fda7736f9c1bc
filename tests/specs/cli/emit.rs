//! CLI event emission end to end: swo -> socket -> swod stdout.

use crate::prelude::*;

use std::time::Duration;

fn next_event_value(daemon: &Daemon) -> serde_json::Value {
    let line = daemon
        .next_event(Duration::from_secs(2))
        .expect("no event reached the daemon stdout");
    serde_json::from_str(&line).expect("daemon relayed invalid JSON")
}

#[test]
fn status_emits_one_status_request_line() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = Daemon::start(dir.path());

    let output = swo_cmd(&daemon.socket).arg("status").output().unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let value = next_event_value(&daemon);
    assert_eq!(value["type"], "status_request");
    assert!(value["timestamp"].is_string());
}

#[test]
fn new_taskspace_carries_name_description_and_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = Daemon::start(dir.path());

    let output = swo_cmd(&daemon.socket)
        .args([
            "new-taskspace",
            "--name",
            "Alpha",
            "--description",
            "demo taskspace",
            "--initial-prompt",
            "fix the tests",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value = next_event_value(&daemon);
    assert_eq!(value["type"], "new_taskspace_request");
    assert_eq!(value["name"], "Alpha");
    assert_eq!(value["description"], "demo taskspace");
    assert_eq!(value["initial_prompt"], "fix the tests");
    assert!(value["cwd"].is_string());
}

#[test]
fn update_taskspace_derives_the_uuid_from_the_working_directory() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = Daemon::start(dir.path());

    let uuid = "7e6e4b7a-1111-4222-8333-abcdef012345";
    let clone = dir.path().join("taskspaces").join(uuid).join("clone");
    std::fs::create_dir_all(&clone).unwrap();

    let output = swo_cmd(&daemon.socket)
        .current_dir(&clone)
        .args(["update-taskspace", "--name", "Alpha"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let value = next_event_value(&daemon);
    assert_eq!(value["type"], "update_taskspace");
    assert_eq!(value["uuid"], uuid);
    assert_eq!(value["name"], "Alpha");
    assert!(value.get("description").is_none());
}

#[test]
fn log_progress_tags_the_category() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = Daemon::start(dir.path());

    let output = swo_cmd(&daemon.socket)
        .args([
            "log-progress",
            "--message",
            "deps installed",
            "--category",
            "milestone",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value = next_event_value(&daemon);
    assert_eq!(value["type"], "progress_log");
    assert_eq!(value["message"], "deps installed");
    assert_eq!(value["category"], "milestone");
}

#[test]
fn signal_user_emits_a_user_signal() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = Daemon::start(dir.path());

    let output = swo_cmd(&daemon.socket)
        .args(["signal-user", "--message", "need input"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value = next_event_value(&daemon);
    assert_eq!(value["type"], "user_signal");
    assert_eq!(value["message"], "need input");
}
