//! CLI failure modes and exit codes.

use crate::prelude::*;

#[test]
fn missing_socket_exits_nonzero_with_one_diagnostic() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("daemon.sock");

    let output = swo_cmd(&socket).arg("status").output().unwrap();

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("unavailable"),
        "expected an unavailable diagnostic, got: {stderr}"
    );
    assert_eq!(stderr.trim().lines().count(), 1, "got: {stderr}");
}

#[test]
fn update_taskspace_outside_a_taskspace_fails_before_touching_the_bus() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = Daemon::start(dir.path());

    let plain = dir.path().join("no-taskspace-here");
    std::fs::create_dir_all(&plain).unwrap();

    let output = swo_cmd(&daemon.socket)
        .current_dir(&plain)
        .args(["update-taskspace", "--name", "Alpha"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("UUID"), "got: {stderr}");

    // Nothing reached the daemon.
    assert!(daemon
        .next_event(std::time::Duration::from_millis(300))
        .is_none());
}

#[test]
fn update_taskspace_with_no_changes_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();

    let uuid = "7e6e4b7a-1111-4222-8333-abcdef012345";
    let clone = dir.path().join("taskspaces").join(uuid).join("clone");
    std::fs::create_dir_all(&clone).unwrap();

    let output = swo_cmd(&dir.path().join("daemon.sock"))
        .current_dir(&clone)
        .arg("update-taskspace")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("nothing to update"), "got: {stderr}");
}
