//! Bus daemon relay and single-instance behavior.

use crate::prelude::*;

use std::io::{BufRead, BufReader, Write};
use std::time::Duration;

#[test]
fn refuses_to_start_when_the_socket_exists() {
    let dir = tempfile::tempdir().unwrap();
    let _incumbent = Daemon::start(dir.path());

    let output = std::process::Command::new(swod_binary())
        .env("THEOLDSWITCHEROO_SOCKET", dir.path().join("daemon.sock"))
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("already exists"),
        "expected a conflict diagnostic, got: {stderr}"
    );
}

#[test]
fn client_lines_surface_on_daemon_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = Daemon::start(dir.path());

    let mut client = raw_client(&daemon.socket);
    writeln!(client, r#"{{"type":"status_request","timestamp":"2026-01-15T12:30:00Z"}}"#).unwrap();

    let line = daemon
        .next_event(Duration::from_secs(2))
        .expect("no line relayed to stdout");
    let value: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(value["type"], "status_request");
}

#[test]
fn stdin_lines_broadcast_to_every_client() {
    let dir = tempfile::tempdir().unwrap();
    let mut daemon = Daemon::start(dir.path());

    let a = raw_client(&daemon.socket);
    let b = raw_client(&daemon.socket);
    // Registration races the broadcast only until both connects
    // complete; accept happens before our write below reaches the
    // daemon's select loop, but give it a beat anyway.
    std::thread::sleep(Duration::from_millis(100));

    daemon.broadcast(r#"{"type":"status_response","taskspaces":[],"timestamp":"2026-01-15T12:30:00Z"}"#);

    for stream in [a, b] {
        let mut lines = BufReader::new(stream).lines();
        let line = lines.next().expect("no broadcast line").unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["type"], "status_response");
    }
}

#[test]
fn lines_from_different_clients_stay_whole() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = Daemon::start(dir.path());

    let mut a = raw_client(&daemon.socket);
    let mut b = raw_client(&daemon.socket);
    writeln!(a, r#"{{"type":"user_signal","message":"from a","timestamp":"2026-01-15T12:30:00Z"}}"#)
        .unwrap();
    writeln!(b, r#"{{"type":"user_signal","message":"from b","timestamp":"2026-01-15T12:30:00Z"}}"#)
        .unwrap();

    let mut seen = Vec::new();
    for _ in 0..2 {
        let line = daemon
            .next_event(Duration::from_secs(2))
            .expect("missing relayed line");
        let value: serde_json::Value =
            serde_json::from_str(&line).expect("interleaved bytes produced invalid JSON");
        seen.push(value["message"].as_str().unwrap().to_string());
    }
    seen.sort();
    assert_eq!(seen, vec!["from a", "from b"]);
}

#[test]
fn controller_stdin_closing_stops_the_daemon() {
    let dir = tempfile::tempdir().unwrap();
    let mut daemon = Daemon::start(dir.path());

    daemon.close_stdin();
    assert!(
        daemon.wait_exit(Duration::from_secs(2)),
        "daemon kept running after its controller went away"
    );
    assert!(!daemon.socket.exists(), "socket file left behind");
}

#[test]
fn sigterm_removes_the_socket_and_exits() {
    let dir = tempfile::tempdir().unwrap();
    let mut daemon = Daemon::start(dir.path());

    daemon.send_sigterm();
    assert!(daemon.wait_exit(Duration::from_secs(2)));
    assert!(!daemon.socket.exists(), "socket file left behind");
}

#[test]
fn socket_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let daemon = Daemon::start(dir.path());

    let mode = std::fs::metadata(&daemon.socket).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600, "socket mode was {mode:o}");
}
