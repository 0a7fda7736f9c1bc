//! Socket-presence handoff between controllers.

use crate::prelude::*;

use std::time::{Duration, Instant};

#[test]
fn deleting_the_socket_makes_the_daemon_exit_within_the_bound() {
    let dir = tempfile::tempdir().unwrap();
    let mut daemon = Daemon::start(dir.path());

    let deleted_at = Instant::now();
    std::fs::remove_file(&daemon.socket).unwrap();

    assert!(
        daemon.wait_exit(Duration::from_secs(2)),
        "incumbent did not exit after its socket was deleted"
    );
    assert!(
        deleted_at.elapsed() <= Duration::from_secs(2),
        "handoff took {:?}",
        deleted_at.elapsed()
    );
}

#[test]
fn a_new_daemon_owns_the_host_after_handoff() {
    let dir = tempfile::tempdir().unwrap();
    let mut incumbent = Daemon::start(dir.path());

    // The takeover protocol: delete, wait out the detection interval,
    // start fresh.
    std::fs::remove_file(&incumbent.socket).unwrap();
    assert!(incumbent.wait_exit(Duration::from_secs(2)));

    let successor = Daemon::start(dir.path());
    assert!(successor.socket.exists());

    // The successor relays traffic like any healthy daemon.
    let mut client = raw_client(&successor.socket);
    use std::io::Write;
    writeln!(
        client,
        r#"{{"type":"status_request","timestamp":"2026-01-15T12:30:00Z"}}"#
    )
    .unwrap();
    assert!(successor.next_event(Duration::from_secs(2)).is_some());
}
