//! Tool-protocol endpoint over stdio.

use crate::prelude::*;

use std::io::{BufRead, BufReader, Write};
use std::process::Stdio;
use std::time::Duration;

fn serve_in(dir: &std::path::Path, socket: &std::path::Path) -> std::process::Child {
    swo_cmd(socket)
        .current_dir(dir)
        .args(["tools", "serve"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap()
}

fn round_trip(child: &mut std::process::Child, request: &str) -> serde_json::Value {
    let stdin = child.stdin.as_mut().unwrap();
    writeln!(stdin, "{request}").unwrap();
    stdin.flush().unwrap();

    let stdout = child.stdout.as_mut().unwrap();
    let mut line = String::new();
    BufReader::new(stdout).read_line(&mut line).unwrap();
    serde_json::from_str(&line).unwrap()
}

#[test]
fn outside_a_taskspace_the_tool_set_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("daemon.sock");

    let mut child = serve_in(dir.path(), &socket);
    let reply = round_trip(&mut child, r#"{"id":1,"method":"list_tools"}"#);
    assert_eq!(reply["id"], 1);
    assert_eq!(reply["result"]["tools"].as_array().map(Vec::len), Some(0));

    let _ = child.kill();
    let _ = child.wait();
}

#[test]
fn inside_a_taskspace_tools_exist_and_calls_emit_events() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = Daemon::start(dir.path());

    let uuid = "7e6e4b7a-1111-4222-8333-abcdef012345";
    let clone = dir.path().join("taskspaces").join(uuid).join("clone");
    std::fs::create_dir_all(&clone).unwrap();

    let mut child = serve_in(&clone, &daemon.socket);

    let listing = round_trip(&mut child, r#"{"id":1,"method":"list_tools"}"#);
    let tools: Vec<&str> = listing["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert!(tools.contains(&"log_progress"));
    assert!(tools.contains(&"signal_user"));

    let call = round_trip(
        &mut child,
        r#"{"id":2,"method":"call_tool","name":"log_progress","arguments":{"message":"built","category":"milestone"}}"#,
    );
    assert_eq!(call["result"]["ok"], true);

    // The event arrived on the bus with the derived UUID attached.
    let line = daemon
        .next_event(Duration::from_secs(2))
        .expect("tool call produced no bus event");
    let value: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(value["type"], "progress_log");
    assert_eq!(value["taskspace_uuid"], uuid);
    assert_eq!(value["category"], "milestone");

    let _ = child.kill();
    let _ = child.wait();
}
